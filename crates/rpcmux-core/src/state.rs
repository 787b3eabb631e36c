//! Shared pool state. Every mutation flows through the manager's
//! operations; nothing outside this crate touches the fields directly.

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

pub(crate) struct PoolState {
    /// Index of the active read endpoint. Always a valid pool index.
    pub current: usize,
    /// Consecutive infrastructure failures since the last success or switch.
    pub consecutive_failures: u32,
    /// When any endpoint last served a successful call. Observability only.
    pub last_success: Option<Instant>,
    /// Indices that passed the most recent health cycle. Replaced wholesale,
    /// never edited in place during a cycle.
    pub healthy: BTreeSet<usize>,
    /// Last observed round trip per index. Written only on success.
    pub latencies: HashMap<usize, Duration>,
}

impl PoolState {
    /// Until the first cycle completes, every endpoint is assumed healthy.
    pub fn new(pool_size: usize) -> Self {
        Self {
            current: 0,
            consecutive_failures: 0,
            last_success: None,
            healthy: (0..pool_size).collect(),
            latencies: HashMap::new(),
        }
    }

    /// Move `current` to the best healthy endpoint: lowest recorded latency,
    /// ties broken by pool index, plain pool order while nothing has been
    /// probed yet. Keeps `current` when the healthy set is empty. Resets the
    /// failure counter whenever the index actually moves.
    ///
    /// Returns `true` if the active endpoint changed.
    pub fn select_best(&mut self) -> bool {
        let candidate = self
            .healthy
            .iter()
            .copied()
            .min_by_key(|i| (self.latencies.get(i).copied().unwrap_or(Duration::MAX), *i));
        match candidate {
            Some(idx) if idx != self.current => {
                self.current = idx;
                self.consecutive_failures = 0;
                true
            }
            _ => false,
        }
    }
}

//! Exponential backoff schedule for the call executor.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Backoff tuning. The delay after the `attempt`-th failed call (1-based)
/// is `base_ms * 2^attempt` plus up to `jitter_ms` of random jitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    #[serde(default = "default_base_ms")]
    pub base_ms: u64,
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
}

fn default_base_ms() -> u64 {
    1_000
}

fn default_jitter_ms() -> u64 {
    1_000
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_ms: default_base_ms(),
            jitter_ms: default_jitter_ms(),
        }
    }
}

impl BackoffConfig {
    /// Delay to sleep after `attempt` consecutive failures.
    pub fn delay(&self, attempt: u32) -> Duration {
        // Shift capped so a pathological attempt count cannot overflow.
        let base = self.base_ms.saturating_mul(1u64 << attempt.min(16));
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..self.jitter_ms)
        };
        Duration::from_millis(base.saturating_add(jitter))
    }
}

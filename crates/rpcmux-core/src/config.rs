//! Endpoint manager configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::policy::BackoffConfig;

/// Tunables for the endpoint manager. Millisecond fields keep the struct
/// directly deserializable from flat config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Chain every endpoint in the pool is expected to serve.
    pub expected_chain_id: u64,
    /// Probe deadline; doubles as the acceptable latency ceiling.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Cadence of the background health cycle.
    #[serde(default = "default_health_interval_ms")]
    pub health_interval_ms: u64,
    /// Blocks an endpoint may trail the best-known height before it is
    /// treated as stale.
    #[serde(default = "default_max_block_lag")]
    pub max_block_lag: u64,
    /// Consecutive failures on the active endpoint before failing over.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Total call invocations per `execute`, first try included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub backoff: BackoffConfig,
}

fn default_probe_timeout_ms() -> u64 {
    5_000
}

fn default_health_interval_ms() -> u64 {
    30_000
}

fn default_max_block_lag() -> u64 {
    2
}

fn default_failure_threshold() -> u32 {
    2
}

fn default_max_attempts() -> u32 {
    3
}

impl ManagerConfig {
    /// Defaults for a deployment targeting `expected_chain_id`.
    pub fn for_chain(expected_chain_id: u64) -> Self {
        Self {
            expected_chain_id,
            probe_timeout_ms: default_probe_timeout_ms(),
            health_interval_ms: default_health_interval_ms(),
            max_block_lag: default_max_block_lag(),
            failure_threshold: default_failure_threshold(),
            max_attempts: default_max_attempts(),
            backoff: BackoffConfig::default(),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_millis(self.health_interval_ms)
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self::for_chain(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_defaults() {
        let config = ManagerConfig::for_chain(137);
        assert_eq!(config.expected_chain_id, 137);
        assert_eq!(config.probe_timeout(), Duration::from_secs(5));
        assert_eq!(config.health_interval(), Duration::from_secs(30));
        assert_eq!(config.max_block_lag, 2);
        assert_eq!(config.failure_threshold, 2);
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn deserializes_with_partial_fields() {
        let config: ManagerConfig =
            serde_json::from_str(r#"{"expected_chain_id": 137, "max_attempts": 5}"#).unwrap();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.health_interval_ms, 30_000);
    }
}

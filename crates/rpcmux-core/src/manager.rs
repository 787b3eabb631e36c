//! The endpoint manager — failover pool, health cycle and call executor.
//!
//! Reads bind to the currently selected endpoint of a fixed pool; writes
//! bind to the injected wallet signer. Call outcomes feed back into the
//! health state, so runtime failures demote endpoints without waiting for
//! the next scheduled cycle.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::ManagerConfig;
use crate::error::RpcError;
use crate::health::{self, ProbeReport};
use crate::signer::SigningProvider;
use crate::state::PoolState;
use crate::transport::RpcTransport;

/// Point-in-time view of the pool, for logging and dashboards.
#[derive(Debug, Clone)]
pub struct PoolSnapshot {
    pub current: usize,
    pub current_url: String,
    pub healthy: Vec<usize>,
    pub latencies_ms: Vec<(usize, u64)>,
    pub consecutive_failures: u32,
    pub since_last_success: Option<Duration>,
}

/// Multi-endpoint JSON-RPC manager with health-driven failover.
pub struct EndpointManager {
    endpoints: Vec<Arc<dyn RpcTransport>>,
    signer: Mutex<Option<Arc<dyn SigningProvider>>>,
    state: Mutex<PoolState>,
    config: ManagerConfig,
}

impl EndpointManager {
    /// Build a manager over an ordered endpoint pool. The order is a
    /// reliability hint: it seeds the initial selection and breaks ties.
    pub fn new(
        endpoints: Vec<Arc<dyn RpcTransport>>,
        config: ManagerConfig,
    ) -> Result<Self, RpcError> {
        if endpoints.is_empty() {
            return Err(RpcError::EmptyPool);
        }
        let state = PoolState::new(endpoints.len());
        Ok(Self {
            endpoints,
            signer: Mutex::new(None),
            state: Mutex::new(state),
            config,
        })
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Client bound to the currently selected endpoint. Re-resolve per
    /// call so retries after a failover reach the replacement endpoint.
    pub fn read_client(&self) -> Arc<dyn RpcTransport> {
        let state = self.state.lock().unwrap();
        Arc::clone(&self.endpoints[state.current])
    }

    /// Wallet-bound client for transactions. Only the connected wallet
    /// holds key material, so the write path has no pool fallback.
    pub fn write_client(&self) -> Result<Arc<dyn SigningProvider>, RpcError> {
        self.signer.lock().unwrap().clone().ok_or(RpcError::NoSigner)
    }

    /// Attach the wallet provider (on connect).
    pub fn set_signer(&self, signer: Arc<dyn SigningProvider>) {
        *self.signer.lock().unwrap() = Some(signer);
    }

    /// Detach the wallet provider (on disconnect).
    pub fn clear_signer(&self) {
        *self.signer.lock().unwrap() = None;
    }

    /// Record a successful call through any endpoint.
    pub fn record_success(&self) {
        let mut state = self.state.lock().unwrap();
        state.consecutive_failures = 0;
        state.last_success = Some(Instant::now());
    }

    /// Record an infrastructure failure against the active endpoint. The
    /// endpoint is demoted immediately; once the threshold is reached the
    /// selector fails over, forcing a full health pass first if fewer than
    /// two candidates remain.
    pub async fn record_failure(&self) {
        let force_recheck = {
            let mut state = self.state.lock().unwrap();
            state.consecutive_failures += 1;
            let failed = state.current;
            state.healthy.remove(&failed);
            tracing::debug!(
                endpoint = failed,
                failures = state.consecutive_failures,
                "connection failure"
            );
            if state.consecutive_failures < self.config.failure_threshold {
                false
            } else if state.healthy.len() >= 2 {
                let from = state.current;
                state.select_best();
                tracing::warn!(
                    from,
                    to = state.current,
                    "failure threshold reached, switched endpoint"
                );
                false
            } else {
                true
            }
        };

        // Fewer than two candidates left: refresh the whole pool once and
        // take the best of whatever comes back. Exactly one forced pass per
        // failure event, so a globally dead network cannot recurse.
        if force_recheck {
            tracing::warn!("fewer than two healthy endpoints, forcing health cycle");
            self.run_health_cycle().await;
            let mut state = self.state.lock().unwrap();
            state.select_best();
            if state.healthy.is_empty() {
                tracing::warn!(
                    endpoint = state.current,
                    "no healthy endpoint to fail over to, keeping current"
                );
            }
            state.consecutive_failures = 0;
        }
    }

    /// Probe every endpoint concurrently, drop stale or unreachable ones,
    /// and swap in the refreshed healthy set. Runs on the background cycle
    /// and on forced rechecks; never propagates probe failures.
    pub async fn run_health_cycle(&self) {
        let expected = self.config.expected_chain_id;
        let deadline = self.config.probe_timeout();

        let probes = self.endpoints.iter().enumerate().map(|(idx, transport)| async move {
            match health::probe(transport.as_ref(), expected, deadline).await {
                Ok(report) => Some((idx, report)),
                Err(err) => {
                    tracing::warn!(
                        endpoint = idx,
                        url = transport.url(),
                        error = %err,
                        "probe failed"
                    );
                    None
                }
            }
        });
        let reports: Vec<Option<(usize, ProbeReport)>> = future::join_all(probes).await;

        let best_height = reports.iter().flatten().map(|(_, r)| r.height).max();
        let mut healthy = BTreeSet::new();
        let mut measured = Vec::new();
        for (idx, report) in reports.into_iter().flatten() {
            if let Some(best) = best_height {
                if report.height + self.config.max_block_lag < best {
                    tracing::warn!(
                        endpoint = idx,
                        height = report.height,
                        best,
                        "endpoint trails the pool, marking unhealthy"
                    );
                    continue;
                }
            }
            healthy.insert(idx);
            measured.push((idx, report.latency));
        }

        tracing::debug!(
            healthy = healthy.len(),
            total = self.endpoints.len(),
            "health cycle complete"
        );

        // Single lock acquisition: concurrent readers observe the previous
        // set or this one in full, never a partial update.
        let mut state = self.state.lock().unwrap();
        for (idx, latency) in measured {
            state.latencies.insert(idx, latency);
        }
        state.healthy = healthy;
        if !state.healthy.contains(&state.current) {
            let from = state.current;
            if state.select_best() {
                tracing::info!(
                    from,
                    to = state.current,
                    "active endpoint failed health check, switched"
                );
            } else {
                tracing::warn!(
                    endpoint = state.current,
                    "no healthy endpoints this cycle, keeping current"
                );
            }
        }
    }

    /// Run `call` with bounded retries and exponential backoff. Retryable
    /// failures feed the failover policy; call-semantic failures propagate
    /// immediately and untouched. `max_attempts` counts total invocations
    /// and defaults from the config.
    pub async fn execute<T, F, Fut>(
        &self,
        call: F,
        max_attempts: Option<u32>,
    ) -> Result<T, RpcError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, RpcError>>,
    {
        let max_attempts = max_attempts.unwrap_or(self.config.max_attempts).max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match call().await {
                Ok(value) => {
                    self.record_success();
                    return Ok(value);
                }
                Err(err) if !err.is_retryable() => {
                    // The endpoint is not at fault; no health penalty.
                    return Err(err);
                }
                Err(err) => {
                    self.record_failure().await;
                    if attempt >= max_attempts {
                        tracing::error!(attempts = attempt, error = %err, "max retries exceeded");
                        return Err(err);
                    }
                    let delay = self.config.backoff.delay(attempt);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying call"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Read `method` through the current endpoint with full retry and
    /// failover handling.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, RpcError> {
        self.execute(
            || {
                let client = self.read_client();
                let params = params.clone();
                let method = method.to_string();
                async move { client.call::<T>(&method, params).await }
            },
            None,
        )
        .await
    }

    /// Current pool health, for logging and dashboards.
    pub fn snapshot(&self) -> PoolSnapshot {
        let state = self.state.lock().unwrap();
        PoolSnapshot {
            current: state.current,
            current_url: self.endpoints[state.current].url().to_string(),
            healthy: state.healthy.iter().copied().collect(),
            latencies_ms: state
                .latencies
                .iter()
                .map(|(idx, latency)| (*idx, latency.as_millis() as u64))
                .collect(),
            consecutive_failures: state.consecutive_failures,
            since_last_success: state.last_success.map(|t| t.elapsed()),
        }
    }

    /// Start the recurring health cycle. The task runs until the returned
    /// handle is shut down (or dropped) and is never awaited by callers.
    pub fn spawn_health_task(self: Arc<Self>) -> HealthTask {
        let manager = self;
        let (tx, mut rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(manager.config.health_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => manager.run_health_cycle().await,
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("health task stopped");
        });
        HealthTask { shutdown: tx, handle }
    }
}

/// Handle owning the background health cycle.
pub struct HealthTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl HealthTask {
    /// Stop the cycle and wait for the task to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{JsonRpcRequest, JsonRpcResponse, RpcErrorObject};
    use crate::signer::WalletEvent;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use tokio::sync::broadcast;

    struct MockTransport {
        url: String,
        chain_id: u64,
        height: u64,
        fail: AtomicBool,
    }

    #[async_trait]
    impl RpcTransport for MockTransport {
        async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, RpcError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(RpcError::Transport("connection refused".into()));
            }
            let result = match req.method.as_str() {
                "eth_blockNumber" => format!("0x{:x}", self.height),
                "eth_chainId" => format!("0x{:x}", self.chain_id),
                other => return Err(RpcError::Transport(format!("unexpected method {other}"))),
            };
            Ok(JsonRpcResponse {
                jsonrpc: "2.0".into(),
                id: req.id,
                result: Some(Value::String(result)),
                error: None,
            })
        }

        fn url(&self) -> &str {
            &self.url
        }
    }

    fn mock(url: &str, chain_id: u64, height: u64) -> Arc<MockTransport> {
        Arc::new(MockTransport {
            url: url.to_string(),
            chain_id,
            height,
            fail: AtomicBool::new(false),
        })
    }

    fn pool(mocks: &[Arc<MockTransport>]) -> Vec<Arc<dyn RpcTransport>> {
        mocks
            .iter()
            .map(|m| Arc::clone(m) as Arc<dyn RpcTransport>)
            .collect()
    }

    fn config() -> ManagerConfig {
        let mut config = ManagerConfig::for_chain(137);
        config.backoff.jitter_ms = 0;
        config
    }

    struct MockSigner {
        tx: broadcast::Sender<WalletEvent>,
    }

    impl MockSigner {
        fn new() -> Arc<Self> {
            let (tx, _) = broadcast::channel(8);
            Arc::new(Self { tx })
        }
    }

    #[async_trait]
    impl SigningProvider for MockSigner {
        async fn request(&self, _req: JsonRpcRequest) -> Result<Value, RpcError> {
            Ok(Value::String("0xtxhash".into()))
        }

        fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
            self.tx.subscribe()
        }
    }

    #[test]
    fn rejects_empty_pool() {
        match EndpointManager::new(vec![], config()) {
            Err(RpcError::EmptyPool) => {}
            Err(other) => panic!("expected EmptyPool, got {other:?}"),
            Ok(_) => panic!("expected EmptyPool, got a manager"),
        }
    }

    #[tokio::test]
    async fn write_client_requires_signer() {
        let manager = EndpointManager::new(pool(&[mock("https://a", 137, 100)]), config()).unwrap();
        match manager.write_client() {
            Err(RpcError::NoSigner) => {}
            Err(other) => panic!("expected NoSigner, got {other:?}"),
            Ok(_) => panic!("expected NoSigner, got a signer"),
        }

        manager.set_signer(MockSigner::new());
        let signer = manager.write_client().unwrap();
        let hash = signer
            .request(JsonRpcRequest::new("eth_sendTransaction", vec![]))
            .await
            .unwrap();
        assert_eq!(hash, Value::String("0xtxhash".into()));

        manager.clear_signer();
        assert!(manager.write_client().is_err());
    }

    #[tokio::test]
    async fn cycle_keeps_only_live_endpoints() {
        let mocks = [
            mock("https://a", 137, 100),
            mock("https://b", 137, 100),
            mock("https://c", 137, 100),
        ];
        mocks[0].fail.store(true, Ordering::SeqCst);
        mocks[2].fail.store(true, Ordering::SeqCst);

        let manager = EndpointManager::new(pool(&mocks), config()).unwrap();
        manager.run_health_cycle().await;

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.healthy, vec![1]);
        // The active endpoint was unhealthy, so the selector moved off it.
        assert_eq!(snapshot.current, 1);
        assert_eq!(snapshot.current_url, "https://b");
        // Latency recorded for the one successful probe only.
        let probed: Vec<usize> = snapshot.latencies_ms.iter().map(|(i, _)| *i).collect();
        assert_eq!(probed, vec![1]);
    }

    #[tokio::test]
    async fn cycle_rejects_wrong_chain() {
        let mocks = [mock("https://a", 137, 100), mock("https://b", 1, 100)];
        let manager = EndpointManager::new(pool(&mocks), config()).unwrap();
        manager.run_health_cycle().await;

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.healthy, vec![0]);
    }

    #[tokio::test]
    async fn cycle_drops_lagging_endpoints() {
        let mocks = [
            mock("https://a", 137, 100),
            mock("https://b", 137, 97),
            mock("https://c", 137, 98),
        ];
        let manager = EndpointManager::new(pool(&mocks), config()).unwrap();
        manager.run_health_cycle().await;

        // 98 is within the 2-block tolerance of 100; 97 is not.
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.healthy, vec![0, 2]);
    }

    #[tokio::test]
    async fn single_failure_demotes_without_switching() {
        let mocks = [mock("https://a", 137, 100), mock("https://b", 137, 100)];
        let manager = EndpointManager::new(pool(&mocks), config()).unwrap();

        manager.record_failure().await;

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.current, 0);
        assert_eq!(snapshot.consecutive_failures, 1);
        assert_eq!(snapshot.healthy, vec![1]);
    }

    #[tokio::test]
    async fn failure_threshold_switches_to_lowest_latency() {
        let mocks = [
            mock("https://a", 137, 100),
            mock("https://b", 137, 100),
            mock("https://c", 137, 100),
        ];
        let manager = EndpointManager::new(pool(&mocks), config()).unwrap();
        {
            let mut state = manager.state.lock().unwrap();
            state.latencies.insert(0, Duration::from_millis(30));
            state.latencies.insert(1, Duration::from_millis(10));
            state.latencies.insert(2, Duration::from_millis(20));
        }

        manager.record_failure().await;
        manager.record_failure().await;

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.current, 1);
        assert_eq!(snapshot.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn thin_pool_forces_recheck_before_switching() {
        let mocks = [mock("https://a", 137, 100), mock("https://b", 137, 100)];
        mocks[0].fail.store(true, Ordering::SeqCst);
        let manager = EndpointManager::new(pool(&mocks), config()).unwrap();

        manager.record_failure().await;
        manager.record_failure().await;

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.current, 1);
        assert_eq!(snapshot.healthy, vec![1]);
        assert_eq!(snapshot.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn totally_dead_pool_keeps_current_index() {
        let mocks = [mock("https://a", 137, 100), mock("https://b", 137, 100)];
        mocks[0].fail.store(true, Ordering::SeqCst);
        mocks[1].fail.store(true, Ordering::SeqCst);
        let manager = EndpointManager::new(pool(&mocks), config()).unwrap();

        manager.record_failure().await;
        manager.record_failure().await;

        // Forced recheck found nothing; index stays valid and the counter
        // resets so the next failure event starts a fresh count.
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.current, 0);
        assert!(snapshot.healthy.is_empty());
        assert_eq!(snapshot.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn execute_success_resets_failures() {
        let mocks = [mock("https://a", 137, 100)];
        let manager = EndpointManager::new(pool(&mocks), config()).unwrap();
        manager.state.lock().unwrap().consecutive_failures = 1;

        let block: String = manager.call("eth_blockNumber", vec![]).await.unwrap();
        assert_eq!(block, "0x64");

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.consecutive_failures, 0);
        assert!(snapshot.since_last_success.is_some());
    }

    #[tokio::test]
    async fn execute_does_not_retry_semantic_errors() {
        let mocks = [mock("https://a", 137, 100), mock("https://b", 137, 100)];
        let manager = EndpointManager::new(pool(&mocks), config()).unwrap();

        let calls = AtomicU32::new(0);
        let result: Result<Value, _> = manager
            .execute(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async {
                        Err(RpcError::Rpc(RpcErrorObject {
                            code: -32000,
                            message: "insufficient funds for transfer".into(),
                            data: None,
                        }))
                    }
                },
                None,
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        match result {
            Err(RpcError::Rpc(obj)) => {
                assert!(obj.message.contains("insufficient funds"));
            }
            other => panic!("expected the original rpc error, got {other:?}"),
        }
        // No health penalty for a call-semantic failure.
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.consecutive_failures, 0);
        assert_eq!(snapshot.healthy, vec![0, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn execute_retries_until_attempts_exhausted() {
        let mocks = [
            mock("https://a", 137, 100),
            mock("https://b", 137, 100),
            mock("https://c", 137, 100),
        ];
        let manager = EndpointManager::new(pool(&mocks), config()).unwrap();

        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();
        let result: Result<Value, _> = manager
            .execute(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(RpcError::Transport("Failed to fetch".into())) }
                },
                None,
            )
            .await;
        let elapsed = started.elapsed();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(RpcError::Transport(msg)) => assert_eq!(msg, "Failed to fetch"),
            other => panic!("expected the last transport error, got {other:?}"),
        }
        // Backoff slept ~2s then ~4s (jitter disabled in the test config).
        assert!(elapsed >= Duration::from_secs(6), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(7), "{elapsed:?}");
    }

    #[tokio::test]
    async fn execute_honors_custom_attempt_budget() {
        let mocks = [mock("https://a", 137, 100)];
        let manager = EndpointManager::new(pool(&mocks), config()).unwrap();

        let calls = AtomicU32::new(0);
        let result: Result<Value, _> = manager
            .execute(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(RpcError::Timeout { ms: 5_000 }) }
                },
                Some(1),
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(RpcError::Timeout { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn call_retries_on_the_replacement_endpoint() {
        let mocks = [mock("https://a", 137, 100), mock("https://b", 137, 200)];
        mocks[0].fail.store(true, Ordering::SeqCst);
        let manager = EndpointManager::new(pool(&mocks), config()).unwrap();

        // First attempt fails on endpoint 0; the failover machinery moves to
        // endpoint 1 and the retry succeeds there.
        let block: String = manager.call("eth_blockNumber", vec![]).await.unwrap();
        assert_eq!(block, "0xc8");
        assert_eq!(manager.snapshot().current, 1);
    }

    #[tokio::test]
    async fn health_task_runs_and_shuts_down() {
        let mocks = [mock("https://a", 137, 100), mock("https://b", 137, 100)];
        mocks[1].fail.store(true, Ordering::SeqCst);
        let manager = Arc::new(EndpointManager::new(pool(&mocks), config()).unwrap());

        let task = Arc::clone(&manager).spawn_health_task();
        // The first tick fires immediately; give the task a chance to run it.
        tokio::time::sleep(Duration::from_millis(50)).await;
        task.shutdown().await;

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.healthy, vec![0]);
    }
}

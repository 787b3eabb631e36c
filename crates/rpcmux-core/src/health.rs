//! Endpoint probing.
//!
//! A probe issues two concurrent reads (head block number and chain id)
//! against one endpoint and measures the round trip. The manager's health
//! cycle then cross-checks reported heights across the pool to weed out
//! stale nodes before swapping in the new healthy set.

use std::time::{Duration, Instant};

use crate::error::RpcError;
use crate::request::parse_quantity;
use crate::transport::RpcTransport;

/// Result of probing one endpoint, before the cross-pool lag check.
#[derive(Debug, Clone, Copy)]
pub struct ProbeReport {
    /// Head block number the endpoint reported.
    pub height: u64,
    /// Wall-clock round trip for both reads combined.
    pub latency: Duration,
}

/// Probe a single endpoint. The deadline bounds the whole probe and so
/// doubles as the latency ceiling.
pub async fn probe(
    transport: &dyn RpcTransport,
    expected_chain_id: u64,
    deadline: Duration,
) -> Result<ProbeReport, RpcError> {
    let started = Instant::now();
    let (height_hex, chain_hex) = tokio::time::timeout(deadline, async {
        tokio::try_join!(
            transport.call::<String>("eth_blockNumber", vec![]),
            transport.call::<String>("eth_chainId", vec![]),
        )
    })
    .await
    .map_err(|_| RpcError::Timeout {
        ms: deadline.as_millis() as u64,
    })??;

    let latency = started.elapsed();
    let chain_id = parse_quantity(&chain_hex)?;
    if chain_id != expected_chain_id {
        return Err(RpcError::ChainMismatch {
            expected: expected_chain_id,
            actual: chain_id,
        });
    }

    Ok(ProbeReport {
        height: parse_quantity(&height_hex)?,
        latency,
    })
}

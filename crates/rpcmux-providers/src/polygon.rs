//! Polygon PoS mainnet pool.

use std::sync::Arc;

use rpcmux_core::{EndpointManager, ManagerConfig};

pub const CHAIN_ID: u64 = 137;

/// Public endpoints, ordered by observed reliability. The order only seeds
/// the initial selection and breaks ties; live selection is latency-driven.
pub const MAINNET_RPCS: &[&str] = &[
    "https://polygon-rpc.com",
    "https://rpc.ankr.com/polygon",
    "https://polygon.llamarpc.com",
    "https://polygon-bor-rpc.publicnode.com",
    "https://polygon.drpc.org",
    "https://1rpc.io/matic",
    "https://polygon.meowrpc.com",
];

/// Manager over the built-in public pool with reference defaults.
pub fn mainnet() -> Arc<EndpointManager> {
    crate::manager_for(MAINNET_RPCS, ManagerConfig::for_chain(CHAIN_ID))
        .expect("built-in pool is non-empty")
}

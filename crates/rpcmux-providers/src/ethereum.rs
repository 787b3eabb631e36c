//! Ethereum mainnet pool.

use std::sync::Arc;

use rpcmux_core::{EndpointManager, ManagerConfig};

pub const CHAIN_ID: u64 = 1;

pub const MAINNET_RPCS: &[&str] = &[
    "https://cloudflare-eth.com",
    "https://rpc.ankr.com/eth",
    "https://eth.llamarpc.com",
    "https://ethereum-rpc.publicnode.com",
];

/// Manager over the built-in public pool with reference defaults.
pub fn mainnet() -> Arc<EndpointManager> {
    crate::manager_for(MAINNET_RPCS, ManagerConfig::for_chain(CHAIN_ID))
        .expect("built-in pool is non-empty")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_shape() {
        let manager = mainnet();
        assert_eq!(manager.config().expected_chain_id, CHAIN_ID);
        assert_eq!(manager.snapshot().healthy.len(), MAINNET_RPCS.len());
    }
}

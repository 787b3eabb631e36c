//! rpcmux-providers — pre-wired public endpoint pools.
//!
//! Free, no-API-key endpoints suitable for development and light
//! production traffic. Rate limits are lower and reliability varies,
//! which is exactly what the manager's failover machinery is for.

pub mod ethereum;
pub mod polygon;

use std::sync::Arc;

use rpcmux_core::transport::RpcTransport;
use rpcmux_core::{EndpointManager, ManagerConfig, RpcError};
use rpcmux_http::HttpTransport;

/// Build a manager over an arbitrary ordered list of endpoint URLs.
pub fn manager_for(urls: &[&str], config: ManagerConfig) -> Result<Arc<EndpointManager>, RpcError> {
    let transports: Vec<Arc<dyn RpcTransport>> = urls
        .iter()
        .map(|url| Arc::new(HttpTransport::default_for(*url)) as Arc<dyn RpcTransport>)
        .collect();
    Ok(Arc::new(EndpointManager::new(transports, config)?))
}

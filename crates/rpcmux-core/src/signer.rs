//! Signing-provider abstraction for the write path.
//!
//! Transactions are signed by the connected wallet, which is the only
//! holder of key material; they never route through the managed read pool.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::RpcError;
use crate::request::JsonRpcRequest;

/// Notifications emitted by a wallet provider.
#[derive(Debug, Clone)]
pub enum WalletEvent {
    /// The exposed account set changed (possibly to empty).
    AccountsChanged(Vec<String>),
    /// The wallet switched to a different chain.
    ChainChanged(u64),
    /// The wallet disconnected entirely.
    Disconnected,
}

/// A wallet-held signing provider.
#[async_trait]
pub trait SigningProvider: Send + Sync + 'static {
    /// Submit a request through the wallet, typically `eth_sendTransaction`.
    async fn request(&self, req: JsonRpcRequest) -> Result<Value, RpcError>;

    /// Subscribe to account and chain-change notifications.
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}

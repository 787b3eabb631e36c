//! The `RpcTransport` trait — read-path abstraction over a single endpoint.
//!
//! # Thread Safety
//! Implementations must be `Send + Sync` for use across Tokio tasks.
//!
//! # Object Safety
//! The trait is object-safe and is stored as `Arc<dyn RpcTransport>`
//! throughout the manager; the generic `call` helper lives in an inherent
//! impl on the trait object.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::RpcError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};

#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    /// Send one JSON-RPC request and return the raw response envelope.
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, RpcError>;

    /// The endpoint URL this transport talks to.
    fn url(&self) -> &str;
}

impl dyn RpcTransport {
    /// Call `method` and deserialize the result field.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, RpcError> {
        let req = JsonRpcRequest::new(method, params);
        let value = self.send(req).await?.into_result()?;
        serde_json::from_value(value).map_err(|e| RpcError::MalformedResponse(e.to_string()))
    }
}

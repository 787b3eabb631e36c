//! JSON-RPC 2.0 wire types.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RpcError;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Request/response correlation id. Nodes echo back whatever they were
/// sent; some return null when they could not parse the request at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(u64),
    String(String),
    Null,
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<Value>,
    pub id: RequestId,
}

impl JsonRpcRequest {
    /// Build a request carrying a process-unique id.
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id: RequestId::Number(NEXT_ID.fetch_add(1, Ordering::Relaxed)),
        }
    }
}

/// Error object carried inside a JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl std::fmt::Display for RpcErrorObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rpc error {}: {}", self.code, self.message)
    }
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

impl JsonRpcResponse {
    /// Unwrap the result value, surfacing a node-side error object as
    /// [`RpcError::Rpc`].
    pub fn into_result(self) -> Result<Value, RpcError> {
        match self.error {
            Some(err) => Err(RpcError::Rpc(err)),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Parse an Ethereum hex quantity (`"0x1b4"`) into a `u64`.
pub fn parse_quantity(raw: &str) -> Result<u64, RpcError> {
    let digits = raw.trim_start_matches("0x");
    u64::from_str_radix(digits, 16)
        .map_err(|_| RpcError::MalformedResponse(format!("not a hex quantity: {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serialization() {
        let req = JsonRpcRequest::new("eth_blockNumber", vec![]);
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"method\":\"eth_blockNumber\""));
    }

    #[test]
    fn request_ids_are_unique() {
        let a = JsonRpcRequest::new("eth_chainId", vec![]);
        let b = JsonRpcRequest::new("eth_chainId", vec![]);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn into_result_ok() {
        let resp = JsonRpcResponse {
            jsonrpc: "2.0".into(),
            id: RequestId::Number(1),
            result: Some(Value::String("0x89".into())),
            error: None,
        };
        assert_eq!(resp.into_result().unwrap(), Value::String("0x89".into()));
    }

    #[test]
    fn into_result_error() {
        let resp = JsonRpcResponse {
            jsonrpc: "2.0".into(),
            id: RequestId::Null,
            result: None,
            error: Some(RpcErrorObject {
                code: -32000,
                message: "execution reverted".into(),
                data: None,
            }),
        };
        match resp.into_result() {
            Err(RpcError::Rpc(obj)) => assert_eq!(obj.code, -32000),
            other => panic!("expected rpc error, got {other:?}"),
        }
    }

    #[test]
    fn quantity_parsing() {
        assert_eq!(parse_quantity("0x89").unwrap(), 137);
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert!(parse_quantity("not-hex").is_err());
    }
}

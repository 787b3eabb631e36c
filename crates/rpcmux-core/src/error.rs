//! Error types shared across the workspace.

use thiserror::Error;

use crate::policy::{classify, Disposition};
use crate::request::RpcErrorObject;

/// Errors produced by transports, probes and the endpoint manager.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Request never produced a usable HTTP response (refused, reset, DNS).
    #[error("transport error: {0}")]
    Transport(String),

    /// Endpoint answered with HTTP 429 or an equivalent rate-limit signal.
    #[error("rate limited by {endpoint}")]
    RateLimited { endpoint: String },

    /// Request or probe exceeded its deadline.
    #[error("timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Response body was not a valid JSON-RPC envelope.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Node returned a JSON-RPC error object.
    #[error("{0}")]
    Rpc(RpcErrorObject),

    /// Endpoint serves a different chain than this deployment expects.
    #[error("chain id mismatch: expected {expected}, endpoint reports {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// No wallet provider is connected; transactions cannot be signed.
    #[error("no signing provider available")]
    NoSigner,

    /// The manager was constructed with an empty endpoint list.
    #[error("endpoint pool is empty")]
    EmptyPool,
}

impl RpcError {
    /// Returns `true` if the failure is attributable to transport or
    /// infrastructure rather than the call's own semantics.
    pub fn is_retryable(&self) -> bool {
        classify(self) == Disposition::Retryable
    }
}

//! Retry-vs-fail classification of call errors.
//!
//! Retrying a rejected transaction can spend gas twice, so the split
//! between infrastructure failures and call-semantic failures is
//! load-bearing. Known causes are closed lists matched against the
//! normalized error; anything unrecognized defaults to retryable, which
//! is the right bias for read traffic against flaky public endpoints.

use crate::error::RpcError;
use crate::request::RpcErrorObject;

/// What the executor is allowed to do with a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Transport/infrastructure trouble: safe to retry, counts against
    /// endpoint health.
    Retryable,
    /// The call itself was rejected: never retried, no health penalty.
    NonRetryable,
}

/// Message fragments identifying call-semantic failures.
const SEMANTIC_FAILURES: &[&str] = &[
    "transaction failed",
    "transaction underpriced",
    "nonce too low",
    "replacement transaction underpriced",
    "already known",
    "insufficient funds",
    "gas required exceeds allowance",
    "execution reverted",
];

/// Provider codes for the same conditions (nonce, underpriced, gas and
/// revert families).
const SEMANTIC_FAILURE_CODES: &[i64] = &[-32000, -32003, -32010, 3];

/// Message fragments identifying transport-level trouble.
const CONNECTION_FAILURES: &[&str] = &[
    "too many requests",
    "failed to fetch",
    "connection",
    "timed out",
    "timeout",
    "malformed",
];

/// Rate-limit codes used by several public providers.
const RATE_LIMIT_CODES: &[i64] = &[-32005, 429];

/// Classify an error into exactly one disposition.
pub fn classify(err: &RpcError) -> Disposition {
    match err {
        RpcError::Transport(_)
        | RpcError::RateLimited { .. }
        | RpcError::Timeout { .. }
        | RpcError::MalformedResponse(_) => Disposition::Retryable,

        RpcError::Rpc(obj) => classify_rpc(obj),

        // Configuration errors: fatal for the requested operation.
        RpcError::ChainMismatch { .. } | RpcError::NoSigner | RpcError::EmptyPool => {
            Disposition::NonRetryable
        }
    }
}

fn classify_rpc(obj: &RpcErrorObject) -> Disposition {
    if RATE_LIMIT_CODES.contains(&obj.code) {
        return Disposition::Retryable;
    }
    let message = obj.message.to_lowercase();
    if SEMANTIC_FAILURES.iter().any(|m| message.contains(m))
        || SEMANTIC_FAILURE_CODES.contains(&obj.code)
    {
        return Disposition::NonRetryable;
    }
    if CONNECTION_FAILURES.iter().any(|m| message.contains(m)) {
        return Disposition::Retryable;
    }
    // Unknown node errors are retried; see module docs.
    Disposition::Retryable
}

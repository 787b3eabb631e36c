//! Failure policy — error classification and the retry backoff schedule.

pub mod backoff;
pub mod classify;

pub use backoff::BackoffConfig;
pub use classify::{classify, Disposition};

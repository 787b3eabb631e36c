//! rpcmux-http — HTTP JSON-RPC transport backed by `reqwest`.
//!
//! A deliberately thin transport: retry, failover and health tracking live
//! in the manager (`rpcmux-core`), so this crate only turns HTTP and
//! JSON-RPC failures into the shared error taxonomy.

pub mod client;

pub use client::{HttpTransport, HttpTransportConfig};

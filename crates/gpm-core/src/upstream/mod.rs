//! Outbound side of the gateway.
//!
//! This module handles everything between the multiplexer and the network:
//!
//! - The proxy pool loaded once at startup, with a uniform-random selector
//! - Per-attempt HTTP client construction (direct or proxied, TLS
//!   verification disabled)
//! - Attempt error classification, including the cancellation filter

pub mod client;
pub mod errors;
pub mod pool;

pub use client::{direct_client, proxied_client};
pub use errors::{is_cancellation, AttemptError};
pub use pool::{PoolError, ProxyPool};

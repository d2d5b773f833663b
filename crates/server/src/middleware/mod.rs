//! HTTP middleware for the gateway routes.
//!
//! Handles inbound-boundary concerns (status codes, exact response bodies)
//! while the core library stays unaware of HTTP framing.

pub mod auth;

pub use auth::api_key_middleware;

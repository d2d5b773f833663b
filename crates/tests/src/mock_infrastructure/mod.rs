//! Mock infrastructure for gateway testing.
//!
//! Provides reusable mock origins so tests never touch a real network:
//!
//! - [`OriginMock`]: wraps mockito with gateway-specific response helpers
//! - [`hung_origin`]: a TCP listener that accepts connections and never
//!   responds, for deterministic timeout paths

pub mod origin_mock;

pub use origin_mock::{hung_origin, OriginMock};

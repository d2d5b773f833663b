//! # gpm Core
//!
//! Core library for the gpm gateway: a small HTTP forwarder that fans each
//! inbound request out into several concurrent outbound attempts and delivers
//! the first successful response.
//!
//! This crate provides the foundational components for:
//!
//! - **[`multiplexer`]**: The per-request state machine that orchestrates
//!   fan-out, first-wins selection, error accounting, timeout, and
//!   cancellation.
//!
//! - **[`upstream`]**: The outbound side: the proxy pool loaded at startup
//!   and the per-attempt HTTP client factory.
//!
//! - **[`config`]**: Process-wide read-only settings loaded from `GPM_*`
//!   environment variables.
//!
//! ## Request Flow
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────┐
//! │ Multiplexer │ ── spawns N attempts ──► attempt 1: direct
//! │ (selection  │                          attempt 2..N: random proxy
//! │   loop)     │
//! └──────┬──────┘
//!        │ first 2xx │ N counted errors │ deadline
//!        ▼           ▼                  ▼
//!    Success     AllErrored          TimedOut
//! ```
//!
//! Exactly one [`multiplexer::Outcome`] is produced per run; every other
//! attempt is cancelled and its response released.

pub mod config;
pub mod multiplexer;
pub mod upstream;

//! Admin web surface.
//!
//! This module provides a small HTTP(S) server that:
//! - Answers liveness probes on `/health`
//! - Exposes the relay counters on `/metrics`
//! - Accepts debugging traffic on `/post`, optionally bearer-gated
//!
//! It shares nothing with the relay loop except the counters.

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::{is_auth_enabled, verify_bearer};
pub use handlers::{health, metrics, post_sink, router, AppState};
pub use server::{load_tls, serve};

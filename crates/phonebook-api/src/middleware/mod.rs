//! API Middleware
//!
//! Session authentication for the protected `/v1` routes.

pub mod auth;

pub use auth::{require_auth, AuthUser, GateState, TokenSource, DEFAULT_TOKEN_COOKIE};

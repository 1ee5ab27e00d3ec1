//! Axum HTTP server and routing.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Inject shared application state (`AppState`) into handlers.
//! - Fold every "cannot reveal" outcome into one 404 so callers cannot tell a
//!   consumed secret from a forged token.

pub mod handlers;
pub mod router;
pub mod state;

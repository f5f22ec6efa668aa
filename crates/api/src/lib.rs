//! Service desk API server library.
//!
//! Exposes the building blocks (config, state, error handling, lifecycle
//! orchestration, routes, WebSocket transport) so integration tests and the
//! binary entrypoint share them.

pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod media;
pub mod middleware;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod ws;

//! HTTP API for the demo profile backend.
//!
//! Provides the session and profile endpoints, request routing,
//! and `HttpGateway`, the client side of the same endpoints.

pub mod client;
pub mod handlers;
pub mod router;
pub mod server;

pub use client::HttpGateway;

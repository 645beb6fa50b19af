//! Inbound HTTP handling.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, tracing, inbound timeout)
//!     → routing::match_request (live table snapshot)
//!     → filter::execute (pre hooks → proxy::Forwarder → post hooks)
//!     → Send to client
//! ```

pub mod server;

pub use server::{GatewayState, HttpServer};

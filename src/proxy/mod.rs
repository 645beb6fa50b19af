//! Proxy subsystem.
//!
//! # Data Flow
//! ```text
//! Matched request
//!     → context.rs (RequestContext: request id, header overlay, cancel token)
//!     → [filter chain pre phase edits the overlay]
//!     → context.rs (UpstreamRequest: rewritten head)
//!     → forwarder.rs (hyper client, deadline, optional retries)
//!     → headers.rs (hop-by-hop stripping both ways)
//!     → streamed Response back to the filter chain
//! ```
//!
//! # Design Decisions
//! - RequestContext is owned by one request task, never shared
//! - Bodies are streamed; only replayable retries buffer
//! - Backend timeouts result in 504, connect/protocol failures in 502

pub mod context;
pub mod forwarder;
pub mod headers;

pub use context::{RequestContext, UpstreamRequest, X_REQUEST_ID};
pub use forwarder::Forwarder;
pub use headers::HeaderOverlay;

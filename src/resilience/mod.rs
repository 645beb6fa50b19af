//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Forward to upstream:
//!     → timeouts.rs (per-route deadline over the whole forward step)
//!     → On connect failure: retries.rs (safe methods only, opt-in)
//!     → backoff.rs (jittered exponential delay between attempts)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has a deadline
//! - Retries only for safe methods (GET, HEAD, OPTIONS, TRACE)

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{is_safe_method, RetryPolicy};
pub use timeouts::{forward_timeout, with_deadline};

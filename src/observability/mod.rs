//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, request id in every span)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → whatever `metrics` recorder the embedder installs
//! ```

pub mod logging;
pub mod metrics;

pub use logging::init_logging;

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → routes handed to routing::RouteTable::load
//!
//! On reload signal:
//!     watcher.rs detects change
//!     → ReloadTrigger sent to the reload task
//!     → loader.rs loads new config
//!     → admin::RouteStore compiles and swaps the route table
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, FilterDefinition, GatewayConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    Phase, RetryConfig, RouteDefinition, TimeoutConfig, PLACEHOLDER_API_KEY,
};
pub use validation::ValidationError;
pub use watcher::{ConfigWatcher, ReloadTrigger};

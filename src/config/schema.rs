//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin endpoint settings.
    pub admin: AdminConfig,

    /// Route definitions, in declaration order.
    pub routes: Vec<RouteDefinition>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// One route record as written in the config file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RouteDefinition {
    /// Route identifier for logging; generated from the index when absent.
    #[serde(default)]
    pub id: Option<String>,

    /// Path pattern (`/svc/**`, `/users/{id}`, `/health`).
    pub path_pattern: String,

    /// HTTP method to match; any method when absent.
    #[serde(default)]
    pub method: Option<String>,

    /// Host header to match (case-insensitive); any host when absent.
    #[serde(default)]
    pub host: Option<String>,

    /// Base URI requests are forwarded to.
    pub target_uri: String,

    /// Route priority (higher = preferred over longer prefixes).
    #[serde(default)]
    pub priority: i32,

    /// Forward timeout override in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Forward only the part of the path matched by `**`.
    #[serde(default = "default_strip_prefix")]
    pub strip_prefix: bool,

    /// Filters attached to this route, in declaration order.
    #[serde(default)]
    pub filters: Vec<FilterDefinition>,
}

impl RouteDefinition {
    /// Minimal definition, used by tests and programmatic setups.
    pub fn new(path_pattern: impl Into<String>, target_uri: impl Into<String>) -> Self {
        Self {
            id: None,
            path_pattern: path_pattern.into(),
            method: None,
            host: None,
            target_uri: target_uri.into(),
            priority: 0,
            timeout_ms: None,
            strip_prefix: default_strip_prefix(),
            filters: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_filter(mut self, filter: FilterDefinition) -> Self {
        self.filters.push(filter);
        self
    }
}

fn default_strip_prefix() -> bool {
    true
}

/// Phase a filter definition runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Pre,
    Post,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Pre => f.write_str("pre"),
            Phase::Post => f.write_str("post"),
        }
    }
}

/// One filter attachment as written in the config file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FilterDefinition {
    /// Registered filter name (e.g. `AddRequestHeader`).
    pub name: String,

    /// Instance id pairing pre and post halves; defaults to `name`.
    #[serde(default)]
    pub id: Option<String>,

    pub phase: Phase,

    /// Status returned to the client when this filter fails.
    #[serde(default)]
    pub error_status: Option<u16>,

    /// Filter-specific options.
    #[serde(default)]
    pub options: BTreeMap<String, serde_json::Value>,
}

impl FilterDefinition {
    pub fn new(name: impl Into<String>, phase: Phase) -> Self {
        Self {
            name: name.into(),
            id: None,
            phase,
            error_status: None,
            options: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn with_error_status(mut self, status: u16) -> Self {
        self.error_status = Some(status);
        self
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Default forward timeout in milliseconds (per route override wins).
    pub forward_ms: u64,

    /// Ceiling for a whole inbound request in seconds.
    pub request_secs: u64,
}

impl TimeoutConfig {
    /// Inbound request ceiling; every forward timeout must stay below it.
    pub fn request_limit(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            forward_ms: 30_000,
            request_secs: 60,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries (safe methods only).
    pub enabled: bool,

    /// Maximum number of attempts, the first one included.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

/// Default admin key; refused when the admin listener is enabled.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin listener.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin listener bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
            bind_address: "127.0.0.1:9901".to_string(),
        }
    }
}

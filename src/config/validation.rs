//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Provide the error vocabulary used when compiling route tables
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Route-level checks (patterns, targets, filters) run in
//!   `routing::table` because they need the compiled forms

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{GatewayConfig, Phase, PLACEHOLDER_API_KEY};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },

    #[error("admin.api_key must not be empty when the admin listener is enabled")]
    EmptyAdminKey,

    #[error("admin.api_key is still the placeholder; set a real key to enable the admin listener")]
    PlaceholderAdminKey,

    #[error("{field} ({timeout_ms} ms) must be below timeouts.request_secs ({limit_ms} ms)")]
    TimeoutAboveRequestLimit {
        field: String,
        timeout_ms: u64,
        limit_ms: u64,
    },

    #[error("route '{0}': timeout_ms must be greater than zero")]
    ZeroRouteTimeout(String),

    #[error("duplicate route id '{0}'")]
    DuplicateRouteId(String),

    #[error("route '{route}': duplicate (host={host}, method={method}, pattern={pattern})")]
    DuplicateRoute {
        route: String,
        host: String,
        method: String,
        pattern: String,
    },

    #[error("route '{route}': invalid path pattern '{pattern}': {reason}")]
    InvalidPattern {
        route: String,
        pattern: String,
        reason: String,
    },

    #[error("route '{route}': invalid method '{method}'")]
    InvalidMethod { route: String, method: String },

    #[error("route '{route}': invalid target uri '{uri}': {reason}")]
    InvalidTarget {
        route: String,
        uri: String,
        reason: String,
    },

    #[error("route '{route}': unknown filter '{filter}'")]
    UnknownFilter { route: String, filter: String },

    #[error("route '{route}': filter '{filter}': {reason}")]
    InvalidFilter {
        route: String,
        filter: String,
        reason: String,
    },

    #[error("route '{route}': filter '{filter}' declared twice in {phase} phase")]
    DuplicateFilter {
        route: String,
        filter: String,
        phase: Phase,
    },
}

/// Validate everything outside the route table.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.timeouts.forward_ms == 0 {
        errors.push(ValidationError::ZeroValue { field: "timeouts.forward_ms" });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroValue { field: "timeouts.request_secs" });
    }
    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::ZeroValue { field: "retries.max_attempts" });
    }

    if config.admin.enabled {
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidAddress {
                field: "admin.bind_address",
                value: config.admin.bind_address.clone(),
            });
        }
        if config.admin.api_key.trim().is_empty() {
            errors.push(ValidationError::EmptyAdminKey);
        } else if config.admin.api_key == PLACEHOLDER_API_KEY {
            errors.push(ValidationError::PlaceholderAdminKey);
        }
    }

    let limit_ms = config.timeouts.request_secs.saturating_mul(1000);
    if limit_ms > 0 {
        let field = "timeouts.forward_ms".to_string();
        if let Some(err) = check_request_limit(field, config.timeouts.forward_ms, limit_ms) {
            errors.push(err);
        }
    }

    for (index, route) in config.routes.iter().enumerate() {
        let id = route.id.clone().unwrap_or_else(|| format!("route-{}", index));
        match route.timeout_ms {
            Some(0) => errors.push(ValidationError::ZeroRouteTimeout(id)),
            Some(timeout_ms) if limit_ms > 0 => {
                let field = format!("route '{}': timeout_ms", id);
                if let Some(err) = check_request_limit(field, timeout_ms, limit_ms) {
                    errors.push(err);
                }
            }
            _ => {}
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// A forward timeout at or above the inbound ceiling would be cut off by
/// the ceiling instead of surfacing as an upstream timeout.
pub(crate) fn check_request_limit(field: String, timeout_ms: u64, limit_ms: u64) -> Option<ValidationError> {
    (timeout_ms >= limit_ms).then_some(ValidationError::TimeoutAboveRequestLimit {
        field,
        timeout_ms,
        limit_ms,
    })
}

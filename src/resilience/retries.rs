//! Retry logic.
//!
//! # Responsibilities
//! - Determine if a request is retryable (safe methods only)
//! - Decide whether another attempt is allowed
//!
//! # Design Decisions
//! - Never retry POST/PUT/DELETE/PATCH, nor idempotent-but-unsafe methods
//! - Only connection failures are retried; once the upstream has seen the
//!   request, a failure is reported as-is
//! - Disabled unless configured

use std::time::Duration;

use axum::http::Method;

use crate::config::RetryConfig;
use crate::error::GatewayError;
use crate::resilience::backoff::calculate_backoff;

/// Safe methods per RFC 9110: no side effects on the upstream.
pub fn is_safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// Retry decisions for one forwarder.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    enabled: bool,
    max_attempts: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            max_attempts: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Attempts allowed for `method`, the first one included.
    pub fn attempts_for(&self, method: &Method) -> u32 {
        if self.enabled && is_safe_method(method) {
            self.max_attempts.max(1)
        } else {
            1
        }
    }

    /// Delay before the next attempt, or `None` if `error` after `attempt`
    /// attempts is final.
    pub fn next_delay(&self, method: &Method, attempt: u32, error: &GatewayError) -> Option<Duration> {
        let retryable = matches!(error, GatewayError::Connect { .. });
        if retryable && attempt < self.attempts_for(method) {
            Some(calculate_backoff(attempt, self.base_delay_ms, self.max_delay_ms))
        } else {
            None
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            enabled: config.enabled,
            max_attempts: config.max_attempts,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }
}

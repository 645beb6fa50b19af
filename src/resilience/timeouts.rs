//! Timeout enforcement.
//!
//! # Responsibilities
//! - Resolve the effective forward timeout of a route
//! - Wrap upstream calls with a deadline
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the wrapped future is dropped on
//!   expiry, which cancels the upstream call
//! - Timeout errors are distinct from other errors (504, not 502)

use std::future::Future;
use std::time::Duration;

use crate::error::GatewayError;

/// Route override if present, gateway default otherwise.
pub fn forward_timeout(route_timeout: Option<Duration>, default: Duration) -> Duration {
    route_timeout.unwrap_or(default)
}

/// Run `fut`, failing with `GatewayError::Timeout` after `limit`.
pub async fn with_deadline<T, F>(target: &str, limit: Duration, fut: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout {
            target: target.to_string(),
            after: limit,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_override_wins() {
        let default = Duration::from_secs(30);
        assert_eq!(forward_timeout(None, default), default);
        assert_eq!(
            forward_timeout(Some(Duration::from_millis(100)), default),
            Duration::from_millis(100)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expires() {
        let result: Result<(), GatewayError> = with_deadline(
            "http://slow",
            Duration::from_millis(100),
            std::future::pending(),
        )
        .await;
        assert!(matches!(result, Err(GatewayError::Timeout { after, .. }) if after == Duration::from_millis(100)));
    }

    #[tokio::test]
    async fn test_deadline_passes_result_through() {
        let result = with_deadline("http://fast", Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}

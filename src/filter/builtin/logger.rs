//! Request logging filter.

use async_trait::async_trait;

use crate::config::Phase;
use crate::error::BoxError;
use crate::filter::spec::FilterSpec;
use crate::filter::{FilterAction, GatewayFilter, ResponseView};
use crate::proxy::RequestContext;

/// Logs a message when a request enters and/or leaves the route.
#[derive(Debug, Clone)]
pub struct Logger {
    base_message: String,
    pre_logger: bool,
    post_logger: bool,
}

impl Logger {
    pub fn new(base_message: impl Into<String>) -> Self {
        Self {
            base_message: base_message.into(),
            pre_logger: true,
            post_logger: true,
        }
    }

    pub fn from_spec(spec: &FilterSpec) -> Result<Self, String> {
        spec.expect_phase(&[Phase::Pre, Phase::Post])?;
        spec.allow_options(&["base_message", "pre_logger", "post_logger"])?;

        Ok(Self {
            base_message: spec.str_option("base_message")?.unwrap_or("request").to_string(),
            pre_logger: spec.bool_option("pre_logger", true)?,
            post_logger: spec.bool_option("post_logger", true)?,
        })
    }
}

#[async_trait]
impl GatewayFilter for Logger {
    fn name(&self) -> &str {
        "Logger"
    }

    async fn pre(&self, ctx: &mut RequestContext) -> Result<FilterAction, BoxError> {
        if self.pre_logger {
            tracing::info!(
                request_id = %ctx.request_id(),
                remote_addr = ?ctx.remote_addr(),
                method = %ctx.method(),
                path = %ctx.uri().path(),
                route = %ctx.route().id,
                "{} (pre)",
                self.base_message
            );
        }
        Ok(FilterAction::Continue)
    }

    async fn post(&self, ctx: &RequestContext, response: &mut ResponseView<'_>) -> Result<(), BoxError> {
        if self.post_logger {
            tracing::info!(
                request_id = %ctx.request_id(),
                remote_addr = ?ctx.remote_addr(),
                status = response.effective_status().as_u16(),
                error = ?response.failure().map(|e| e.code()),
                elapsed_ms = ctx.elapsed().as_millis() as u64,
                "{} (post)",
                self.base_message
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterDefinition;

    #[test]
    fn test_from_spec_reads_flags() {
        let def = FilterDefinition::new("Logger", Phase::Post)
            .with_option("base_message", "hello")
            .with_option("pre_logger", false);
        let logger = Logger::from_spec(&FilterSpec::from_definition(&def).unwrap()).unwrap();
        assert_eq!(logger.base_message, "hello");
        assert!(!logger.pre_logger);
        assert!(logger.post_logger);

        let defaults = Logger::new("request");
        assert!(defaults.pre_logger && defaults.post_logger);
    }

    #[test]
    fn test_rejects_non_boolean_flags() {
        let def = FilterDefinition::new("Logger", Phase::Pre).with_option("pre_logger", "yes");
        assert!(Logger::from_spec(&FilterSpec::from_definition(&def).unwrap()).is_err());
    }
}

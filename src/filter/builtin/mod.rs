//! Filters available to every route by name.
//!
//! | Name                   | Phase     | Options                                   |
//! |------------------------|-----------|-------------------------------------------|
//! | `AddRequestHeader`     | pre       | `name`, `value`                           |
//! | `RemoveRequestHeader`  | pre       | `name`                                    |
//! | `AddResponseHeader`    | post      | `name`, `value`                           |
//! | `RemoveResponseHeader` | post      | `name`                                    |
//! | `RequireHeader`        | pre       | `name`, `status` (401)                    |
//! | `Logger`               | pre, post | `base_message`, `pre_logger`, `post_logger` |

pub mod headers;
pub mod logger;
pub mod require_header;

use std::sync::Arc;

use crate::filter::registry::FilterRegistry;
use crate::filter::GatewayFilter;

pub use headers::{AddRequestHeader, AddResponseHeader, RemoveRequestHeader, RemoveResponseHeader};
pub use logger::Logger;
pub use require_header::RequireHeader;

/// Register every built-in filter under its name.
pub fn register_all(registry: &mut FilterRegistry) {
    registry.register("AddRequestHeader", |spec| {
        Ok(Arc::new(AddRequestHeader::from_spec(spec)?) as Arc<dyn GatewayFilter>)
    });
    registry.register("RemoveRequestHeader", |spec| {
        Ok(Arc::new(RemoveRequestHeader::from_spec(spec)?) as Arc<dyn GatewayFilter>)
    });
    registry.register("AddResponseHeader", |spec| {
        Ok(Arc::new(AddResponseHeader::from_spec(spec)?) as Arc<dyn GatewayFilter>)
    });
    registry.register("RemoveResponseHeader", |spec| {
        Ok(Arc::new(RemoveResponseHeader::from_spec(spec)?) as Arc<dyn GatewayFilter>)
    });
    registry.register("RequireHeader", |spec| {
        Ok(Arc::new(RequireHeader::from_spec(spec)?) as Arc<dyn GatewayFilter>)
    });
    registry.register("Logger", |spec| {
        Ok(Arc::new(Logger::from_spec(spec)?) as Arc<dyn GatewayFilter>)
    });
}

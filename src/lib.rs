//! HTTP API gateway core.
//!
//! Requests are matched against a hot-reloadable route table, run through
//! the route's filter chain and forwarded to the route's upstream target.

pub mod admin;
pub mod config;
pub mod error;
pub mod filter;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod resilience;
pub mod routing;

pub use admin::RouteStore;
pub use config::schema::GatewayConfig;
pub use error::{FilterError, GatewayError};
pub use filter::{FilterRegistry, GatewayFilter};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{Route, RouteTable};

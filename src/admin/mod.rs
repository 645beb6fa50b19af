//! Administrative API.
//!
//! Served on its own listener (`admin.bind_address`), never on the
//! gateway port, and only when `admin.enabled` is set.
//!
//! | Method | Path            | Purpose                               |
//! |--------|-----------------|---------------------------------------|
//! | GET    | `/admin/status` | version, table generation, last error |
//! | GET    | `/admin/routes` | routes of the live table              |
//! | POST   | `/admin/reload` | re-read the config file and publish   |

pub mod auth;
pub mod handlers;
pub mod reload;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;

pub use reload::{reload_task, RouteStore};

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub store: Arc<RouteStore>,
    pub config_path: Option<PathBuf>,
    pub api_key: Arc<str>,
    pub started: Instant,
}

impl AdminState {
    pub fn new(store: Arc<RouteStore>, config_path: Option<PathBuf>, api_key: &str) -> Self {
        Self {
            store,
            config_path,
            api_key: Arc::from(api_key),
            started: Instant::now(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/routes", get(get_routes))
        .route("/admin/reload", post(post_reload))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

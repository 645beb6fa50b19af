use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::admin::AdminState;
use crate::config::{ConfigError, ReloadTrigger};
use crate::routing::Route;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub generation: u64,
    pub routes: usize,
    pub uptime_secs: u64,
    pub last_reload_error: Option<String>,
}

#[derive(Serialize)]
pub struct RouteSummary {
    pub id: String,
    pub path_pattern: String,
    pub method: Option<String>,
    pub host: Option<String>,
    pub target_uri: String,
    pub priority: i32,
    pub timeout_ms: Option<u64>,
    pub strip_prefix: bool,
    pub filters: Vec<String>,
}

impl From<&Route> for RouteSummary {
    fn from(route: &Route) -> Self {
        Self {
            id: route.id.clone(),
            path_pattern: route.pattern.as_str().to_string(),
            method: route.method.as_ref().map(|m| m.to_string()),
            host: route.host.clone(),
            target_uri: route.target.to_string(),
            priority: route.priority,
            timeout_ms: route.timeout.map(|t| t.as_millis() as u64),
            strip_prefix: route.strip_prefix,
            filters: route.filters.stage_ids().into_iter().map(String::from).collect(),
        }
    }
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let table = state.store.current();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        generation: table.generation(),
        routes: table.len(),
        uptime_secs: state.started.elapsed().as_secs(),
        last_reload_error: state.store.last_error(),
    })
}

pub async fn get_routes(State(state): State<AdminState>) -> Json<Vec<RouteSummary>> {
    let table = state.store.current();
    Json(table.routes().iter().map(|r| RouteSummary::from(r.as_ref())).collect())
}

pub async fn post_reload(State(state): State<AdminState>) -> Response {
    let Some(path) = state.config_path.clone() else {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "error": "gateway was started without a configuration file" })),
        )
            .into_response();
    };

    tracing::info!(trigger = %ReloadTrigger::Admin, path = %path.display(), "Reloading routes");
    let store = state.store.clone();
    let result = tokio::task::spawn_blocking(move || store.reload_from_path(&path)).await;

    match result {
        Ok(Ok(table)) => Json(json!({
            "generation": table.generation(),
            "routes": table.len(),
        }))
        .into_response(),
        Ok(Err(err)) => {
            let status = match err {
                ConfigError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            };
            let errors: Vec<String> = match err.validation_errors() {
                [] => vec![err.to_string()],
                list => list.iter().map(ToString::to_string).collect(),
            };
            (
                status,
                Json(json!({
                    "error": "reload rejected",
                    "generation": state.store.generation(),
                    "details": errors,
                })),
            )
                .into_response()
        }
        Err(join_error) => {
            tracing::error!(error = %join_error, "Reload task panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

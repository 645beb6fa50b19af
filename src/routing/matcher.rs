//! Request matching against a route table.
//!
//! # Responsibilities
//! - Select one route for (method, path, headers)
//! - Extract `{var}` path variables
//! - Compute the path that is forwarded upstream
//!
//! # Design Decisions
//! - Never blocks; the only allocation is the returned `MatchResult`
//! - A miss is an explicit `NoRouteFound`, not a silent default route

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{HeaderMap, Method};

use crate::error::GatewayError;
use crate::routing::pattern::Segment;
use crate::routing::table::{Route, RouteTable};

/// Outcome of a successful match.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub route: Arc<Route>,
    pub path_variables: HashMap<String, String>,
    /// Path appended to the route target (always starts with `/`).
    pub forward_path: String,
}

/// Match a request against `table`.
pub fn match_request(
    table: &RouteTable,
    method: &Method,
    path: &str,
    headers: &HeaderMap,
) -> Result<MatchResult, GatewayError> {
    let selection = table
        .select(method, path, headers)
        .ok_or_else(|| GatewayError::NoRouteFound {
            method: method.to_string(),
            path: path.to_string(),
        })?;

    let route = selection.route;
    let path_variables = extract_variables(&route, path);
    let forward_path = match selection.remainder {
        Some(rest) if route.strip_prefix => normalize(rest),
        _ => normalize(path),
    };

    Ok(MatchResult {
        route,
        path_variables,
        forward_path,
    })
}

fn extract_variables(route: &Route, path: &str) -> HashMap<String, String> {
    route
        .pattern
        .segments()
        .iter()
        .zip(path.split('/').filter(|s| !s.is_empty()))
        .filter_map(|(segment, value)| match segment {
            Segment::Param(name) => Some((name.clone(), value.to_string())),
            _ => None,
        })
        .collect()
}

fn normalize(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

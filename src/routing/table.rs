//! Compiled, immutable route table.
//!
//! # Responsibilities
//! - Validate route definitions (patterns, methods, targets, filters)
//! - Compile patterns into a segment trie once per load
//! - Select exactly one route for a request, or none
//!
//! # Selection order
//! Among all matching routes the winner is the one with, in order:
//! 1. the highest `priority`
//! 2. the longest prefix (segments before `**`)
//! 3. the most literal segments
//! 4. an exact pattern over a `**` pattern
//! 5. method/host constraints over wildcards
//! 6. the earliest declaration
//!
//! Rule 6 makes lookup deterministic when everything else ties, e.g.
//! `/a/{x}/c` and `/a/b/{y}` both match `/a/b/c` with the same rank: the
//! first declared wins.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderMap, Method};
use url::Url;

use crate::config::validation::check_request_limit;
use crate::config::{ConfigError, RouteDefinition, ValidationError};
use crate::filter::{FilterChain, FilterRegistry};
use crate::routing::pattern::PathPattern;
use crate::routing::trie::SegmentTrie;

/// Sort key of a route; larger is more specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct RouteRank {
    priority: i32,
    prefix_len: usize,
    literals: usize,
    exact: bool,
    constraints: u8,
}

/// A compiled route.
#[derive(Debug)]
pub struct Route {
    pub id: String,
    pub pattern: PathPattern,
    pub method: Option<Method>,
    /// Lowercased host constraint.
    pub host: Option<String>,
    pub target: Url,
    pub priority: i32,
    pub timeout: Option<Duration>,
    pub strip_prefix: bool,
    pub filters: FilterChain,
    index: usize,
    rank: RouteRank,
}

impl Route {
    /// Position in the definition list this route was loaded from.
    pub fn declaration_index(&self) -> usize {
        self.index
    }

    fn accepts(&self, method: &Method, host: Option<&str>) -> bool {
        if let Some(expected) = &self.method {
            if expected != method {
                return false;
            }
        }
        match (&self.host, host) {
            (None, _) => true,
            (Some(expected), Some(actual)) => expected.eq_ignore_ascii_case(actual),
            (Some(_), None) => false,
        }
    }
}

/// Route selected for a request, with the unmatched `**` remainder.
#[derive(Debug, Clone)]
pub(crate) struct Selection<'p> {
    pub route: Arc<Route>,
    pub remainder: Option<&'p str>,
}

/// Ordered, immutable set of routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
    trie: SegmentTrie,
    generation: u64,
}

impl RouteTable {
    /// A table that matches nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validate and compile `definitions`.
    ///
    /// All problems are reported together; nothing is built unless every
    /// definition is valid.
    pub fn load(
        definitions: &[RouteDefinition],
        registry: &FilterRegistry,
    ) -> Result<Self, ConfigError> {
        Self::load_with_limit(definitions, registry, None)
    }

    /// Like [`RouteTable::load`], also rejecting route timeouts at or above
    /// the inbound request ceiling.
    pub fn load_with_limit(
        definitions: &[RouteDefinition],
        registry: &FilterRegistry,
        request_limit: Option<Duration>,
    ) -> Result<Self, ConfigError> {
        let limit_ms = request_limit.map(|limit| limit.as_millis() as u64);
        let mut errors = Vec::new();
        let mut ids = HashSet::new();
        let mut keys = HashSet::new();
        let mut routes = Vec::with_capacity(definitions.len());

        for (index, def) in definitions.iter().enumerate() {
            let id = def.id.clone().unwrap_or_else(|| format!("route-{}", index));
            if !ids.insert(id.clone()) {
                errors.push(ValidationError::DuplicateRouteId(id.clone()));
            }

            let pattern = match PathPattern::parse(&def.path_pattern) {
                Ok(p) => Some(p),
                Err(reason) => {
                    errors.push(ValidationError::InvalidPattern {
                        route: id.clone(),
                        pattern: def.path_pattern.clone(),
                        reason,
                    });
                    None
                }
            };

            let method = match def.method.as_deref().map(parse_method) {
                None => Some(None),
                Some(Some(m)) => Some(Some(m)),
                Some(None) => {
                    errors.push(ValidationError::InvalidMethod {
                        route: id.clone(),
                        method: def.method.clone().unwrap_or_default(),
                    });
                    None
                }
            };

            let target = match parse_target(&def.target_uri) {
                Ok(url) => Some(url),
                Err(reason) => {
                    errors.push(ValidationError::InvalidTarget {
                        route: id.clone(),
                        uri: def.target_uri.clone(),
                        reason,
                    });
                    None
                }
            };

            let filters = match FilterChain::build(&id, &def.filters, registry) {
                Ok(chain) => Some(chain),
                Err(mut filter_errors) => {
                    errors.append(&mut filter_errors);
                    None
                }
            };

            match (def.timeout_ms, limit_ms) {
                (Some(0), _) => errors.push(ValidationError::ZeroRouteTimeout(id.clone())),
                (Some(timeout_ms), Some(limit_ms)) if limit_ms > 0 => {
                    let field = format!("route '{}': timeout_ms", id);
                    if let Some(err) = check_request_limit(field, timeout_ms, limit_ms) {
                        errors.push(err);
                    }
                }
                _ => {}
            }

            let host = def.host.as_ref().map(|h| h.to_ascii_lowercase());

            if let (Some(pattern), Some(method)) = (&pattern, &method) {
                let key = (
                    host.clone().unwrap_or_else(|| "*".to_string()),
                    method.as_ref().map(|m| m.to_string()).unwrap_or_else(|| "*".to_string()),
                    pattern.normalized(),
                );
                if !keys.insert(key.clone()) {
                    errors.push(ValidationError::DuplicateRoute {
                        route: id.clone(),
                        host: key.0,
                        method: key.1,
                        pattern: key.2,
                    });
                }
            }

            if let (Some(pattern), Some(method), Some(target), Some(filters)) =
                (pattern, method, target, filters)
            {
                let rank = RouteRank {
                    priority: def.priority,
                    prefix_len: pattern.prefix_len(),
                    literals: pattern.literal_count(),
                    exact: !pattern.is_prefix(),
                    constraints: u8::from(method.is_some()) + u8::from(host.is_some()),
                };
                routes.push(Arc::new(Route {
                    id,
                    pattern,
                    method,
                    host,
                    target,
                    priority: def.priority,
                    timeout: def.timeout_ms.map(Duration::from_millis),
                    strip_prefix: def.strip_prefix,
                    filters,
                    index,
                    rank,
                }));
            }
        }

        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }

        let mut trie = SegmentTrie::new();
        for (i, route) in routes.iter().enumerate() {
            trie.insert(&route.pattern, i);
        }

        Ok(Self {
            routes,
            trie,
            generation: 0,
        })
    }

    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Reload generation that published this table (0 if never published).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Routes in declaration order.
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Select the route for a request, if any.
    pub fn lookup(&self, method: &Method, path: &str, headers: &HeaderMap) -> Option<Arc<Route>> {
        self.select(method, path, headers).map(|s| s.route)
    }

    pub(crate) fn select<'p>(
        &self,
        method: &Method,
        path: &'p str,
        headers: &HeaderMap,
    ) -> Option<Selection<'p>> {
        let host = request_host(headers);
        let mut best: Option<(usize, Option<&'p str>)> = None;

        self.trie.visit(path, &mut |i, remainder| {
            let candidate = &self.routes[i];
            if !candidate.accepts(method, host) {
                return;
            }
            let better = match best {
                None => true,
                Some((current, _)) => {
                    let current = &self.routes[current];
                    candidate.rank > current.rank
                        || (candidate.rank == current.rank && candidate.index < current.index)
                }
            };
            if better {
                best = Some((i, remainder));
            }
        });

        best.map(|(i, remainder)| Selection {
            route: self.routes[i].clone(),
            remainder,
        })
    }
}

fn parse_method(raw: &str) -> Option<Method> {
    let upper = raw.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return None;
    }
    Method::from_bytes(upper.as_bytes()).ok()
}

fn parse_target(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err("missing host".to_string());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err("query and fragment are not allowed".to_string());
    }
    Ok(url)
}

/// Host header without port.
fn request_host(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(header::HOST)?.to_str().ok()?;
    if raw.starts_with('[') {
        // IPv6 literal: keep up to the closing bracket
        return raw.find(']').map(|end| &raw[..=end]);
    }
    Some(raw.split(':').next().unwrap_or(raw))
}

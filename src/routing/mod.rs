//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, host, path)
//!     → matcher.rs (match_request)
//!     → table.rs (candidate ranking)
//!     → trie.rs (segment walk over compiled patterns)
//!     → Return: MatchResult or NoRouteFound
//!
//! Route Compilation (at startup and on reload):
//!     RouteDefinition[]
//!     → pattern.rs (parse `/a/{id}/**`)
//!     → filter::FilterChain::build (bind filters)
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled once per load, immutable at runtime
//! - No regex in hot path (segment trie only)
//! - Deterministic: same input always matches same route
//! - Longest prefix wins; declaration order breaks exact ties

pub mod matcher;
pub mod pattern;
pub mod table;
pub mod trie;

pub use matcher::{match_request, MatchResult};
pub use pattern::PathPattern;
pub use table::{Route, RouteTable};

//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes in declaration order
//! - Look up the first route matching a payload
//! - Return matched group names or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan (acceptable for typical route counts)
//! - Explicit no-match; the caller falls back to the `default` group

use crate::alert::WebhookMessage;
use crate::config::{Config, RouteConfig};
use crate::routing::matcher::{AndMatcher, Matcher};

/// Group that receives payloads no route claims.
pub const DEFAULT_GROUP: &str = "default";

/// A compiled route.
#[derive(Debug)]
pub struct Route {
    pub name: String,
    pub matcher: AndMatcher,
    pub groups: Vec<String>,
}

impl Route {
    pub fn compile(config: &RouteConfig) -> Self {
        Self {
            name: config.name.trim().to_string(),
            matcher: AndMatcher::from_when(&config.when),
            groups: config.groups.iter().map(|g| g.trim().to_string()).collect(),
        }
    }
}

/// Compile routes, preserving declaration order.
pub fn compile_routes(config: &Config) -> Vec<Route> {
    config.messaging.routes.iter().map(Route::compile).collect()
}

/// Groups of the first matching route, if any.
pub fn first_match<'a>(routes: &'a [Route], msg: &WebhookMessage) -> Option<&'a Route> {
    routes.iter().find(|route| route.matcher.matches(msg))
}

/// Groups to notify for `msg`: the first matching route's, else `default`.
pub fn resolve_groups(routes: &[Route], msg: &WebhookMessage) -> Vec<String> {
    match first_match(routes, msg) {
        Some(route) => {
            tracing::debug!(route = %route.name, groups = ?route.groups, "Route matched");
            route.groups.clone()
        }
        None => vec![DEFAULT_GROUP.to_string()],
    }
}

//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming payload (receiver, status, labels)
//!     → router.rs (route lookup, first match wins)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: matched group names, or `default`
//!
//! Per group:
//!     mention.rs (base policy + matching overrides, folded in order)
//!
//! Route Compilation (at snapshot build):
//!     RouteConfig[]
//!     → Compile matchers (AND of per-dimension allow-lists)
//!     → Freeze in declaration order
//! ```
//!
//! # Design Decisions
//! - Routes compiled once per snapshot, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod mention;
pub mod router;

pub use matcher::{AndMatcher, Matcher};
pub use mention::{effective_mention, Mention, MentionRule};
pub use router::{compile_routes, first_match, resolve_groups, Route, DEFAULT_GROUP};

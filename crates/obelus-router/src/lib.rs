//! # Obelus Router
//!
//! File-system route compiler and matcher.
//!
//! - **Pattern compiler**: `/blog/[slug]` → `^/blog/([^/]+?)/?$` plus ordered
//!   param names and type tags (`[id=uuid]`)
//! - **Route tree builder**: pages, endpoints, nested and named layouts, route
//!   groups, menus, global plugins, rewrite rules and collision checks
//! - **Matcher**: first-match lookup over a precedence-ordered table, with
//!   typed params validated by host-supplied predicates
//! - **Manifest**: the serialized table the server loads at startup
//!
//! The builder and the runtime share [`compile_pattern`], so a route that
//! validated at build time matches the same pathnames at request time.
//!
//! ## Example
//!
//! ```
//! use obelus_router::{compile_pattern, match_route, ParamMatchers, Routable, RoutePattern};
//!
//! struct Route(RoutePattern);
//!
//! impl Routable for Route {
//!     fn pattern(&self) -> &RoutePattern {
//!         &self.0
//!     }
//! }
//!
//! let routes = vec![
//!     Route(compile_pattern("/blog/[slug]/").unwrap()),
//!     Route(compile_pattern("/[...rest]").unwrap()),
//! ];
//! let found = match_route(&routes, "/blog/hello-world/", &ParamMatchers::new()).unwrap();
//! assert_eq!(found.params["slug"], "hello-world");
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

pub mod error;
pub mod manifest;
pub mod matcher;
pub mod path;
pub mod pattern;
pub mod route;
pub mod tree;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{BuildError, Collision, PatternError};
pub use manifest::{ManifestMenu, ManifestRoute, RouteManifest};
pub use matcher::{match_route, ParamMatchers, Routable, RouteMatch};
pub use path::{data_path, is_file_like, normalize_path, strip_data_suffix, PathHierarchy, DATA_SUFFIX};
pub use pattern::{classify_segment, compile_pattern, RoutePattern, SegmentKind};
pub use route::{BuildLayout, BuildMenu, BuildPlugin, BuildRoute, RouteKind};
pub use tree::{
    compare_pathnames, BuildOptions, Diagnostic, DiagnosticKind, RewriteRule, RouteTree,
};

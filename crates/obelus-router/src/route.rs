//! Build-time route records produced by [`RouteTree::build`](crate::RouteTree::build).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::pattern::RoutePattern;

/// Whether a route renders a page or only answers as an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    Page,
    Endpoint,
}

/// One page or endpoint.
#[derive(Debug, Clone)]
pub struct BuildRoute {
    /// Unique id: the file path relative to the route root, `/` separated.
    /// Routes produced by a rewrite rule carry a suffix.
    pub id: String,
    pub file_path: PathBuf,
    /// Module id of the route file (relative path), shared by rewritten copies.
    pub module_id: String,
    /// URL pathname with bracketed params, e.g. `/blog/[slug]/`.
    pub pathname: String,
    /// `pathname` without the leading slash.
    pub route_name: String,
    pub pattern: RoutePattern,
    /// Outermost first.
    pub layouts: Vec<BuildLayout>,
    pub kind: RouteKind,
    /// Set on routes produced by a rewrite rule: the untranslated pathname.
    pub original_pathname: Option<String>,
}

impl BuildRoute {
    /// Module ids in execution order: layouts outer to inner, then the route.
    pub fn module_ids(&self) -> Vec<String> {
        self.layouts
            .iter()
            .map(|layout| layout.id.clone())
            .chain(std::iter::once(self.module_id.clone()))
            .collect()
    }
}

/// A layout file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    /// File path relative to the route root, `/` separated.
    pub id: String,
    pub file_path: PathBuf,
    /// Directory relative to the route root, `""` for the root itself.
    pub dir: String,
    /// `""` for the default layout of a directory.
    pub name: String,
    /// Stops the upward layout walk: ancestors above it are not applied.
    pub is_top_level_break: bool,
}

/// A `menu.md` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildMenu {
    pub id: String,
    pub file_path: PathBuf,
    pub pathname: String,
}

/// A global request plugin found at the route root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlugin {
    pub id: String,
    pub file_path: PathBuf,
}

//! Path rewriting: localized or prefixed copies of every route.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::BuildError;
use crate::path::{join_pathname, route_name, segments};
use crate::pattern::compile_pattern;
use crate::route::BuildRoute;

/// A rewrite rule: an optional leading segment plus a segment translation
/// table. `{ prefix = "de", paths = { about = "ueber-uns" } }` turns
/// `/about/` into `/de/ueber-uns/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRule {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub paths: BTreeMap<String, String>,
}

impl RewriteRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_path(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.paths.insert(from.into(), to.into());
        self
    }

    fn validate(&self, index: usize) -> Result<(), BuildError> {
        let invalid = |reason: String| BuildError::InvalidRewrite { index, reason };

        if let Some(prefix) = &self.prefix {
            if !is_literal_segment(prefix) {
                return Err(invalid(format!(
                    "prefix `{prefix}` must be a single literal path segment"
                )));
            }
        }
        for (from, to) in &self.paths {
            if !is_literal_segment(from) {
                return Err(invalid(format!(
                    "path key `{from}` must be a single literal path segment"
                )));
            }
            if !is_literal_segment(to) {
                return Err(invalid(format!(
                    "translation `{to}` for `{from}` must be a single literal path segment"
                )));
            }
        }
        Ok(())
    }

    fn translate(&self, pathname: &str, trailing_slash: bool) -> String {
        let translated: Vec<&str> = self
            .prefix
            .as_deref()
            .into_iter()
            .chain(segments(pathname).map(|segment| {
                self.paths
                    .get(segment)
                    .map(String::as_str)
                    .unwrap_or(segment)
            }))
            .collect();
        // Keep the trailing-slash style of the source pathname.
        let keep_slash = trailing_slash && (pathname.ends_with('/') || pathname == "/");
        join_pathname(&translated, keep_slash)
    }

    fn id_suffix(&self, index: usize) -> String {
        match &self.prefix {
            Some(prefix) => prefix.to_uppercase().replace('-', ""),
            None => index.to_string(),
        }
    }
}

fn is_literal_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment
            .chars()
            .any(|ch| matches!(ch, '/' | '\\' | '[' | ']') || ch.is_whitespace())
}

/// Appends a translated copy of every route for each rule, in rule order.
///
/// Patterns of the copies are recompiled from the translated pathname. A copy
/// whose pathname and route name already exist is skipped.
pub(crate) fn apply_rewrites(
    routes: Vec<BuildRoute>,
    rules: &[RewriteRule],
    trailing_slash: bool,
) -> Result<Vec<BuildRoute>, BuildError> {
    for (index, rule) in rules.iter().enumerate() {
        rule.validate(index)?;
    }
    if rules.is_empty() {
        return Ok(routes);
    }

    let mut seen: HashSet<(String, String)> = routes
        .iter()
        .map(|route| (route.pathname.clone(), route.route_name.clone()))
        .collect();
    let mut translated = Vec::new();

    for (index, rule) in rules.iter().enumerate() {
        for route in &routes {
            let pathname = rule.translate(&route.pathname, trailing_slash);
            let name = route_name(&pathname).to_string();
            if !seen.insert((pathname.clone(), name.clone())) {
                continue;
            }

            let pattern = compile_pattern(&pathname).map_err(|source| BuildError::Pattern {
                file: route.file_path.clone(),
                source,
            })?;

            translated.push(BuildRoute {
                id: format!("{}#{}", route.id, rule.id_suffix(index)),
                pathname,
                route_name: name,
                pattern,
                original_pathname: Some(route.pathname.clone()),
                ..route.clone()
            });
        }
    }

    let mut routes = routes;
    routes.extend(translated);
    Ok(routes)
}

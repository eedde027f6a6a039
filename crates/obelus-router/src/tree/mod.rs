//! Route tree builder.
//!
//! Walks a route root on disk and produces the ordered route table, the
//! layouts, menus and global plugins it found, plus any non-fatal warnings.
//! The result is rebuilt wholesale on every build; nothing is patched in
//! place.

mod entry;
mod layout;
mod order;
mod rewrite;
mod validate;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::BuildError;
use crate::manifest::RouteManifest;
use crate::matcher::{match_route, ParamMatchers, RouteMatch};
use crate::path::{join_pathname, route_name};
use crate::pattern::compile_pattern;
use crate::route::{BuildLayout, BuildMenu, BuildPlugin, BuildRoute, RouteKind};

use entry::{classify_dir, classify_file, DirEntry, Entry, Extensions};
pub use order::compare_pathnames;
pub use rewrite::RewriteRule;

/// Options for [`RouteTree::build`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub routes_dir: PathBuf,
    /// Whether page pathnames end with `/`.
    pub trailing_slash: bool,
    pub page_extensions: Vec<String>,
    pub endpoint_extensions: Vec<String>,
    pub rewrite_routes: Vec<RewriteRule>,
}

impl BuildOptions {
    pub fn new(routes_dir: impl Into<PathBuf>) -> Self {
        Self {
            routes_dir: routes_dir.into(),
            trailing_slash: true,
            page_extensions: vec![".rsx".into(), ".md".into(), ".mdx".into()],
            endpoint_extensions: vec![".rs".into()],
            rewrite_routes: Vec::new(),
        }
    }

    pub fn with_trailing_slash(mut self, trailing_slash: bool) -> Self {
        self.trailing_slash = trailing_slash;
        self
    }

    pub fn with_rewrite(mut self, rule: RewriteRule) -> Self {
        self.rewrite_routes.push(rule);
        self
    }

    pub fn with_page_extensions(mut self, extensions: Vec<String>) -> Self {
        self.page_extensions = extensions;
        self
    }

    pub fn with_endpoint_extensions(mut self, extensions: Vec<String>) -> Self {
        self.endpoint_extensions = extensions;
        self
    }
}

/// Category of a non-fatal build warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// `_layout.*` spelling.
    DeprecatedLayout,
    /// A subdirectory or entry that could not be read.
    UnreadableEntry,
    /// `index@name` with no `layout-name` above it.
    MissingLayout,
}

/// A non-fatal build warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub file: Option<PathBuf>,
}

/// The built route tree.
#[derive(Debug, Clone, Default)]
pub struct RouteTree {
    /// Ordered by precedence; the matcher takes the first accepting route.
    pub routes: Vec<BuildRoute>,
    pub layouts: Vec<BuildLayout>,
    pub menus: Vec<BuildMenu>,
    /// Sorted by file name.
    pub plugins: Vec<BuildPlugin>,
    pub diagnostics: Vec<Diagnostic>,
}

struct PendingRoute {
    id: String,
    file_path: PathBuf,
    kind: RouteKind,
    dir: String,
    segments: Vec<String>,
    layout_name: Option<String>,
}

struct Walker<'a> {
    extensions: Extensions<'a>,
    trailing_slash: bool,
    routes: Vec<PendingRoute>,
    layouts: Vec<BuildLayout>,
    menus: Vec<BuildMenu>,
    plugins: Vec<BuildPlugin>,
    diagnostics: Vec<Diagnostic>,
}

impl RouteTree {
    /// Builds the route tree under `options.routes_dir`.
    ///
    /// Fails when the root cannot be read, a rewrite rule is malformed, a
    /// pathname does not compile, or two routes share a pathname. Unreadable
    /// subdirectories are skipped with a warning.
    pub fn build(options: &BuildOptions) -> Result<Self, BuildError> {
        let mut walker = Walker {
            extensions: Extensions {
                page: &options.page_extensions,
                endpoint: &options.endpoint_extensions,
            },
            trailing_slash: options.trailing_slash,
            routes: Vec::new(),
            layouts: Vec::new(),
            menus: Vec::new(),
            plugins: Vec::new(),
            diagnostics: Vec::new(),
        };

        let root = fs::read_dir(&options.routes_dir).map_err(|source| BuildError::UnreadableRoot {
            path: options.routes_dir.clone(),
            source,
        })?;
        walker.walk_entries(root, &options.routes_dir, "", &[]);

        let Walker {
            routes: pending,
            layouts,
            menus,
            mut plugins,
            mut diagnostics,
            ..
        } = walker;

        let mut routes = Vec::with_capacity(pending.len());
        for route in pending {
            routes.push(finish_route(route, &layouts, options.trailing_slash, &mut diagnostics)?);
        }
        order::sort_routes(&mut routes);

        let mut routes =
            rewrite::apply_rewrites(routes, &options.rewrite_routes, options.trailing_slash)?;
        order::sort_routes(&mut routes);

        validate::check_collisions(&routes)?;

        plugins.sort_by(|a, b| a.id.cmp(&b.id));

        debug!(
            routes = routes.len(),
            layouts = layouts.len(),
            warnings = diagnostics.len(),
            "Built route tree from {}",
            options.routes_dir.display()
        );

        Ok(Self {
            routes,
            layouts,
            menus,
            plugins,
            diagnostics,
        })
    }

    /// Matches a pathname against the built routes.
    pub fn match_route<'a>(
        &'a self,
        pathname: &str,
        matchers: &ParamMatchers,
    ) -> Option<RouteMatch<'a, BuildRoute>> {
        match_route(&self.routes, pathname, matchers)
    }

    /// Serializable form of the tree, consumed at request time.
    pub fn manifest(&self) -> RouteManifest {
        RouteManifest::from_tree(self)
    }

    pub fn has_warnings(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

fn finish_route(
    route: PendingRoute,
    layouts: &[BuildLayout],
    trailing_slash: bool,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<BuildRoute, BuildError> {
    let pathname = join_pathname(&route.segments, trailing_slash);
    let pattern = compile_pattern(&pathname).map_err(|source| BuildError::Pattern {
        file: route.file_path.clone(),
        source,
    })?;

    let mut chain = layout::resolve_layouts(&route.dir, route.layout_name.as_deref(), layouts);
    if let Some(missing) = chain.missing.take() {
        let message = format!("layout `layout-{missing}` not found for {}", route.id);
        warn!("{}", message);
        diagnostics.push(Diagnostic {
            kind: DiagnosticKind::MissingLayout,
            message,
            file: Some(route.file_path.clone()),
        });
        chain = layout::resolve_layouts(&route.dir, None, layouts);
    }

    Ok(BuildRoute {
        module_id: route.id.clone(),
        id: route.id,
        file_path: route.file_path,
        route_name: route_name(&pathname).to_string(),
        pathname,
        pattern,
        layouts: chain.layouts,
        kind: route.kind,
        original_pathname: None,
    })
}

impl Walker<'_> {
    fn warn(&mut self, kind: DiagnosticKind, message: String, file: &Path) {
        warn!("{}", message);
        self.diagnostics.push(Diagnostic {
            kind,
            message,
            file: Some(file.to_path_buf()),
        });
    }

    fn walk_dir(&mut self, dir: &Path, rel_dir: &str, segments: &[String]) {
        match fs::read_dir(dir) {
            Ok(entries) => self.walk_entries(entries, dir, rel_dir, segments),
            Err(err) => self.warn(
                DiagnosticKind::UnreadableEntry,
                format!("skipping unreadable directory {}: {}", dir.display(), err),
                dir,
            ),
        }
    }

    fn walk_entries(&mut self, entries: fs::ReadDir, dir: &Path, rel_dir: &str, segments: &[String]) {
        let mut children = Vec::new();
        for entry in entries {
            match entry.and_then(|e| Ok((e.file_name(), e.path(), e.file_type()?))) {
                Ok((name, path, file_type)) => children.push((name, path, file_type)),
                Err(err) => self.warn(
                    DiagnosticKind::UnreadableEntry,
                    format!("skipping unreadable entry in {}: {}", dir.display(), err),
                    dir,
                ),
            }
        }
        children.sort_by(|a, b| a.0.cmp(&b.0));

        for (name, path, file_type) in children {
            let Some(name) = name.to_str() else {
                self.warn(
                    DiagnosticKind::UnreadableEntry,
                    format!("skipping non UTF-8 file name {}", path.display()),
                    &path,
                );
                continue;
            };
            let rel = if rel_dir.is_empty() {
                name.to_string()
            } else {
                format!("{rel_dir}/{name}")
            };

            if file_type.is_dir() {
                match classify_dir(name) {
                    DirEntry::Segment(segment) => {
                        let mut nested = segments.to_vec();
                        nested.push(segment.to_string());
                        self.walk_dir(&path, &rel, &nested);
                    }
                    DirEntry::Group => self.walk_dir(&path, &rel, segments),
                    DirEntry::Skip => {}
                }
                continue;
            }

            match classify_file(name, &self.extensions, rel_dir.is_empty()) {
                Entry::Route {
                    kind,
                    segment,
                    layout_name,
                } => {
                    let mut route_segments = segments.to_vec();
                    route_segments.extend(segment);
                    self.routes.push(PendingRoute {
                        id: rel,
                        file_path: path,
                        kind,
                        dir: rel_dir.to_string(),
                        segments: route_segments,
                        layout_name,
                    });
                }
                Entry::Layout {
                    name,
                    top_level_break,
                    deprecated,
                } => {
                    if deprecated {
                        self.warn(
                            DiagnosticKind::DeprecatedLayout,
                            format!("{rel}: `_layout` is deprecated, rename it to `layout`"),
                            &path,
                        );
                    }
                    self.layouts.push(BuildLayout {
                        id: rel,
                        file_path: path,
                        dir: rel_dir.to_string(),
                        name,
                        is_top_level_break: top_level_break,
                    });
                }
                Entry::Menu => self.menus.push(BuildMenu {
                    id: rel,
                    file_path: path,
                    pathname: join_pathname(segments, self.trailing_slash),
                }),
                Entry::Plugin => self.plugins.push(BuildPlugin {
                    id: rel,
                    file_path: path,
                }),
                Entry::Ignored => {}
            }
        }
    }
}

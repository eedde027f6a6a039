//! File and directory naming conventions of a route root.

use crate::route::RouteKind;

/// What a file in the route tree stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Entry {
    Layout {
        name: String,
        top_level_break: bool,
        deprecated: bool,
    },
    Route {
        kind: RouteKind,
        /// `None` for `index` files.
        segment: Option<String>,
        layout_name: Option<String>,
    },
    Menu,
    Plugin,
    Ignored,
}

/// Extensions recognized by the builder, each with its leading dot.
#[derive(Debug, Clone)]
pub(crate) struct Extensions<'a> {
    pub page: &'a [String],
    pub endpoint: &'a [String],
}

impl Extensions<'_> {
    fn kind_of(&self, ext: &str) -> Option<RouteKind> {
        if self.page.iter().any(|e| e == ext) {
            Some(RouteKind::Page)
        } else if self.endpoint.iter().any(|e| e == ext) {
            Some(RouteKind::Endpoint)
        } else {
            None
        }
    }
}

/// Classifies a file by name. `at_root` is true for files directly inside
/// the route root, the only place plugins are recognized.
pub(crate) fn classify_file(file_name: &str, extensions: &Extensions<'_>, at_root: bool) -> Entry {
    if file_name.starts_with('.') {
        return Entry::Ignored;
    }
    if file_name == "menu.md" {
        return Entry::Menu;
    }

    let Some((stem, ext)) = file_name.rfind('.').map(|dot| file_name.split_at(dot)) else {
        return Entry::Ignored;
    };
    let Some(kind) = extensions.kind_of(ext) else {
        return Entry::Ignored;
    };

    if at_root && kind == RouteKind::Endpoint && (stem == "plugin" || stem.starts_with("plugin@")) {
        return Entry::Plugin;
    }

    if stem == "_layout" {
        return Entry::Layout {
            name: String::new(),
            top_level_break: false,
            deprecated: true,
        };
    }
    if stem.starts_with('_') {
        return Entry::Ignored;
    }

    if let Some(layout) = parse_layout_stem(stem) {
        return layout;
    }

    let (segment, layout_name) = match stem.split_once('@') {
        Some((segment, name)) if !name.is_empty() => (segment, Some(name.to_string())),
        Some((segment, _)) => (segment, None),
        None => (stem, None),
    };

    // `page@name` is an alias of `index@name`.
    let is_index = segment == "index" || (segment == "page" && layout_name.is_some());
    Entry::Route {
        kind,
        segment: (!is_index).then(|| segment.to_string()),
        layout_name,
    }
}

fn parse_layout_stem(stem: &str) -> Option<Entry> {
    let (stem, top_level_break) = match stem.strip_suffix('!') {
        Some(stripped) => (stripped, true),
        None => (stem, false),
    };

    let name = if stem == "layout" {
        String::new()
    } else {
        stem.strip_prefix("layout-")
            .filter(|name| !name.is_empty())?
            .to_string()
    };

    Some(Entry::Layout {
        name,
        top_level_break,
        deprecated: false,
    })
}

/// How a directory participates in the route tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DirEntry<'a> {
    /// Contributes a pathname segment.
    Segment(&'a str),
    /// `(name)`: scopes layouts without adding a segment.
    Group,
    Skip,
}

pub(crate) fn classify_dir(dir_name: &str) -> DirEntry<'_> {
    if dir_name.starts_with('_')
        || dir_name.starts_with('.')
        || dir_name == "node_modules"
        || dir_name == "target"
    {
        return DirEntry::Skip;
    }
    if dir_name.starts_with('(') && dir_name.ends_with(')') {
        return DirEntry::Group;
    }
    DirEntry::Segment(dir_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn exts() -> (Vec<String>, Vec<String>) {
        (
            vec![".rsx".to_string(), ".md".to_string(), ".mdx".to_string()],
            vec![".rs".to_string()],
        )
    }

    fn classify(name: &str, at_root: bool) -> Entry {
        let (page, endpoint) = exts();
        let extensions = Extensions {
            page: &page,
            endpoint: &endpoint,
        };
        classify_file(name, &extensions, at_root)
    }

    #[test]
    fn test_index_page() {
        assert_eq!(
            classify("index.rsx", false),
            Entry::Route {
                kind: RouteKind::Page,
                segment: None,
                layout_name: None
            }
        );
    }

    #[test]
    fn test_named_file_endpoint() {
        assert_eq!(
            classify("sitemap.xml.rs", false),
            Entry::Route {
                kind: RouteKind::Endpoint,
                segment: Some("sitemap.xml".to_string()),
                layout_name: None
            }
        );
    }

    #[test]
    fn test_index_with_named_layout() {
        assert_eq!(
            classify("index@dashboard.rsx", false),
            Entry::Route {
                kind: RouteKind::Page,
                segment: None,
                layout_name: Some("dashboard".to_string())
            }
        );
    }

    #[test]
    fn test_page_alias_with_named_layout() {
        assert_eq!(
            classify("page@wide.rsx", false),
            Entry::Route {
                kind: RouteKind::Page,
                segment: None,
                layout_name: Some("wide".to_string())
            }
        );
        assert!(matches!(
            classify("page.rsx", false),
            Entry::Route { segment: Some(_), .. }
        ));
    }

    #[rstest]
    #[case("layout.rsx", "", false)]
    #[case("layout!.rsx", "", true)]
    #[case("layout-narrow.rsx", "narrow", false)]
    #[case("layout-narrow!.rs", "narrow", true)]
    fn test_layouts(#[case] file: &str, #[case] name: &str, #[case] top: bool) {
        assert_eq!(
            classify(file, false),
            Entry::Layout {
                name: name.to_string(),
                top_level_break: top,
                deprecated: false
            }
        );
    }

    #[test]
    fn test_deprecated_layout() {
        assert!(matches!(
            classify("_layout.rsx", false),
            Entry::Layout {
                deprecated: true,
                ..
            }
        ));
    }

    #[test]
    fn test_plugins_only_at_root() {
        assert_eq!(classify("plugin.rs", true), Entry::Plugin);
        assert_eq!(classify("plugin@auth.rs", true), Entry::Plugin);
        assert!(matches!(classify("plugin.rs", false), Entry::Route { .. }));
    }

    #[rstest]
    #[case("menu.md", Entry::Menu)]
    #[case("_draft.rsx", Entry::Ignored)]
    #[case(".DS_Store", Entry::Ignored)]
    #[case("styles.css", Entry::Ignored)]
    #[case("README", Entry::Ignored)]
    fn test_other_files(#[case] file: &str, #[case] expected: Entry) {
        assert_eq!(classify(file, false), expected);
    }

    #[rstest]
    #[case("blog", DirEntry::Segment("blog"))]
    #[case("(auth)", DirEntry::Group)]
    #[case("_components", DirEntry::Skip)]
    #[case("node_modules", DirEntry::Skip)]
    fn test_classify_dir(#[case] dir: &str, #[case] expected: DirEntry<'static>) {
        assert_eq!(classify_dir(dir), expected);
    }
}

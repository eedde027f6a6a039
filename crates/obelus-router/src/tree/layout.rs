//! Layout chain resolution.

use crate::route::BuildLayout;

/// Resolved layout chain of a route, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LayoutChain {
    pub layouts: Vec<BuildLayout>,
    /// Set when the route asked for a named layout no ancestor provides.
    pub missing: Option<String>,
}

/// Walks from `route_dir` up to the route root taking at most one layout per
/// directory.
///
/// Without a layout name every directory contributes its default layout.
/// With a name, directories are searched for `layout-<name>` first; once it
/// is found the walk continues with default layouts. A top-level break
/// layout ends the walk.
pub(crate) fn resolve_layouts(
    route_dir: &str,
    layout_name: Option<&str>,
    layouts: &[BuildLayout],
) -> LayoutChain {
    let mut pending = layout_name.filter(|name| !name.is_empty());
    let mut chain = Vec::new();

    for dir in ancestor_dirs(route_dir) {
        let wanted = pending.unwrap_or("");
        let Some(layout) = layouts
            .iter()
            .find(|layout| layout.dir == dir && layout.name == wanted)
        else {
            continue;
        };

        pending = None;
        chain.push(layout.clone());
        if layout.is_top_level_break {
            break;
        }
    }

    chain.reverse();
    LayoutChain {
        layouts: chain,
        missing: pending.map(str::to_string),
    }
}

/// `a/b` → `a/b`, `a`, `""`.
fn ancestor_dirs(dir: &str) -> impl Iterator<Item = &str> {
    let mut current = Some(dir);
    std::iter::from_fn(move || {
        let dir = current?;
        current = match dir.rfind('/') {
            Some(slash) => Some(&dir[..slash]),
            None if dir.is_empty() => None,
            None => Some(""),
        };
        Some(dir)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn layout(dir: &str, name: &str, top: bool) -> BuildLayout {
        let file = match (name, top) {
            ("", false) => "layout.rsx".to_string(),
            ("", true) => "layout!.rsx".to_string(),
            (name, false) => format!("layout-{name}.rsx"),
            (name, true) => format!("layout-{name}!.rsx"),
        };
        let id = if dir.is_empty() {
            file
        } else {
            format!("{dir}/{file}")
        };
        BuildLayout {
            file_path: PathBuf::from(&id),
            id,
            dir: dir.to_string(),
            name: name.to_string(),
            is_top_level_break: top,
        }
    }

    fn ids(chain: &LayoutChain) -> Vec<&str> {
        chain.layouts.iter().map(|l| l.id.as_str()).collect()
    }

    #[test]
    fn test_ancestor_dirs() {
        assert_eq!(ancestor_dirs("a/b").collect::<Vec<_>>(), vec!["a/b", "a", ""]);
        assert_eq!(ancestor_dirs("").collect::<Vec<_>>(), vec![""]);
    }

    #[test]
    fn test_outermost_first() {
        let layouts = vec![layout("", "", false), layout("docs", "", false)];
        let chain = resolve_layouts("docs/intro", None, &layouts);
        assert_eq!(ids(&chain), vec!["layout.rsx", "docs/layout.rsx"]);
        assert_eq!(chain.missing, None);
    }

    #[test]
    fn test_top_level_break_stops_walk() {
        let layouts = vec![layout("", "", false), layout("admin", "", true)];
        let chain = resolve_layouts("admin/users", None, &layouts);
        assert_eq!(ids(&chain), vec!["admin/layout!.rsx"]);
    }

    #[test]
    fn test_named_layout_then_defaults() {
        let layouts = vec![
            layout("", "", false),
            layout("", "wide", false),
            layout("docs", "", false),
        ];
        let chain = resolve_layouts("docs", Some("wide"), &layouts);
        assert_eq!(ids(&chain), vec!["layout-wide.rsx"]);

        let layouts = vec![
            layout("", "", false),
            layout("docs", "wide", false),
            layout("docs/api", "", false),
        ];
        let chain = resolve_layouts("docs/api", Some("wide"), &layouts);
        assert_eq!(ids(&chain), vec!["layout.rsx", "docs/layout-wide.rsx"]);
    }

    #[test]
    fn test_missing_named_layout_is_reported() {
        let layouts = vec![layout("", "", false)];
        let chain = resolve_layouts("docs", Some("wide"), &layouts);
        assert!(chain.layouts.is_empty());
        assert_eq!(chain.missing.as_deref(), Some("wide"));
    }
}

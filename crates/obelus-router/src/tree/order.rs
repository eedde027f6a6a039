//! Route precedence.
//!
//! The matcher takes the first route whose pattern accepts a pathname, so the
//! builder sorts routes from most to least specific.

use std::cmp::Ordering;

use crate::path::segments;
use crate::pattern::{classify_segment, SegmentKind};
use crate::route::BuildRoute;

/// Compares two pathnames by precedence.
///
/// Segments are compared left to right by [`SegmentKind`]. When one pathname
/// is a prefix of the other, the shorter sorts first unless it ends in a rest
/// segment, which would shadow the longer one. Remaining ties fall back to
/// the pathname text.
pub fn compare_pathnames(a: &str, b: &str) -> Ordering {
    let a_kinds: Vec<SegmentKind> = segments(a).map(classify_segment).collect();
    let b_kinds: Vec<SegmentKind> = segments(b).map(classify_segment).collect();

    for (x, y) in a_kinds.iter().zip(&b_kinds) {
        match x.cmp(y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    let by_length = match a_kinds.len().cmp(&b_kinds.len()) {
        Ordering::Equal => Ordering::Equal,
        Ordering::Less if a_kinds.last() == Some(&SegmentKind::Rest) => Ordering::Greater,
        Ordering::Less => Ordering::Less,
        Ordering::Greater if b_kinds.last() == Some(&SegmentKind::Rest) => Ordering::Less,
        Ordering::Greater => Ordering::Greater,
    };

    by_length.then_with(|| a.cmp(b))
}

/// Stable sort of routes by precedence.
pub(crate) fn sort_routes(routes: &mut [BuildRoute]) {
    routes.sort_by(|a, b| compare_pathnames(&a.pathname, &b.pathname).then_with(|| a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sorted(mut pathnames: Vec<&str>) -> Vec<&str> {
        pathnames.sort_by(|a, b| compare_pathnames(a, b));
        pathnames
    }

    #[test]
    fn test_static_before_dynamic_before_rest() {
        assert_eq!(
            sorted(vec!["/[...all]/", "/[id]/", "/post-[id]/", "/about/"]),
            vec!["/about/", "/post-[id]/", "/[id]/", "/[...all]/"]
        );
    }

    #[test]
    fn test_rest_prefix_sorts_after_longer_route() {
        assert_eq!(
            sorted(vec!["/docs/[...path]/", "/docs/[...path]/edit/"]),
            vec!["/docs/[...path]/edit/", "/docs/[...path]/"]
        );
    }

    #[test]
    fn test_shorter_static_prefix_first() {
        assert_eq!(
            sorted(vec!["/blog/[slug]/", "/blog/", "/"]),
            vec!["/", "/blog/", "/blog/[slug]/"]
        );
    }

    #[test]
    fn test_ties_are_lexical() {
        assert_eq!(sorted(vec!["/b/", "/a/"]), vec!["/a/", "/b/"]);
    }
}

//! Pathname utilities shared by the builder, the matcher and the runtime.
//!
//! All functions are pure.

use std::borrow::Cow;

pub mod hierarchy;
pub use hierarchy::PathHierarchy;

use crate::pattern::has_extension;

/// Final segment marking a request for the internal data protocol.
pub const DATA_SUFFIX: &str = "__data";

/// Collapses doubled slashes and backslashes and guarantees a leading `/`.
/// A trailing slash is preserved.
///
/// Returns `Cow::Borrowed` when nothing needs fixing.
///
/// # Examples
///
/// ```
/// use obelus_router::path::normalize_path;
/// use std::borrow::Cow;
///
/// assert!(matches!(normalize_path("/about/"), Cow::Borrowed("/about/")));
/// assert_eq!(normalize_path("/path//to///page"), "/path/to/page");
/// assert_eq!(normalize_path("\\docs\\intro\\"), "/docs/intro/");
/// assert_eq!(normalize_path(""), "/");
/// ```
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    if path.starts_with('/') && !path.contains("//") && !path.contains('\\') {
        return Cow::Borrowed(path);
    }

    let replaced = path.replace('\\', "/");
    let trailing = replaced.ends_with('/');
    let joined = replaced
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    if joined.is_empty() {
        Cow::Borrowed("/")
    } else if trailing {
        Cow::Owned(format!("/{joined}/"))
    } else {
        Cow::Owned(format!("/{joined}"))
    }
}

/// Builds a pathname from segments and applies the trailing-slash policy.
///
/// The root is always `/`. A last segment that looks like a file name
/// (`sitemap.xml`, `[id].json`) never gets a trailing slash.
///
/// ```
/// use obelus_router::path::join_pathname;
///
/// assert_eq!(join_pathname(&["blog", "[slug]"], true), "/blog/[slug]/");
/// assert_eq!(join_pathname(&["blog", "[slug]"], false), "/blog/[slug]");
/// assert_eq!(join_pathname(&["feed.xml"], true), "/feed.xml");
/// assert_eq!(join_pathname::<&str>(&[], true), "/");
/// ```
pub fn join_pathname<S: AsRef<str>>(segments: &[S], trailing_slash: bool) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }

    let mut pathname = String::new();
    for segment in segments {
        pathname.push('/');
        pathname.push_str(segment.as_ref());
    }

    let file_like = segments
        .last()
        .map(|segment| has_extension(segment.as_ref()))
        .unwrap_or(false);
    if trailing_slash && !file_like {
        pathname.push('/');
    }
    pathname
}

/// Whether the final segment of a pathname names a file (`/feed.xml`).
/// Such pathnames never take a trailing slash.
///
/// ```
/// use obelus_router::path::is_file_like;
///
/// assert!(is_file_like("/feed.xml"));
/// assert!(!is_file_like("/blog/"));
/// assert!(!is_file_like("/"));
/// ```
pub fn is_file_like(pathname: &str) -> bool {
    segments(pathname).last().map(has_extension).unwrap_or(false)
}

/// Splits a pathname into its non-empty segments.
pub fn segments(pathname: &str) -> impl Iterator<Item = &str> {
    pathname.split('/').filter(|segment| !segment.is_empty())
}

/// The route name for a pathname: the pathname without its leading slash.
pub fn route_name(pathname: &str) -> &str {
    pathname.strip_prefix('/').unwrap_or(pathname)
}

/// Strips the data-protocol suffix from a request pathname.
///
/// Returns the pathname to match and whether the suffix was present.
///
/// ```
/// use obelus_router::path::strip_data_suffix;
///
/// assert_eq!(strip_data_suffix("/blog/__data", true), ("/blog/".to_string(), true));
/// assert_eq!(strip_data_suffix("/blog/__data", false), ("/blog".to_string(), true));
/// assert_eq!(strip_data_suffix("/__data", true), ("/".to_string(), true));
/// assert_eq!(strip_data_suffix("/blog/", true), ("/blog/".to_string(), false));
/// ```
pub fn strip_data_suffix(pathname: &str, trailing_slash: bool) -> (String, bool) {
    let Some(base) = pathname
        .strip_suffix(DATA_SUFFIX)
        .and_then(|rest| rest.strip_suffix('/'))
    else {
        return (pathname.to_string(), false);
    };

    if base.is_empty() {
        return ("/".to_string(), true);
    }
    if trailing_slash {
        (format!("{base}/"), true)
    } else {
        (base.to_string(), true)
    }
}

/// Data-protocol URL path for a page pathname.
///
/// ```
/// use obelus_router::path::data_path;
///
/// assert_eq!(data_path("/blog/"), "/blog/__data");
/// assert_eq!(data_path("/blog"), "/blog/__data");
/// assert_eq!(data_path("/"), "/__data");
/// ```
pub fn data_path(pathname: &str) -> String {
    let base = pathname.trim_end_matches('/');
    format!("{base}/{DATA_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_keeps_valid_paths_borrowed() {
        assert!(matches!(normalize_path("/"), Cow::Borrowed("/")));
        assert!(matches!(normalize_path("/a/b"), Cow::Borrowed("/a/b")));
    }

    #[test]
    fn test_normalize_adds_leading_slash() {
        assert_eq!(normalize_path("about"), "/about");
        assert_eq!(normalize_path("//"), "/");
    }

    #[test]
    fn test_route_name_strips_leading_slash() {
        assert_eq!(route_name("/"), "");
        assert_eq!(route_name("/blog/[slug]/"), "blog/[slug]/");
    }

    #[test]
    fn test_strip_data_suffix_requires_full_segment() {
        assert_eq!(
            strip_data_suffix("/my__data", true),
            ("/my__data".to_string(), false)
        );
    }

    #[test]
    fn test_segments_skip_empty() {
        assert_eq!(segments("/a//b/").collect::<Vec<_>>(), vec!["a", "b"]);
    }
}

//! Matching behavior over built route tables.

use obelus_router::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

fn route_dir(files: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for file in files {
        let path = dir.path().join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }
    dir
}

fn uuid_matcher() -> ParamMatchers {
    ParamMatchers::new().with_matcher("uuid", |value| {
        let parts: Vec<&str> = value.split('-').collect();
        parts.len() == 5
            && parts
                .iter()
                .zip([8, 4, 4, 4, 12])
                .all(|(part, len)| part.len() == len && part.chars().all(|c| c.is_ascii_hexdigit()))
    })
}

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_every_route_matches_its_own_pathname() {
    let dir = route_dir(&[
        "index.rsx",
        "about/index.rsx",
        "blog/index.rsx",
        "blog/[slug]/index.rsx",
        "blog/[slug]/comments.rsx",
        "shop/[category]/[item]/index.rsx",
        "docs/[...path]/index.rsx",
        "docs/[...path]/edit.rsx",
        "files/[name].json.rs",
        "feed.xml.rs",
        "[...catchall]/index.rsx",
    ]);
    let tree = RouteTree::build(&BuildOptions::new(dir.path())).unwrap();
    let matchers = ParamMatchers::new();

    for route in &tree.routes {
        assert!(
            route.pattern.is_match(&route.pathname),
            "{} does not accept its own pathname",
            route.pathname
        );
        let found = tree.match_route(&route.pathname, &matchers).unwrap();
        assert_eq!(found.route.pathname, route.pathname);
    }
}

#[test]
fn test_literal_route_wins_over_catch_all() {
    let dir = route_dir(&["[...catchall]/index.rsx", "pricing/index.rsx"]);
    let tree = RouteTree::build(&BuildOptions::new(dir.path())).unwrap();

    let found = tree.match_route("/pricing/", &ParamMatchers::new()).unwrap();
    assert_eq!(found.route.pathname, "/pricing/");

    let found = tree.match_route("/anything/else", &ParamMatchers::new()).unwrap();
    assert_eq!(found.route.pathname, "/[...catchall]/");
    assert_eq!(found.params, params(&[("catchall", "anything/else")]));
}

#[rstest]
#[case("/blog/[slug]", "/blog/hello-world", &[("slug", "hello-world")])]
#[case("/[...catchall]", "/a/b/c", &[("catchall", "a/b/c")])]
#[case("/[...catchall]", "/", &[("catchall", "")])]
#[case("/shop/[category]/[item]", "/shop/shoes/boot%20x", &[("category", "shoes"), ("item", "boot x")])]
fn test_param_extraction(#[case] id: &str, #[case] pathname: &str, #[case] expected: &[(&str, &str)]) {
    struct Single(RoutePattern);
    impl Routable for Single {
        fn pattern(&self) -> &RoutePattern {
            &self.0
        }
    }

    let routes = [Single(compile_pattern(id).unwrap())];
    let found = match_route(&routes, pathname, &ParamMatchers::new()).unwrap();
    assert_eq!(found.params, params(expected));
}

#[test]
fn test_type_matcher_rejects_candidate() {
    let dir = route_dir(&["matched/[id=uuid]/index.rsx"]);
    let tree = RouteTree::build(&BuildOptions::new(dir.path())).unwrap();
    let matchers = uuid_matcher();

    assert!(tree.match_route("/matched/not-a-uuid", &matchers).is_none());

    let found = tree
        .match_route("/matched/123e4567-e89b-12d3-a456-426614174000/", &matchers)
        .unwrap();
    assert_eq!(found.params["id"], "123e4567-e89b-12d3-a456-426614174000");
}

#[test]
fn test_rejected_typed_route_falls_back_to_next() {
    let dir = route_dir(&["users/[id=uuid]/index.rsx", "users/[handle]/index.rsx"]);
    let tree = RouteTree::build(&BuildOptions::new(dir.path())).unwrap();

    let found = tree.match_route("/users/alice/", &uuid_matcher()).unwrap();
    assert_eq!(found.route.pathname, "/users/[handle]/");
}

#[test]
fn test_data_suffix_is_stripped_before_matching() {
    let dir = route_dir(&["blog/[slug]/index.rsx"]);
    let tree = RouteTree::build(&BuildOptions::new(dir.path())).unwrap();

    let (pathname, is_data) = strip_data_suffix("/blog/hello/__data", true);
    assert!(is_data);
    let found = tree.match_route(&pathname, &ParamMatchers::new()).unwrap();
    assert_eq!(found.params["slug"], "hello");
}

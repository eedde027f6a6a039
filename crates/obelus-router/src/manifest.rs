//! Serialized route table handed from the build to the server.
//!
//! Patterns are not serialized. The server recompiles them from each
//! route's pathname with [`compile_pattern`](crate::compile_pattern), the same
//! function the builder used.

use serde::{Deserialize, Serialize};

use crate::route::RouteKind;
use crate::tree::RouteTree;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteManifest {
    pub routes: Vec<ManifestRoute>,
    #[serde(default)]
    pub plugins: Vec<String>,
    #[serde(default)]
    pub menus: Vec<ManifestMenu>,
}

/// One route: its name, pathname and the module ids to load, layouts first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRoute {
    pub route_name: String,
    pub pathname: String,
    pub kind: RouteKind,
    pub modules: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_pathname: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub client_bundles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestMenu {
    pub pathname: String,
    pub module: String,
}

impl RouteManifest {
    pub fn from_tree(tree: &RouteTree) -> Self {
        let routes = tree
            .routes
            .iter()
            .map(|route| ManifestRoute {
                route_name: route.route_name.clone(),
                pathname: route.pathname.clone(),
                kind: route.kind,
                modules: route.module_ids(),
                original_pathname: route.original_pathname.clone(),
                client_bundles: Vec::new(),
            })
            .collect();

        Self {
            routes,
            plugins: tree.plugins.iter().map(|p| p.id.clone()).collect(),
            menus: tree
                .menus
                .iter()
                .map(|menu| ManifestMenu {
                    pathname: menu.pathname.clone(),
                    module: menu.id.clone(),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields_are_omitted() {
        let route = ManifestRoute {
            route_name: "blog/".to_string(),
            pathname: "/blog/".to_string(),
            kind: RouteKind::Page,
            modules: vec!["layout.rsx".to_string(), "blog/index.rsx".to_string()],
            original_pathname: None,
            client_bundles: Vec::new(),
        };
        let json = serde_json::to_value(&route).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "route_name": "blog/",
                "pathname": "/blog/",
                "kind": "page",
                "modules": ["layout.rsx", "blog/index.rsx"],
            })
        );
    }

    #[test]
    fn test_manifest_reads_minimal_json() {
        let manifest = RouteManifest::from_json(
            r#"{"routes":[{"route_name":"","pathname":"/","kind":"endpoint","modules":["index.rs"]}]}"#,
        )
        .unwrap();
        assert_eq!(manifest.routes.len(), 1);
        assert_eq!(manifest.routes[0].kind, RouteKind::Endpoint);
        assert!(manifest.plugins.is_empty());
    }
}

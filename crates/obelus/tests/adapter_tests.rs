//! Integration tests for the axum adapter and the build-to-serve path.

mod common;

use std::fs;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use obelus::obelus_router::{BuildOptions, RouteTree};
use obelus::{adapter, Config, Dispatcher, ModuleRegistry, RouteModule, ServerContext};
use tower::ServiceExt;

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("host", "localhost:3000")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_router_serves_pages() {
    let site = common::site_with(Config::default(), false);
    let app = adapter::router(site.dispatcher.clone());

    let response = app.oneshot(request("/blog/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.starts_with("<h1>Blog</h1>"));
}

#[tokio::test]
async fn test_router_falls_back_to_404() {
    let site = common::site_with(Config::default(), false);
    let app = adapter::router(site.dispatcher.clone());

    let response = app.oneshot(request("/does/not/exist")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_router_keeps_redirect_headers() {
    let site = common::site_with(Config::default(), false);
    let app = adapter::router(site.dispatcher.clone());

    let response = app.oneshot(request("/blog?x=1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()["location"], "/blog/?x=1");
}

#[tokio::test]
async fn test_built_tree_is_served() {
    let dir = tempfile::tempdir().unwrap();
    for file in ["index.rsx", "about.rsx", "layout.rsx", "api/health.rs"] {
        let path = dir.path().join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    let tree = RouteTree::build(&BuildOptions::new(dir.path())).unwrap();
    let manifest = tree.manifest();
    let registry = ["index.rsx", "about.rsx", "layout.rsx", "api/health.rs"]
        .into_iter()
        .fold(ModuleRegistry::new(), |registry, id| {
            let module = if id.ends_with(".rsx") && id != "layout.rsx" {
                RouteModule::new().default_export(if id == "index.rsx" { "Home" } else { "About" })
            } else {
                RouteModule::new()
            };
            registry.with_module(id, module)
        });

    let cx = ServerContext::builder(Config::default())
        .manifest(manifest)
        .modules(registry)
        .renderer(common::TitleRenderer)
        .build()
        .unwrap();
    let app = adapter::router(Dispatcher::new(Arc::new(cx)));

    let response = app.clone().oneshot(request("/about/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.starts_with("<h1>About</h1>"));

    let response = app.oneshot(request("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

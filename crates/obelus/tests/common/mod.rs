//! Shared fixture: a small site wired with in-memory modules.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use obelus::obelus_router::{ManifestRoute, RouteKind, RouteManifest};
use obelus::*;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Barrier;
use url::Url;

pub type Log = Arc<Mutex<Vec<String>>>;

pub struct Site {
    pub dispatcher: Dispatcher,
    pub log: Log,
}

impl Site {
    pub fn entries(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Dispatches and waits for both the response and completion.
    pub async fn send(&self, request: ServerRequest) -> (Option<Response>, anyhow::Result<()>) {
        let mut dispatch = self
            .dispatcher
            .handle(request)
            .await
            .unwrap()
            .expect("request should be handled by a route or plugin");
        let response = dispatch.response().await;
        (response, dispatch.completion().await)
    }

    /// Dispatches and expects a written response.
    pub async fn fetch(&self, request: ServerRequest) -> Response {
        let (response, completion) = self.send(request).await;
        completion.unwrap();
        response.expect("a response should be written")
    }
}

pub fn get(url: &str) -> ServerRequest {
    ServerRequest::new(Method::GET, Url::parse(url).unwrap())
}

pub fn post(url: &str) -> ServerRequest {
    ServerRequest::new(Method::POST, Url::parse(url).unwrap())
}

fn entry(log: &Log, name: &'static str) {
    log.lock().unwrap().push(name.to_string());
}

fn logging(log: &Log, name: &'static str) -> Arc<dyn RequestHandler> {
    let log = Arc::clone(log);
    handler_fn(move |_ev| {
        let log = Arc::clone(&log);
        Box::pin(async move {
            entry(&log, name);
            Ok(())
        })
    })
}

/// Renders `<h1>{export}</h1>` followed by the loader values as JSON.
pub struct TitleRenderer;

#[async_trait]
impl Render for TitleRenderer {
    async fn render(&self, cx: RenderContext<'_>) -> anyhow::Result<RenderOutput> {
        let title = cx
            .route
            .leaf()
            .and_then(|module| module.export_as::<&'static str>())
            .copied()
            .unwrap_or("untitled");
        let loaders = serde_json::to_string(cx.event.loader_values())?;
        Ok(RenderOutput::Html(format!("<h1>{title}</h1><pre>{loaders}</pre>")))
    }
}

#[derive(Debug, Deserialize)]
struct Subscribe {
    email: String,
}

fn route(pathname: &str, kind: RouteKind, modules: &[&str]) -> ManifestRoute {
    ManifestRoute {
        route_name: pathname.trim_start_matches('/').to_string(),
        pathname: pathname.to_string(),
        kind,
        modules: modules.iter().map(|m| m.to_string()).collect(),
        original_pathname: None,
        client_bundles: Vec::new(),
    }
}

pub fn manifest(with_plugin: bool) -> RouteManifest {
    RouteManifest {
        routes: vec![
            route("/", RouteKind::Page, &["layout.rsx", "index.rsx"]),
            route("/account/", RouteKind::Page, &["layout.rsx", "account.rsx"]),
            route("/blog/", RouteKind::Page, &["layout.rsx", "blog/index.rsx"]),
            route("/api/data.json", RouteKind::Endpoint, &["api/data.json.rs"]),
            route("/feed.xml", RouteKind::Page, &["feed.xml.md"]),
            route("/stats/", RouteKind::Page, &["layout.rsx", "stats.rsx"]),
            route("/blog/[slug]/", RouteKind::Page, &["layout.rsx", "blog/[slug].rsx"]),
        ],
        plugins: if with_plugin {
            vec!["plugin.rs".to_string()]
        } else {
            Vec::new()
        },
        menus: Vec::new(),
    }
}

/// A loader that only settles once its sibling is running too.
fn rendezvous(id: &'static str, value: &'static str, barrier: &Arc<Barrier>) -> Loader {
    let barrier = Arc::clone(barrier);
    Loader::new(id, move |_ev| {
        let barrier = Arc::clone(&barrier);
        Box::pin(async move {
            match tokio::time::timeout(Duration::from_secs(2), barrier.wait()).await {
                Ok(_) => Ok(json!(value).into()),
                Err(_) => Err(anyhow::anyhow!("loader `{id}` ran alone").into()),
            }
        })
    })
}

pub fn modules(log: &Log) -> ModuleRegistry {
    let plugin_log = Arc::clone(log);
    let plugin = RouteModule::new().on_request(handler_fn(move |ev| {
        let log = Arc::clone(&plugin_log);
        Box::pin(async move {
            entry(&log, "plugin");
            if ev.pathname() == "/plugin-only" {
                ev.text(StatusCode::OK, "from plugin")?;
            }
            Ok(())
        })
    }));

    let layout_log = Arc::clone(log);
    let layout = RouteModule::new().on_get(handler_fn(move |ev| {
        let log = Arc::clone(&layout_log);
        Box::pin(async move {
            entry(&log, "layout");
            if ev.query("redirect").is_some() {
                return Err(ev.redirect(StatusCode::FOUND, "/sign-in/"));
            }
            Ok(())
        })
    }));

    let blog = RouteModule::new()
        .on_get(logging(log, "page"))
        .loader(Loader::new("posts", |_ev| {
            Box::pin(async { Ok(json!(["first", "second"]).into()) })
        }))
        .action(
            Action::new("subscribe", |_ev, data| {
                Box::pin(async move { Ok(json!({ "subscribed": data["email"] }).into()) })
            })
            .with_validator(validate_as::<Subscribe>()),
        )
        .default_export("Blog");

    let post_log = Arc::clone(log);
    let post = RouteModule::new()
        .on_get(handler_fn(move |ev| {
            let log = Arc::clone(&post_log);
            Box::pin(async move {
                match ev.param("slug") {
                    Some("missing") => Err(ev.error(StatusCode::NOT_FOUND, "No such post")),
                    Some("boom") => Err(anyhow::anyhow!("database exploded").into()),
                    _ => {
                        entry(&log, "post");
                        Ok(())
                    }
                }
            })
        }))
        .loader(Loader::new("post", |ev| {
            Box::pin(async move { Ok(json!({ "slug": ev.param("slug") }).into()) })
        }))
        .default_export("Post");

    let account = RouteModule::new()
        .loader(Loader::new("session", |ev| {
            Box::pin(async move {
                match ev.cookie("session") {
                    Some(session) => Ok(json!({ "user": session }).into()),
                    None => Err(Interrupt::redirect(StatusCode::FOUND, "/sign-in/")),
                }
            })
        }))
        .default_export("Account");

    let data = RouteModule::new()
        .on_get(handler_fn(|ev| {
            Box::pin(async move {
                ev.json(StatusCode::OK, &json!({ "ok": true }))?;
                Ok(())
            })
        }))
        .on_post(handler_fn(|ev| {
            Box::pin(async move {
                ev.text(StatusCode::CREATED, "posted")?;
                Ok(())
            })
        }))
        .on_put(handler_fn(|ev| {
            Box::pin(async move {
                ev.set_status(StatusCode::CONFLICT)?;
                ev.set_header("x-reason", "locked")?;
                Err(Interrupt::Abort)
            })
        }));

    let barrier = Arc::new(Barrier::new(2));
    let stats = RouteModule::new()
        .loader(rendezvous("visits", "left", &barrier))
        .loader(rendezvous("signups", "right", &barrier))
        .default_export("Stats");

    ModuleRegistry::new()
        .with_module("plugin.rs", plugin)
        .with_module("layout.rsx", layout)
        .with_module("index.rsx", RouteModule::new().default_export("Home"))
        .with_module("account.rsx", account)
        .with_module("blog/index.rsx", blog)
        .with_module("blog/[slug].rsx", post)
        .with_module("api/data.json.rs", data)
        .with_module("feed.xml.md", RouteModule::new().default_export("Feed"))
        .with_module("stats.rsx", stats)
}

pub fn server_context(config: Config, with_plugin: bool, log: &Log) -> ServerContext {
    ServerContext::builder(config)
        .manifest(manifest(with_plugin))
        .modules(modules(log))
        .renderer(TitleRenderer)
        .server_function(ServerFunction::new("add", |_ev, args| {
            Box::pin(async move {
                let sum: i64 = args.iter().filter_map(|arg| arg.as_i64()).sum();
                Ok(json!(sum))
            })
        }))
        .build()
        .unwrap()
}

pub fn site_with(config: Config, with_plugin: bool) -> Site {
    let log: Log = Arc::default();
    let cx = server_context(config, with_plugin, &log);
    Site {
        dispatcher: Dispatcher::new(Arc::new(cx)),
        log,
    }
}

pub fn site() -> Site {
    site_with(Config::default(), true)
}

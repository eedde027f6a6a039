// File: src/context.rs
// Purpose: Process-wide server state injected into the dispatcher

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use arc_swap::ArcSwap;
use obelus_router::{ParamMatchers, RouteManifest};
use tracing::info;

use crate::config::Config;
use crate::handlers::Render;
use crate::module::{Action, ModuleCache, ModuleRegistry, ServerFunction};
use crate::routes::RouteTable;

/// Everything a request needs besides the request itself.
///
/// The route table sits behind an [`ArcSwap`]: requests load it without
/// locking and a rebuild replaces it whole.
pub struct ServerContext {
    routes: ArcSwap<RouteTable>,
    pub(crate) registry: ModuleRegistry,
    pub(crate) cache: ModuleCache,
    pub(crate) global_actions: Arc<HashMap<String, Arc<Action>>>,
    pub(crate) server_functions: Arc<HashMap<String, Arc<ServerFunction>>>,
    pub(crate) param_matchers: ParamMatchers,
    pub(crate) renderer: Option<Arc<dyn Render>>,
    pub(crate) config: Config,
}

impl ServerContext {
    pub fn builder(config: Config) -> ServerContextBuilder {
        ServerContextBuilder {
            config,
            manifest: RouteManifest::default(),
            registry: ModuleRegistry::new(),
            global_actions: HashMap::new(),
            server_functions: HashMap::new(),
            param_matchers: ParamMatchers::new(),
            renderer: None,
        }
    }

    /// The current route table.
    pub fn routes(&self) -> Arc<RouteTable> {
        self.routes.load_full()
    }

    /// Replaces the route table with one built from `manifest` and drops
    /// cached modules. In-flight requests keep the table they loaded.
    pub fn swap_routes(&self, manifest: &RouteManifest) -> anyhow::Result<()> {
        let table = RouteTable::from_manifest(manifest, &self.registry)?;
        let count = table.routes().len();
        self.routes.store(Arc::new(table));
        self.cache.clear();
        info!(routes = count, "route table swapped");
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

pub struct ServerContextBuilder {
    config: Config,
    manifest: RouteManifest,
    registry: ModuleRegistry,
    global_actions: HashMap<String, Arc<Action>>,
    server_functions: HashMap<String, Arc<ServerFunction>>,
    param_matchers: ParamMatchers,
    renderer: Option<Arc<dyn Render>>,
}

impl ServerContextBuilder {
    pub fn manifest(mut self, manifest: RouteManifest) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn modules(mut self, registry: ModuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Registers an action reachable from every route.
    pub fn global_action(mut self, action: Action) -> Self {
        self.global_actions
            .insert(action.id().to_string(), Arc::new(action));
        self
    }

    pub fn server_function(mut self, function: ServerFunction) -> Self {
        self.server_functions
            .insert(function.id().to_string(), Arc::new(function));
        self
    }

    pub fn param_matchers(mut self, matchers: ParamMatchers) -> Self {
        self.param_matchers = matchers;
        self
    }

    pub fn renderer(mut self, renderer: impl Render + 'static) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    pub fn build(self) -> anyhow::Result<ServerContext> {
        let table = RouteTable::from_manifest(&self.manifest, &self.registry)
            .context("Failed to load route manifest")?;
        Ok(ServerContext {
            routes: ArcSwap::from_pointee(table),
            registry: self.registry,
            cache: ModuleCache::new(),
            global_actions: Arc::new(self.global_actions),
            server_functions: Arc::new(self.server_functions),
            param_matchers: self.param_matchers,
            renderer: self.renderer,
            config: self.config,
        })
    }
}

/// Reads a manifest written by `obelus build`.
pub fn read_manifest(path: impl AsRef<Path>) -> anyhow::Result<RouteManifest> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read route manifest: {}", path.display()))?;
    RouteManifest::from_json(&json)
        .with_context(|| format!("Failed to parse route manifest: {}", path.display()))
}

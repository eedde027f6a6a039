// File: src/routes.rs
// Purpose: Request-time route table rebuilt from the build manifest

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context};
use obelus_router::{
    compile_pattern, match_route, ManifestMenu, ParamMatchers, PathHierarchy, Routable,
    RouteKind, RouteManifest, RouteMatch, RoutePattern,
};

use crate::module::{ModuleCache, ModuleRegistry, RouteModule};

/// A route as served: its recompiled pattern plus the module ids to load.
#[derive(Debug, Clone)]
pub struct RuntimeRoute {
    pub route_name: String,
    pub pathname: String,
    pub kind: RouteKind,
    pub pattern: RoutePattern,
    /// Layouts first, then the page or endpoint.
    pub module_ids: Vec<String>,
    pub original_pathname: Option<String>,
    pub client_bundles: Vec<String>,
}

impl Routable for RuntimeRoute {
    fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }
}

/// The full table consulted by the dispatcher. Immutable; a rebuild creates
/// a new table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RuntimeRoute>,
    plugins: Vec<String>,
    menus: Vec<ManifestMenu>,
}

impl RouteTable {
    /// Recompiles every pattern and checks that each referenced module is
    /// registered. Table order is kept as precedence order.
    pub fn from_manifest(manifest: &RouteManifest, registry: &ModuleRegistry) -> anyhow::Result<Self> {
        let mut routes = Vec::with_capacity(manifest.routes.len());

        for route in &manifest.routes {
            let pattern = compile_pattern(&route.pathname)
                .with_context(|| format!("Failed to compile route `{}`", route.pathname))?;
            for id in &route.modules {
                ensure_registered(registry, id)?;
            }
            routes.push(RuntimeRoute {
                route_name: route.route_name.clone(),
                pathname: route.pathname.clone(),
                kind: route.kind,
                pattern,
                module_ids: route.modules.clone(),
                original_pathname: route.original_pathname.clone(),
                client_bundles: route.client_bundles.clone(),
            });
        }

        for id in &manifest.plugins {
            ensure_registered(registry, id)?;
        }
        for menu in &manifest.menus {
            ensure_registered(registry, &menu.module)?;
        }

        Ok(Self {
            routes,
            plugins: manifest.plugins.clone(),
            menus: manifest.menus.clone(),
        })
    }

    pub fn routes(&self) -> &[RuntimeRoute] {
        &self.routes
    }

    pub fn plugins(&self) -> &[String] {
        &self.plugins
    }

    pub fn find(&self, pathname: &str, matchers: &ParamMatchers) -> Option<RouteMatch<'_, RuntimeRoute>> {
        match_route(&self.routes, pathname, matchers)
    }

    /// The nearest menu at or above `pathname`.
    pub fn menu_for(&self, pathname: &str) -> Option<&ManifestMenu> {
        PathHierarchy::new(pathname).find_map(|ancestor| {
            let ancestor = ancestor.trim_end_matches('/');
            self.menus
                .iter()
                .find(|menu| menu.pathname.trim_end_matches('/') == ancestor)
        })
    }
}

fn ensure_registered(registry: &ModuleRegistry, id: &str) -> anyhow::Result<()> {
    if !registry.contains(id) {
        bail!("Route manifest references unregistered module `{}`", id);
    }
    Ok(())
}

/// A route resolved for one request: matched params plus loaded modules.
#[derive(Debug, Clone)]
pub struct LoadedRoute {
    pub route_name: String,
    pub params: HashMap<String, String>,
    /// Layouts first, then the page or endpoint.
    pub modules: Vec<Arc<RouteModule>>,
    pub menu: Option<Arc<RouteModule>>,
    pub client_bundles: Vec<String>,
}

impl LoadedRoute {
    pub(crate) async fn load(
        table: &RouteTable,
        found: RouteMatch<'_, RuntimeRoute>,
        registry: &ModuleRegistry,
        cache: &ModuleCache,
    ) -> anyhow::Result<Self> {
        let route = found.route;
        let mut modules = Vec::with_capacity(route.module_ids.len());
        for id in &route.module_ids {
            modules.push(cache.load(id, registry).await?);
        }

        let menu = match table.menu_for(&route.pathname) {
            Some(menu) => Some(cache.load(&menu.module, registry).await?),
            None => None,
        };

        Ok(Self {
            route_name: route.route_name.clone(),
            params: found.params,
            modules,
            menu,
            client_bundles: route.client_bundles.clone(),
        })
    }

    /// The page or endpoint module.
    pub fn leaf(&self) -> Option<&Arc<RouteModule>> {
        self.modules.last()
    }

    /// Whether the leaf module exports something renderable.
    pub fn is_page(&self) -> bool {
        self.leaf().map(|module| module.is_page()).unwrap_or(false)
    }
}

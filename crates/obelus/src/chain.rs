// File: src/chain.rs
// Purpose: Resolves the ordered handler chain for a matched route and method

use std::sync::Arc;

use axum::http::Method;

use crate::context::ServerContext;
use crate::handlers::{
    CsrfGuard, DataResponder, LoaderActionExecutor, RedirectPropagation, RenderHandler,
    RouteNameRecorder, ServerFunctionCall, TrailingSlash,
};
use crate::module::{Action, Loader, RequestHandler, RouteModule};
use crate::routes::LoadedRoute;

/// Handlers plus the loaders and actions collected along the way.
#[derive(Default)]
struct ChainBuilder {
    handlers: Vec<Arc<dyn RequestHandler>>,
    loaders: Vec<Arc<Loader>>,
    actions: Vec<Arc<Action>>,
}

impl ChainBuilder {
    fn push(&mut self, handler: impl RequestHandler + 'static) {
        self.handlers.push(Arc::new(handler));
    }

    /// Adds each module's `on_request` then its method handler, in order,
    /// and collects its loaders and actions.
    fn modules(&mut self, modules: &[Arc<RouteModule>], method: &Method) {
        for module in modules {
            if let Some(handler) = module.request_handler() {
                self.handlers.push(Arc::clone(handler));
            }
            if let Some(handler) = module.method_handler(method) {
                self.handlers.push(Arc::clone(handler));
            }
            self.loaders.extend(module.loaders().iter().cloned());
            self.actions.extend(module.actions().iter().cloned());
        }
    }
}

pub(crate) fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Builds the chain in its fixed order:
///
/// 1. plugins
/// 2. CSRF guard (mutating methods, origin checking on)
/// 3. pages: server function call, trailing slash, data responder
/// 4. redirect propagation (data requests)
/// 5. route modules, outer layout to leaf
/// 6. pages: route name recorder, loaders and actions, render
///
/// Without a route only the plugins run.
pub(crate) fn resolve_chain(
    cx: &ServerContext,
    method: &Method,
    plugins: &[Arc<RouteModule>],
    route: Option<&Arc<LoadedRoute>>,
    is_data: bool,
) -> Vec<Arc<dyn RequestHandler>> {
    let mut chain = ChainBuilder::default();
    chain.modules(plugins, method);

    let Some(route) = route else {
        return chain.handlers;
    };
    let is_page = route.is_page();
    let trailing_slash = cx.config.routing.trailing_slash;

    if is_mutating(method) && cx.config.server.check_origin {
        chain.push(CsrfGuard {
            dev: cx.config.server.mode.is_dev(),
        });
    }

    if is_page {
        chain.push(ServerFunctionCall {
            functions: Arc::clone(&cx.server_functions),
        });
        chain.push(TrailingSlash { trailing_slash });
        chain.push(DataResponder { trailing_slash });
    }

    if is_data {
        chain.push(RedirectPropagation);
    }

    chain.modules(&route.modules, method);

    if is_page {
        chain.push(RouteNameRecorder {
            route_name: route.route_name.clone(),
        });
        let loaders = std::mem::take(&mut chain.loaders);
        let actions = std::mem::take(&mut chain.actions);
        chain.push(LoaderActionExecutor {
            loaders,
            actions,
            global_actions: Arc::clone(&cx.global_actions),
        });
        chain.push(RenderHandler {
            route: Arc::clone(route),
            renderer: cx.renderer.clone(),
        });
    }

    chain.handlers
}

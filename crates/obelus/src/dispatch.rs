// File: src/dispatch.rs
// Purpose: Top-level entry point: match, resolve the chain, run it to one outcome

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use axum::http::StatusCode;
use obelus_router::strip_data_suffix;
use serde_json::json;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::chain::resolve_chain;
use crate::context::ServerContext;
use crate::error::{HandlerResult, Interrupt, ResponseError, ServerError};
use crate::error_page::error_page;
use crate::event::RequestEvent;
use crate::request::ServerRequest;
use crate::response::Response;
use crate::routes::LoadedRoute;

/// Feeds requests through the route table and handler chains.
#[derive(Clone)]
pub struct Dispatcher {
    cx: Arc<ServerContext>,
}

/// A request accepted by the dispatcher.
pub struct Dispatch {
    response: Option<oneshot::Receiver<Response>>,
    completion: JoinHandle<anyhow::Result<()>>,
}

impl Dispatcher {
    pub fn new(cx: Arc<ServerContext>) -> Self {
        Self { cx }
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.cx
    }

    /// Matches the request and starts its handler chain.
    ///
    /// `Ok(None)` when neither a route nor a plugin handles the request; the
    /// host falls through to its own 404. Errors only come from loading
    /// modules, before anything runs.
    pub async fn handle(&self, request: ServerRequest) -> anyhow::Result<Option<Dispatch>> {
        let cx = &self.cx;
        let table = cx.routes();
        let (pathname, is_data) =
            strip_data_suffix(request.url.path(), cx.config.routing.trailing_slash);

        let route = match table.find(&pathname, &cx.param_matchers) {
            Some(found) => {
                let loaded = LoadedRoute::load(&table, found, &cx.registry, &cx.cache)
                    .await
                    .with_context(|| format!("Failed to load modules for {}", pathname))?;
                Some(Arc::new(loaded))
            }
            None => None,
        };

        let mut plugins = Vec::with_capacity(table.plugins().len());
        for id in table.plugins() {
            plugins.push(cx.cache.load(id, &cx.registry).await?);
        }

        if route.is_none() && plugins.is_empty() {
            debug!(method = %request.method, pathname = %pathname, "no route matched");
            return Ok(None);
        }
        if let Some(route) = &route {
            debug!(route = %route.route_name, method = %request.method, data = is_data, "matched route");
        }

        let handlers = resolve_chain(cx, &request.method, &plugins, route.as_ref(), is_data);
        let params = route
            .as_ref()
            .map(|route| route.params.clone())
            .unwrap_or_else(HashMap::new);

        let (tx, rx) = oneshot::channel();
        let event = RequestEvent::new(
            request,
            params,
            handlers.into(),
            cx.config.server.mode,
            is_data,
            tx,
        );
        let completion = tokio::spawn(run(event));

        Ok(Some(Dispatch {
            response: Some(rx),
            completion,
        }))
    }
}

impl Dispatch {
    /// Resolves once the response head is written, or to `None` when the
    /// chain finished without writing anything. Yields the response once.
    pub async fn response(&mut self) -> Option<Response> {
        let rx = self.response.take()?;
        rx.await.ok()
    }

    /// Resolves when the chain and its error handling are done: `Err` with
    /// the unhandled error outside dev mode.
    pub async fn completion(self) -> anyhow::Result<()> {
        self.completion.await.context("Request task panicked")?
    }
}

async fn run(mut ev: RequestEvent) -> anyhow::Result<()> {
    let outcome = ev.next().await;
    finalize(&mut ev, outcome)
}

/// Settles the single terminal outcome of a chain.
fn finalize(ev: &mut RequestEvent, outcome: HandlerResult) -> anyhow::Result<()> {
    match outcome {
        Ok(()) => {
            // Not exited and nothing written: the request was not handled.
            if ev.is_exited() && !ev.headers_sent() {
                ev.write_response()?;
            }
            Ok(())
        }
        Err(Interrupt::Redirect(_) | Interrupt::Abort) => {
            if !ev.headers_sent() {
                ev.write_response()?;
            }
            Ok(())
        }
        Err(Interrupt::Error(err)) => {
            if ev.headers_sent() {
                warn!(status = %err.status, "server error raised after headers were sent");
                return Ok(());
            }
            write_error(ev, &err)?;
            Ok(())
        }
        Err(Interrupt::Unhandled(err)) => {
            error!(error = ?err, path = %ev.pathname(), "unhandled error while handling request");
            if !ev.headers_sent() {
                let message = if ev.mode().is_dev() {
                    format!("{err:#}")
                } else {
                    "Internal Server Error".to_string()
                };
                let fallback = ServerError::new(StatusCode::INTERNAL_SERVER_ERROR, message);
                if let Err(write_err) = write_error(ev, &fallback) {
                    error!(error = %write_err, "failed to write error response");
                }
            }
            if ev.mode().is_dev() {
                Ok(())
            } else {
                Err(err)
            }
        }
    }
}

/// Error page for HTML clients, `{status, message, data}` JSON otherwise.
fn write_error(ev: &mut RequestEvent, err: &ServerError) -> Result<(), ResponseError> {
    if ev.accepts_html() {
        let page = error_page(err.status, &err.message()).into_string();
        ev.html(err.status, page)
    } else {
        let payload = json!({
            "status": err.status.as_u16(),
            "message": err.message(),
            "data": err.data,
        });
        ev.json(err.status, &payload)
    }
}

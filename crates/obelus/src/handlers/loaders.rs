use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use futures::future::join_all;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{HandlerResult, Interrupt};
use crate::event::{RequestEvent, ROUTE_NAME_KEY};
use crate::module::{Action, Loader, RequestHandler, Settled};

/// Query parameter carrying the id of the submitted action.
pub const QACTION_PARAM: &str = "qaction";

/// Stores the matched route name in the shared map.
pub struct RouteNameRecorder {
    pub route_name: String,
}

#[async_trait]
impl RequestHandler for RouteNameRecorder {
    async fn handle(&self, ev: &mut RequestEvent) -> HandlerResult {
        ev.shared_map_mut().insert(
            ROUTE_NAME_KEY.to_string(),
            JsonValue::String(self.route_name.clone()),
        );
        Ok(())
    }
}

/// Runs the submitted action, if any, then every loader concurrently.
pub struct LoaderActionExecutor {
    pub loaders: Vec<Arc<Loader>>,
    pub actions: Vec<Arc<Action>>,
    pub global_actions: Arc<HashMap<String, Arc<Action>>>,
}

impl LoaderActionExecutor {
    fn find_action(&self, id: &str) -> Option<Arc<Action>> {
        self.actions
            .iter()
            .find(|action| action.id() == id)
            .or_else(|| self.global_actions.get(id))
            .cloned()
    }

    async fn run_action(&self, ev: &mut RequestEvent, id: String) -> HandlerResult {
        let Some(action) = self.find_action(&id) else {
            return Err(ev.error(
                StatusCode::BAD_REQUEST,
                format!("Action `{}` is not defined for this route", id),
            ));
        };

        let data = ev.parse_body().filter(|data| data.is_object()).cloned();
        let Some(data) = data else {
            return Err(ev.error(
                StatusCode::BAD_REQUEST,
                "Expected request data for the action to be an object",
            ));
        };

        debug!(action = %id, "running action");
        let settled = action.call(ev, data).await?;
        if let Settled::Failed(fail) = &settled {
            ev.force_status(fail.status);
        }
        ev.action_result = Some((id, settled.into_json()));
        Ok(())
    }

    async fn run_loaders(&self, ev: &mut RequestEvent) -> HandlerResult {
        let results = {
            let shared: &RequestEvent = ev;
            join_all(self.loaders.iter().map(|loader| async move {
                (loader.id().to_string(), loader.call(shared).await)
            }))
            .await
        };

        for (id, result) in results {
            match result {
                Ok(settled) => {
                    if let Settled::Failed(fail) = &settled {
                        ev.force_status(fail.status);
                    }
                    ev.loader_values.insert(id, settled.into_json());
                }
                // Loaders only see the event shared, so their redirects
                // arrive unapplied.
                Err(Interrupt::Redirect(message)) => {
                    return Err(ev.redirect(message.status, &message.location));
                }
                Err(other) => return Err(other),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RequestHandler for LoaderActionExecutor {
    async fn handle(&self, ev: &mut RequestEvent) -> HandlerResult {
        if ev.headers_sent() {
            return Ok(());
        }

        let mutating = matches!(
            *ev.method(),
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE
        );
        if mutating {
            if let Some(id) = ev.query(QACTION_PARAM) {
                self.run_action(ev, id).await?;
            }
        }

        if !self.loaders.is_empty() {
            self.run_loaders(ev).await?;
        }
        Ok(())
    }
}

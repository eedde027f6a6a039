use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{HandlerResult, Interrupt};
use crate::event::RequestEvent;
use crate::module::{RequestHandler, ServerFunction};
use crate::request::content_type;

/// Query parameter naming the server function to call.
pub const QFUNC_PARAM: &str = "qfunc";
/// Query parameter carrying JSON arguments on `GET` calls.
pub const QDATA_PARAM: &str = "qdata";
/// Header that must repeat the function id.
pub const SERVER_FN_HEADER: &str = "x-server-fn";

/// Invokes a registered [`ServerFunction`] directly, bypassing rendering.
///
/// Only fires when the `qfunc` query parameter, the `x-server-fn` header and
/// an `application/json` content type all agree.
pub struct ServerFunctionCall {
    pub functions: Arc<HashMap<String, Arc<ServerFunction>>>,
}

#[async_trait]
impl RequestHandler for ServerFunctionCall {
    async fn handle(&self, ev: &mut RequestEvent) -> HandlerResult {
        if !matches!(*ev.method(), Method::GET | Method::POST) {
            return Ok(());
        }
        let Some(id) = ev.query(QFUNC_PARAM) else {
            return Ok(());
        };
        let header_matches = ev.header(SERVER_FN_HEADER) == Some(id.as_str());
        let is_json = content_type(ev.request_headers()).as_deref() == Some("application/json");
        if !header_matches || !is_json {
            return Ok(());
        }

        ev.exit();
        let Some(function) = self.functions.get(&id).cloned() else {
            return Err(ev.error(StatusCode::BAD_REQUEST, "Invalid request"));
        };

        let payload = if *ev.method() == Method::GET {
            ev.query(QDATA_PARAM)
                .and_then(|raw| serde_json::from_str::<JsonValue>(&raw).ok())
        } else {
            ev.parse_body().cloned()
        };
        let args = match payload {
            Some(JsonValue::Array(args)) => args,
            Some(JsonValue::Null) | None => Vec::new(),
            Some(other) => vec![other],
        };

        debug!(function = %id, args = args.len(), "calling server function");
        match function.call(ev, args).await {
            Ok(value) => ev.json(StatusCode::OK, &value)?,
            Err(Interrupt::Error(err)) => ev.json(err.status, &err.data)?,
            Err(other) => return Err(other),
        }
        Ok(())
    }
}

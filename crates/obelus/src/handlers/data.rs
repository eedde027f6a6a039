//! Internal data protocol: the JSON sibling of a page response, served for
//! `<page>/__data` requests.

use async_trait::async_trait;
use axum::http::{header, StatusCode};
use obelus_router::strip_data_suffix;
use serde_json::{json, Map, Value as JsonValue};

use crate::error::{HandlerResult, Interrupt};
use crate::event::RequestEvent;
use crate::module::RequestHandler;

/// Query parameter restricting which loader values are returned.
pub const LOADERS_PARAM: &str = "loaders";

/// Runs the rest of the chain for a data request, then answers with
/// `{loaders, action?, status, href, redirect?}`.
pub struct DataResponder {
    pub trailing_slash: bool,
}

#[async_trait]
impl RequestHandler for DataResponder {
    async fn handle(&self, ev: &mut RequestEvent) -> HandlerResult {
        if !ev.is_data_request() {
            return Ok(());
        }
        ev.next().await?;
        if ev.headers_sent() {
            return Ok(());
        }

        let payload = data_payload(ev, self.trailing_slash);
        let status = ev.status();
        ev.cache_control("no-store")?;
        ev.json(status, &payload)?;
        Ok(())
    }
}

fn data_payload(ev: &RequestEvent, trailing_slash: bool) -> JsonValue {
    let filter: Option<Vec<String>> = ev.query(LOADERS_PARAM).map(|ids| {
        ids.split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    });

    let mut loaders: Map<String, JsonValue> = ev
        .loader_values()
        .iter()
        .filter(|(id, _)| filter.as_ref().map_or(true, |ids| ids.contains(*id)))
        .map(|(id, value)| (id.clone(), value.clone()))
        .collect();

    let mut payload = json!({
        "status": ev.status().as_u16(),
        "href": href(ev, trailing_slash),
    });
    if let Some((id, value)) = ev.action_result() {
        loaders.insert(id.to_string(), value.clone());
        payload["action"] = JsonValue::String(id.to_string());
    }
    payload["loaders"] = JsonValue::Object(loaders);
    if let Some(redirect) = &ev.data_redirect {
        payload["redirect"] = JsonValue::String(redirect.clone());
    }
    payload
}

/// The page URL the data belongs to: suffix stripped, query kept.
fn href(ev: &RequestEvent, trailing_slash: bool) -> String {
    let (pathname, _) = strip_data_suffix(ev.pathname(), trailing_slash);
    match ev.url().query() {
        Some(query) => format!("{pathname}?{query}"),
        None => pathname,
    }
}

/// For data requests, turns a redirect raised further down the chain into a
/// `redirect` field of the payload instead of an HTTP redirect.
pub struct RedirectPropagation;

#[async_trait]
impl RequestHandler for RedirectPropagation {
    async fn handle(&self, ev: &mut RequestEvent) -> HandlerResult {
        if !ev.is_data_request() {
            return Ok(());
        }
        match ev.next().await {
            Err(Interrupt::Redirect(message)) => {
                ev.set_status(StatusCode::OK)?;
                ev.remove_header(header::LOCATION.as_str())?;
                ev.data_redirect = Some(message.location);
                Ok(())
            }
            other => other,
        }
    }
}

// File: src/request.rs
// Purpose: Host-supplied request object, abort signal and body parsing

use axum::body::Bytes;
use axum::http::{header, HeaderMap, Method};
use serde_json::{Map, Value as JsonValue};
use tokio::sync::watch;
use url::{form_urlencoded, Url};

/// A request as handed over by the host transport.
#[derive(Debug, Clone)]
pub struct ServerRequest {
    pub method: Method,
    /// Absolute URL, origin included.
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub abort: AbortSignal,
    /// Host specific data passed through untouched.
    pub platform: JsonValue,
}

impl ServerRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            abort: AbortSignal::never(),
            platform: JsonValue::Null,
        }
    }

    pub fn with_header(mut self, name: header::HeaderName, value: &str) -> Self {
        if let Ok(value) = value.parse() {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_abort(mut self, abort: AbortSignal) -> Self {
        self.abort = abort;
        self
    }

    /// Media type of the body without parameters, lowercased.
    pub fn content_type(&self) -> Option<String> {
        content_type(&self.headers)
    }
}

pub(crate) fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split([';', ',']).next())
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
}

/// Observes cancellation of the underlying request.
///
/// Loaders and actions can poll [`is_aborted`](Self::is_aborted) or await
/// [`aborted`](Self::aborted). Nothing in the dispatch loop times out on its
/// own; cancelling is up to the host.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

/// Fires an [`AbortSignal`].
#[derive(Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortSignal {
    pub fn new() -> (AbortHandle, AbortSignal) {
        let (tx, rx) = watch::channel(false);
        (AbortHandle { tx }, AbortSignal { rx })
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        let (_, signal) = Self::new();
        signal
    }

    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the request is aborted. Pending forever for a signal
    /// whose handle was dropped without firing.
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|aborted| *aborted).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl AbortHandle {
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }
}

/// Parses a request body by content type.
///
/// - `application/json`: the JSON value
/// - `application/x-www-form-urlencoded`: an object; `name[]` keys collect
///   arrays and dotted keys nest (`user.name=x` → `{"user":{"name":"x"}}`)
/// - anything else, including `multipart/form-data`: `None`
pub fn parse_body(headers: &HeaderMap, body: &[u8]) -> Option<JsonValue> {
    match content_type(headers)?.as_str() {
        "application/json" => serde_json::from_slice(body).ok(),
        "application/x-www-form-urlencoded" => Some(form_to_json(body)),
        _ => None,
    }
}

/// Decodes `application/x-www-form-urlencoded` into a JSON object.
pub fn form_to_json(body: &[u8]) -> JsonValue {
    let mut root = JsonValue::Object(Map::new());
    for (key, value) in form_urlencoded::parse(body) {
        insert_form_value(&mut root, &key, JsonValue::String(value.into_owned()));
    }
    root
}

fn insert_form_value(root: &mut JsonValue, name: &str, value: JsonValue) {
    let keys: Vec<&str> = name.split('.').collect();
    let mut node = root;

    for (index, key) in keys.iter().enumerate() {
        let last = index == keys.len() - 1;

        if let Some(array_key) = key.strip_suffix("[]") {
            let slot = child(node, array_key, || JsonValue::Array(Vec::new()));
            if !slot.is_array() {
                *slot = JsonValue::Array(Vec::new());
            }
            if let JsonValue::Array(items) = slot {
                items.push(value);
            }
            return;
        }

        if last {
            *child(node, key, || JsonValue::Null) = value;
            return;
        }

        let next_is_index = keys[index + 1].parse::<usize>().is_ok();
        node = child(node, key, || {
            if next_is_index {
                JsonValue::Array(Vec::new())
            } else {
                JsonValue::Object(Map::new())
            }
        });
    }
}

/// Returns the child slot for `key`, creating it with `init` when missing.
/// Numeric keys index into arrays, growing them with nulls.
fn child<'a>(node: &'a mut JsonValue, key: &str, init: impl FnOnce() -> JsonValue) -> &'a mut JsonValue {
    match node {
        JsonValue::Array(items) => {
            let index = key.parse::<usize>().unwrap_or(items.len());
            if items.len() <= index {
                items.resize(index + 1, JsonValue::Null);
            }
            if items[index].is_null() {
                items[index] = init();
            }
            &mut items[index]
        }
        _ => {
            if !node.is_object() {
                *node = JsonValue::Object(Map::new());
            }
            let slot = &mut node[key];
            if slot.is_null() {
                *slot = init();
            }
            slot
        }
    }
}

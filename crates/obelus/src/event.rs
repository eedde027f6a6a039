// File: src/event.rs
// Purpose: Per-request state machine driving the handler chain

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::http::{HeaderMap, Method, StatusCode};
use futures::future::BoxFuture;
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use url::Url;

use crate::config::Mode;
use crate::cookie::{CookieOptions, Cookies};
use crate::error::{HandlerResult, Interrupt, ResponseError, ServerError};
use crate::module::{Fail, RequestHandler};
use crate::request::{self, AbortSignal, ServerRequest};
use crate::response::{Response, ResponseBody, ResponseWriter};

/// Shared-map key under which the matched route name is recorded.
pub const ROUTE_NAME_KEY: &str = "@routeName";

/// Cursor value once the chain can no longer advance.
const CURSOR_DONE: usize = usize::MAX;

static DOUBLE_SLASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^:])/{2,}").expect("double slash regex is valid"));

/// One in-flight request.
///
/// Owned by the dispatch loop for the lifetime of the request. Handlers get
/// it by mutable reference, one at a time; loaders get it shared.
pub struct RequestEvent {
    method: Method,
    url: Url,
    request_headers: HeaderMap,
    body: Bytes,
    parsed_body: OnceCell<Option<JsonValue>>,
    platform: JsonValue,
    abort: AbortSignal,
    params: HashMap<String, String>,

    status: StatusCode,
    headers: HeaderMap,
    cookies: Cookies,
    shared: HashMap<String, JsonValue>,

    handlers: Arc<[Arc<dyn RequestHandler>]>,
    cursor: usize,
    exited: bool,
    response_tx: Option<oneshot::Sender<Response>>,

    mode: Mode,
    is_data: bool,
    pub(crate) loader_values: BTreeMap<String, JsonValue>,
    pub(crate) action_result: Option<(String, JsonValue)>,
    pub(crate) data_redirect: Option<String>,
}

impl RequestEvent {
    pub(crate) fn new(
        request: ServerRequest,
        params: HashMap<String, String>,
        handlers: Arc<[Arc<dyn RequestHandler>]>,
        mode: Mode,
        is_data: bool,
        response_tx: oneshot::Sender<Response>,
    ) -> Self {
        let cookies = Cookies::from_headers(&request.headers);
        Self {
            method: request.method,
            url: request.url,
            request_headers: request.headers,
            body: request.body,
            parsed_body: OnceCell::new(),
            platform: request.platform,
            abort: request.abort,
            params,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            cookies,
            shared: HashMap::new(),
            handlers,
            cursor: 0,
            exited: false,
            response_tx: Some(response_tx),
            mode,
            is_data,
            loader_values: BTreeMap::new(),
            action_result: None,
            data_redirect: None,
        }
    }

    // ------------------------------------------------------------------------
    // Chain control
    // ------------------------------------------------------------------------

    /// Runs every remaining handler in order.
    ///
    /// A handler that calls `next` observes the outcome of the rest of the
    /// chain; when it returns, the chain is finished. Stops at the first
    /// interrupt or once [`exit`](Self::exit) was called.
    pub fn next(&mut self) -> BoxFuture<'_, HandlerResult> {
        Box::pin(async move {
            while self.cursor < self.handlers.len() {
                let handler = Arc::clone(&self.handlers[self.cursor]);
                self.cursor += 1;
                handler.handle(self).await?;
            }
            self.cursor = CURSOR_DONE;
            Ok(())
        })
    }

    /// Skips every remaining handler.
    pub fn exit(&mut self) {
        self.exited = true;
        self.cursor = CURSOR_DONE;
    }

    pub fn is_exited(&self) -> bool {
        self.exited
    }

    pub fn headers_sent(&self) -> bool {
        self.response_tx.is_none()
    }

    // ------------------------------------------------------------------------
    // Request
    // ------------------------------------------------------------------------

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn pathname(&self) -> &str {
        self.url.path()
    }

    pub fn request_headers(&self) -> &HeaderMap {
        &self.request_headers
    }

    /// A request header as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request_headers
            .get(name)
            .and_then(|value| value.to_str().ok())
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// First value of a query parameter, decoded.
    pub fn query(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The body parsed by content type, parsed once per request.
    pub fn parse_body(&self) -> Option<&JsonValue> {
        self.parsed_body
            .get_or_init(|| request::parse_body(&self.request_headers, &self.body))
            .as_ref()
    }

    /// Value of an incoming cookie.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name)
    }

    pub fn platform(&self) -> &JsonValue {
        &self.platform
    }

    pub fn abort_signal(&self) -> &AbortSignal {
        &self.abort
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether this is an internal data-protocol request.
    pub fn is_data_request(&self) -> bool {
        self.is_data
    }

    /// Name of the matched route, once recorded.
    pub fn route_name(&self) -> Option<&str> {
        self.shared.get(ROUTE_NAME_KEY).and_then(JsonValue::as_str)
    }

    /// Whether the client accepts an HTML response.
    pub fn accepts_html(&self) -> bool {
        match self.header("accept") {
            Some(accept) => accept.contains("text/html"),
            None => true,
        }
    }

    // ------------------------------------------------------------------------
    // Shared map & loader data
    // ------------------------------------------------------------------------

    pub fn shared_map(&self) -> &HashMap<String, JsonValue> {
        &self.shared
    }

    pub fn shared_map_mut(&mut self) -> &mut HashMap<String, JsonValue> {
        &mut self.shared
    }

    /// Settled value of a loader that already ran.
    pub fn loader_value(&self, id: &str) -> Option<&JsonValue> {
        self.loader_values.get(id)
    }

    pub fn loader_values(&self) -> &BTreeMap<String, JsonValue> {
        &self.loader_values
    }

    /// Id and settled value of the action run by this request.
    pub fn action_result(&self) -> Option<(&str, &JsonValue)> {
        self.action_result
            .as_ref()
            .map(|(id, value)| (id.as_str(), value))
    }

    // ------------------------------------------------------------------------
    // Response state
    // ------------------------------------------------------------------------

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> Result<(), ResponseError> {
        self.ensure_unsent()?;
        self.status = status;
        Ok(())
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), ResponseError> {
        self.ensure_unsent()?;
        let (name, value) = header_pair(name, value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn append_header(&mut self, name: &str, value: &str) -> Result<(), ResponseError> {
        self.ensure_unsent()?;
        let (name, value) = header_pair(name, value)?;
        self.headers.append(name, value);
        Ok(())
    }

    pub fn remove_header(&mut self, name: &str) -> Result<(), ResponseError> {
        self.ensure_unsent()?;
        self.headers.remove(name);
        Ok(())
    }

    /// Sets `Cache-Control`, e.g. `"public, max-age=300"`.
    pub fn cache_control(&mut self, value: &str) -> Result<(), ResponseError> {
        self.set_header(header::CACHE_CONTROL.as_str(), value)
    }

    pub fn set_cookie(&mut self, name: &str, value: &str, options: &CookieOptions) -> Result<(), ResponseError> {
        self.ensure_unsent()?;
        self.cookies.set(name, value, options);
        Ok(())
    }

    pub fn delete_cookie(&mut self, name: &str, options: &CookieOptions) -> Result<(), ResponseError> {
        self.ensure_unsent()?;
        self.cookies.delete(name, options);
        Ok(())
    }

    fn ensure_unsent(&self) -> Result<(), ResponseError> {
        if self.headers_sent() {
            return Err(ResponseError::HeadersSent);
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Terminal operations
    // ------------------------------------------------------------------------

    /// Commits the response head and returns the body writer.
    ///
    /// Legal once per request; later calls fail with
    /// [`ResponseError::HeadersSent`].
    pub fn write_response(&mut self) -> Result<ResponseWriter, ResponseError> {
        self.ensure_unsent()?;

        let mut headers = self.headers.clone();
        for cookie in self.cookies.set_cookie_headers() {
            let value = HeaderValue::from_str(cookie).map_err(|err| ResponseError::InvalidHeader {
                name: header::SET_COOKIE.to_string(),
                reason: err.to_string(),
            })?;
            headers.append(header::SET_COOKIE, value);
        }

        let (writer, body) = ResponseBody::channel();
        let response = Response {
            status: self.status,
            headers,
            body,
        };
        if let Some(tx) = self.response_tx.take() {
            if tx.send(response).is_err() {
                debug!(path = %self.url.path(), "response receiver dropped before headers were sent");
            }
        }
        Ok(writer)
    }

    /// Writes a complete response and ends the chain.
    pub fn send(&mut self, status: StatusCode, body: impl Into<Bytes>) -> Result<(), ResponseError> {
        self.set_status(status)?;
        let writer = self.write_response()?;
        match writer.write(body) {
            Ok(()) | Err(ResponseError::Closed) => {}
            Err(err) => return Err(err),
        }
        self.exit();
        Ok(())
    }

    pub fn json<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) -> Result<(), ResponseError> {
        let body = serde_json::to_vec(value)?;
        self.set_header(header::CONTENT_TYPE.as_str(), "application/json; charset=utf-8")?;
        self.send(status, body)
    }

    pub fn html(&mut self, status: StatusCode, html: impl Into<String>) -> Result<(), ResponseError> {
        self.set_header(header::CONTENT_TYPE.as_str(), "text/html; charset=utf-8")?;
        self.send(status, html.into())
    }

    pub fn text(&mut self, status: StatusCode, text: impl Into<String>) -> Result<(), ResponseError> {
        self.set_header(header::CONTENT_TYPE.as_str(), "text/plain; charset=utf-8")?;
        self.send(status, text.into())
    }

    /// Applies a redirect and returns the interrupt to propagate:
    ///
    /// ```ignore
    /// return Err(ev.redirect(StatusCode::FOUND, "/sign-in/"));
    /// ```
    ///
    /// Temporary redirects get `Cache-Control: no-store` unless a cache
    /// policy was set.
    pub fn redirect(&mut self, status: StatusCode, location: &str) -> Interrupt {
        if let Err(err) = self.apply_redirect(status, location) {
            return err.into();
        }
        Interrupt::redirect(status, self.location().unwrap_or(location))
    }

    fn apply_redirect(&mut self, status: StatusCode, location: &str) -> Result<(), ResponseError> {
        self.ensure_unsent()?;
        if !status.is_redirection() {
            return Err(ResponseError::InvalidHeader {
                name: header::LOCATION.to_string(),
                reason: format!("{} is not a redirect status", status),
            });
        }

        let fixed = DOUBLE_SLASH.replace_all(location, "$1/");
        if fixed != location {
            warn!(location, fixed = %fixed, "redirect target contains doubled slashes");
        }
        self.set_header(header::LOCATION.as_str(), &fixed)?;
        self.status = status;

        let temporary = matches!(
            status,
            StatusCode::FOUND | StatusCode::SEE_OTHER | StatusCode::TEMPORARY_REDIRECT
        );
        if temporary && !self.headers.contains_key(header::CACHE_CONTROL) {
            self.headers
                .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        }

        self.exit();
        Ok(())
    }

    fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    /// Sets the status and returns a typed server error to propagate.
    pub fn error(&mut self, status: StatusCode, data: impl Into<JsonValue>) -> Interrupt {
        if !self.headers_sent() {
            self.status = status;
        }
        Interrupt::Error(ServerError::new(status, data))
    }

    /// Sets the status and returns a typed failure for a loader or action.
    pub fn fail(&mut self, status: StatusCode, data: impl Into<JsonValue>) -> Fail {
        if !self.headers_sent() {
            self.status = status;
        }
        Fail::new(status, data)
    }

    /// Status-only mutation used where a `ResponseError` cannot surface.
    pub(crate) fn force_status(&mut self, status: StatusCode) {
        if !self.headers_sent() {
            self.status = status;
        }
    }
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), ResponseError> {
    let invalid = |reason: String| ResponseError::InvalidHeader {
        name: name.to_string(),
        reason,
    };
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| invalid(err.to_string()))?;
    let header_value = HeaderValue::from_str(value).map_err(|err| invalid(err.to_string()))?;
    Ok((header_name, header_value))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::module::handler_fn;
    use std::sync::Mutex;

    pub(crate) fn event_with(
        method: Method,
        url: &str,
        handlers: Vec<Arc<dyn RequestHandler>>,
    ) -> (RequestEvent, oneshot::Receiver<Response>) {
        let (tx, rx) = oneshot::channel();
        let request = ServerRequest::new(method, Url::parse(url).unwrap());
        let event = RequestEvent::new(
            request,
            HashMap::new(),
            handlers.into(),
            Mode::Production,
            false,
            tx,
        );
        (event, rx)
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Arc<dyn RequestHandler> {
        let log = Arc::clone(log);
        handler_fn(move |_ev| {
            let log = Arc::clone(&log);
            Box::pin(async move {
                log.lock().unwrap().push(name);
                Ok(())
            })
        })
    }

    #[tokio::test]
    async fn test_write_response_at_most_once() {
        let (mut ev, rx) = event_with(Method::GET, "http://localhost/", vec![]);
        let writer = ev.write_response().unwrap();
        writer.write("ok").unwrap();
        drop(writer);

        assert!(ev.headers_sent());
        assert!(matches!(ev.write_response(), Err(ResponseError::HeadersSent)));
        assert!(matches!(
            ev.set_status(StatusCode::CREATED),
            Err(ResponseError::HeadersSent)
        ));

        let response = rx.await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.text().await, "ok");
    }

    #[tokio::test]
    async fn test_next_runs_in_order_and_exit_stops() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stop = handler_fn(|ev| {
            Box::pin(async move {
                ev.exit();
                Ok(())
            })
        });
        let handlers = vec![recorder(&log, "plugin"), recorder(&log, "layout"), stop, recorder(&log, "page")];
        let (mut ev, _rx) = event_with(Method::GET, "http://localhost/", handlers);

        ev.next().await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["plugin", "layout"]);
        assert!(ev.is_exited());
    }

    #[tokio::test]
    async fn test_nested_next_sees_rest_of_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let wrapper_log = Arc::clone(&log);
        let wrapper = handler_fn(move |ev| {
            let log = Arc::clone(&wrapper_log);
            Box::pin(async move {
                log.lock().unwrap().push("before");
                ev.next().await?;
                log.lock().unwrap().push("after");
                Ok(())
            })
        });
        let handlers = vec![wrapper, recorder(&log, "inner")];
        let (mut ev, _rx) = event_with(Method::GET, "http://localhost/", handlers);

        ev.next().await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["before", "inner", "after"]);
        assert!(!ev.is_exited());
    }

    #[tokio::test]
    async fn test_redirect_sets_location_and_cache_control() {
        let (mut ev, _rx) = event_with(Method::GET, "http://localhost/", vec![]);
        let interrupt = ev.redirect(StatusCode::FOUND, "/a//b/");

        match interrupt {
            Interrupt::Redirect(message) => assert_eq!(message.location, "/a/b/"),
            other => panic!("expected redirect, got {other:?}"),
        }
        assert_eq!(ev.status(), StatusCode::FOUND);
        assert_eq!(ev.headers()[header::CACHE_CONTROL], "no-store");
        assert!(ev.is_exited());
    }

    #[tokio::test]
    async fn test_redirect_keeps_explicit_cache_policy() {
        let (mut ev, _rx) = event_with(Method::GET, "http://localhost/", vec![]);
        ev.cache_control("max-age=60").unwrap();
        let _ = ev.redirect(StatusCode::TEMPORARY_REDIRECT, "https://example.com//x");

        assert_eq!(ev.headers()[header::CACHE_CONTROL], "max-age=60");
        assert_eq!(ev.headers()[header::LOCATION], "https://example.com/x");
    }

    #[tokio::test]
    async fn test_permanent_redirect_has_no_cache_control() {
        let (mut ev, _rx) = event_with(Method::GET, "http://localhost/", vec![]);
        let _ = ev.redirect(StatusCode::MOVED_PERMANENTLY, "/new/");
        assert!(!ev.headers().contains_key(header::CACHE_CONTROL));
    }

    #[tokio::test]
    async fn test_redirect_after_headers_sent_is_unhandled() {
        let (mut ev, _rx) = event_with(Method::GET, "http://localhost/", vec![]);
        ev.text(StatusCode::OK, "done").unwrap();
        assert!(matches!(
            ev.redirect(StatusCode::FOUND, "/"),
            Interrupt::Unhandled(_)
        ));
    }

    #[tokio::test]
    async fn test_cookies_become_set_cookie_headers() {
        let (mut ev, rx) = event_with(Method::GET, "http://localhost/", vec![]);
        ev.set_cookie("theme", "dark", &CookieOptions::new().path("/")).unwrap();
        ev.json(StatusCode::OK, &serde_json::json!({"ok": true})).unwrap();

        let response = rx.await.unwrap();
        assert_eq!(response.header("set-cookie"), Some("theme=dark; Path=/"));
        assert_eq!(response.header("content-type"), Some("application/json; charset=utf-8"));
        assert_eq!(response.text().await, r#"{"ok":true}"#);
    }

    #[test]
    fn test_query_and_accept() {
        let (tx, _rx) = oneshot::channel();
        let request = ServerRequest::new(Method::GET, Url::parse("http://localhost/?q=a%20b").unwrap())
            .with_header(header::ACCEPT, "application/json");
        let handlers: Arc<[Arc<dyn RequestHandler>]> = Arc::from(Vec::new());
        let ev = RequestEvent::new(request, HashMap::new(), handlers, Mode::Dev, false, tx);

        assert_eq!(ev.query("q").as_deref(), Some("a b"));
        assert_eq!(ev.query("missing"), None);
        assert!(!ev.accepts_html());
    }
}

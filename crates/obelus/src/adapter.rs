// File: src/adapter.rs
// Purpose: Serves the dispatcher through axum

use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tracing::error;
use url::Url;

use crate::dispatch::Dispatcher;
use crate::request::ServerRequest;

/// Request bodies above this size are rejected with 413.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// An `axum::Router` that feeds every request through the dispatcher.
/// Requests no route or plugin handles get a plain 404.
pub fn router(dispatcher: Dispatcher) -> Router {
    Router::new()
        .fallback(dispatch_request)
        .with_state(dispatcher)
}

async fn dispatch_request(State(dispatcher): State<Dispatcher>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(_) => return (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large").into_response(),
    };
    let url = match request_url(&parts) {
        Ok(url) => url,
        Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    };

    let mut server_request = ServerRequest::new(parts.method, url).with_body(body);
    server_request.headers = parts.headers;

    let mut dispatch = match dispatcher.handle(server_request).await {
        Ok(Some(dispatch)) => dispatch,
        Ok(None) => return not_found(),
        Err(err) => {
            error!(error = ?err, "failed to start request");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
        }
    };

    let response = dispatch.response().await;
    tokio::spawn(async move {
        if let Err(err) = dispatch.completion().await {
            error!(error = ?err, "request failed");
        }
    });

    match response {
        Some(response) => response.into_response(),
        None => not_found(),
    }
}

/// Absolute URL of the request, from the `Host` header.
fn request_url(parts: &Parts) -> Result<Url, url::ParseError> {
    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| parts.uri.authority().map(|authority| authority.as_str()))
        .unwrap_or("localhost");
    let scheme = parts
        .headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .or_else(|| parts.uri.scheme_str())
        .unwrap_or("http");
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    Url::parse(&format!("{scheme}://{host}{path}"))
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

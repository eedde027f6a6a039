// File: src/error.rs
// Purpose: Typed errors and the control-flow outcome of request handlers

use std::fmt;

use axum::http::StatusCode;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Result returned by every handler in the chain.
pub type HandlerResult = Result<(), Interrupt>;

/// Errors from misusing the response state of a request.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// The response head was already written; it can be written only once.
    #[error("response headers were already sent")]
    HeadersSent,

    #[error("invalid header `{name}`: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("failed to serialize response body: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The client went away while the body was being streamed.
    #[error("response stream was closed")]
    Closed,
}

/// A typed server error: a status code plus a JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerError {
    pub status: StatusCode,
    pub data: JsonValue,
}

impl ServerError {
    pub fn new(status: StatusCode, data: impl Into<JsonValue>) -> Self {
        Self {
            status,
            data: data.into(),
        }
    }

    /// Human readable message: the payload itself when it is a string,
    /// otherwise its `message` field, otherwise the status reason.
    pub fn message(&self) -> String {
        match &self.data {
            JsonValue::String(message) => message.clone(),
            JsonValue::Object(map) => match map.get("message") {
                Some(JsonValue::String(message)) => message.clone(),
                _ => self.reason(),
            },
            _ => self.reason(),
        }
    }

    fn reason(&self) -> String {
        self.status
            .canonical_reason()
            .unwrap_or("Server Error")
            .to_string()
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message())
    }
}

impl std::error::Error for ServerError {}

/// A redirect raised by a handler. The event has usually applied it already;
/// loaders, which only see the event immutably, raise it unapplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectMessage {
    pub status: StatusCode,
    pub location: String,
}

/// Why the handler chain stopped early.
#[derive(Debug, Error)]
pub enum Interrupt {
    #[error("redirect to {}", .0.location)]
    Redirect(RedirectMessage),

    /// The request was deliberately abandoned. The remaining handlers are
    /// skipped and, unless a response is already out, the head is written
    /// with whatever status and headers were set so far.
    #[error("request aborted")]
    Abort,

    #[error(transparent)]
    Error(#[from] ServerError),

    #[error(transparent)]
    Unhandled(#[from] anyhow::Error),
}

impl Interrupt {
    /// An unapplied redirect, for code without mutable access to the event.
    pub fn redirect(status: StatusCode, location: impl Into<String>) -> Self {
        Interrupt::Redirect(RedirectMessage {
            status,
            location: location.into(),
        })
    }
}

impl From<ResponseError> for Interrupt {
    fn from(err: ResponseError) -> Self {
        Interrupt::Unhandled(err.into())
    }
}

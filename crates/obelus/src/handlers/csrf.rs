use async_trait::async_trait;
use axum::http::StatusCode;
use tracing::warn;

use crate::error::HandlerResult;
use crate::event::RequestEvent;
use crate::module::RequestHandler;
use crate::request::content_type;

/// Content types a browser can submit cross-site without a preflight.
const FORM_CONTENT_TYPES: [&str; 3] = [
    "application/x-www-form-urlencoded",
    "multipart/form-data",
    "text/plain",
];

/// Rejects cross-origin form submissions with 403.
///
/// Added to the chain for mutating methods only. JSON and other bodies are
/// left alone since browsers cannot send them cross-site without CORS.
pub struct CsrfGuard {
    pub dev: bool,
}

#[async_trait]
impl RequestHandler for CsrfGuard {
    async fn handle(&self, ev: &mut RequestEvent) -> HandlerResult {
        let is_form = content_type(ev.request_headers())
            .map(|ct| FORM_CONTENT_TYPES.contains(&ct.as_str()))
            .unwrap_or(false);
        if !is_form {
            return Ok(());
        }

        let origin = ev.url().origin().ascii_serialization();
        let input_origin = ev.header("origin").map(str::to_string);
        if is_allowed(input_origin.as_deref(), &origin, self.dev) {
            return Ok(());
        }

        warn!(
            method = %ev.method(),
            origin = input_origin.as_deref().unwrap_or("<none>"),
            expected = %origin,
            "rejected cross-site form submission"
        );
        let message = format!(
            "CSRF check failed. Cross-site {} form submissions are forbidden",
            ev.method()
        );
        Err(ev.error(StatusCode::FORBIDDEN, message))
    }
}

fn is_allowed(input_origin: Option<&str>, origin: &str, dev: bool) -> bool {
    let Some(input_origin) = input_origin else {
        return false;
    };
    if input_origin == origin {
        return true;
    }
    dev && is_localhost(input_origin) && is_localhost(origin)
}

fn is_localhost(origin: &str) -> bool {
    origin.starts_with("http://localhost:") || origin.starts_with("http://127.0.0.1:")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("https://shop.test"), "https://shop.test", false, true)]
    #[case(Some("https://evil.test"), "https://shop.test", false, false)]
    #[case(None, "https://shop.test", false, false)]
    #[case(Some("http://localhost:5173"), "http://localhost:3000", true, true)]
    #[case(Some("http://localhost:5173"), "http://localhost:3000", false, false)]
    #[case(Some("http://evil.test"), "http://localhost:3000", true, false)]
    fn test_origin_policy(
        #[case] input: Option<&str>,
        #[case] origin: &str,
        #[case] dev: bool,
        #[case] allowed: bool,
    ) {
        assert_eq!(is_allowed(input, origin, dev), allowed);
    }
}

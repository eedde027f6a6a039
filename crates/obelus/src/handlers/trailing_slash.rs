use async_trait::async_trait;
use axum::http::StatusCode;
use obelus_router::is_file_like;

use crate::error::HandlerResult;
use crate::event::RequestEvent;
use crate::module::RequestHandler;

/// Redirects page requests (301) so the pathname follows the trailing-slash
/// policy. Data requests and the root are left alone; file-like pathnames
/// (`/feed.xml`) always drop the trailing slash.
pub struct TrailingSlash {
    pub trailing_slash: bool,
}

#[async_trait]
impl RequestHandler for TrailingSlash {
    async fn handle(&self, ev: &mut RequestEvent) -> HandlerResult {
        if ev.is_data_request() {
            return Ok(());
        }
        match fixed_pathname(ev.pathname(), self.trailing_slash) {
            Some(pathname) => {
                let location = match ev.url().query() {
                    Some(query) => format!("{pathname}?{query}"),
                    None => pathname,
                };
                Err(ev.redirect(StatusCode::MOVED_PERMANENTLY, &location))
            }
            None => Ok(()),
        }
    }
}

/// The corrected pathname, or `None` when it already follows the policy.
fn fixed_pathname(pathname: &str, trailing_slash: bool) -> Option<String> {
    if pathname == "/" {
        return None;
    }
    if is_file_like(pathname) {
        return pathname
            .ends_with('/')
            .then(|| pathname.trim_end_matches('/').to_string());
    }
    match (trailing_slash, pathname.ends_with('/')) {
        (true, false) => Some(format!("{pathname}/")),
        (false, true) => Some(pathname.trim_end_matches('/').to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/blog", true, Some("/blog/"))]
    #[case("/blog/", true, None)]
    #[case("/blog/", false, Some("/blog"))]
    #[case("/blog", false, None)]
    #[case("/", true, None)]
    #[case("/", false, None)]
    #[case("/legacy/page.html", true, None)]
    #[case("/feed.xml", true, None)]
    #[case("/feed.xml", false, None)]
    #[case("/feed.xml/", true, Some("/feed.xml"))]
    fn test_fixed_pathname(#[case] pathname: &str, #[case] trailing: bool, #[case] expected: Option<&str>) {
        assert_eq!(fixed_pathname(pathname, trailing).as_deref(), expected);
    }
}

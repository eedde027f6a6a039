// File: src/cookie.rs
// Purpose: Request cookie parsing and Set-Cookie serialization

use axum::http::{header, HeaderMap};
use std::collections::{BTreeMap, HashMap};

/// `SameSite` attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// Attributes of an outgoing cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieOptions {
    pub path: Option<String>,
    pub domain: Option<String>,
    /// Seconds.
    pub max_age: Option<i64>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: Option<SameSite>,
}

impl CookieOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }
}

/// Cookies of one request: the incoming values plus pending `Set-Cookie`s.
#[derive(Debug, Clone, Default)]
pub struct Cookies {
    incoming: HashMap<String, String>,
    outgoing: BTreeMap<String, String>,
}

impl Cookies {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            incoming: parse_cookies(headers),
            outgoing: BTreeMap::new(),
        }
    }

    /// Value of an incoming cookie.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.incoming.get(name).map(String::as_str)
    }

    pub fn has(&self, name: &str) -> bool {
        self.incoming.contains_key(name)
    }

    pub fn set(&mut self, name: &str, value: &str, options: &CookieOptions) {
        self.outgoing
            .insert(name.to_string(), serialize_cookie(name, value, options));
    }

    /// Expires a cookie on the client.
    pub fn delete(&mut self, name: &str, options: &CookieOptions) {
        let expired = CookieOptions {
            max_age: Some(0),
            ..options.clone()
        };
        self.outgoing
            .insert(name.to_string(), serialize_cookie(name, "deleted", &expired));
    }

    /// Serialized `Set-Cookie` header values, one per cookie name.
    pub fn set_cookie_headers(&self) -> impl Iterator<Item = &str> {
        self.outgoing.values().map(String::as_str)
    }
}

/// Parse cookies from the Cookie header
pub fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    let mut cookies = HashMap::new();

    for cookie_header in headers.get_all(header::COOKIE) {
        let Ok(cookie_str) = cookie_header.to_str() else {
            continue;
        };
        for cookie in cookie_str.split(';') {
            if let Some((key, value)) = cookie.trim().split_once('=') {
                let value = urlencoding::decode(value)
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| value.to_string());
                cookies.entry(key.to_string()).or_insert(value);
            }
        }
    }

    cookies
}

fn serialize_cookie(name: &str, value: &str, options: &CookieOptions) -> String {
    let mut cookie = format!("{}={}", name, urlencoding::encode(value));

    if let Some(domain) = &options.domain {
        cookie.push_str(&format!("; Domain={domain}"));
    }
    if let Some(path) = &options.path {
        cookie.push_str(&format!("; Path={path}"));
    }
    if let Some(max_age) = options.max_age {
        cookie.push_str(&format!("; Max-Age={max_age}"));
    }
    if let Some(same_site) = options.same_site {
        cookie.push_str(match same_site {
            SameSite::Strict => "; SameSite=Strict",
            SameSite::Lax => "; SameSite=Lax",
            SameSite::None => "; SameSite=None",
        });
    }
    if options.secure {
        cookie.push_str("; Secure");
    }
    if options.http_only {
        cookie.push_str("; HttpOnly");
    }
    cookie
}

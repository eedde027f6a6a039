//! Route pattern compilation.
//!
//! Turns a route id such as `/blog/[slug]` into an anchored regular expression
//! plus the ordered parameter names and type tags its capture groups map to.
//! Every function here is pure: the same id always yields the same pattern, so
//! build-time validation and request-time matching agree.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PatternError;

/// A whole segment rest token: `[...name]` or `[...name=type]`.
static REST_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[\.\.\.(\w+)(?:=(\w+))?\]$").expect("rest segment regex is valid")
});

/// The inside of a bracketed token: `name`, `name=type`, `...name`, `...name=type`.
static PARAM_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\.\.\.)?(\w+)(?:=(\w+))?$").expect("param token regex is valid")
});

/// Characters left untouched when a literal is percent-encoded. Mirrors the
/// set browsers leave alone in a path, minus `#` and `?`.
const LITERAL_SAFE: &str = ";,/:@&=+$-_.!~*'()";

/// Compiled form of a route id.
///
/// Invariant: `param_names.len() == param_types.len()` and both equal the
/// number of capture groups in the regex, in capture order.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    regex: Regex,
    param_names: Vec<String>,
    param_types: Vec<Option<String>>,
    source: String,
}

impl RoutePattern {
    /// The compiled, anchored regex.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Regex source text, e.g. `^/blog/([^/]+?)/?$`.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// The route id this pattern was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn param_types(&self) -> &[Option<String>] {
        &self.param_types
    }

    /// Iterates `(name, type)` pairs in capture order.
    pub fn params(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.param_names
            .iter()
            .zip(&self.param_types)
            .map(|(name, ty)| (name.as_str(), ty.as_deref()))
    }

    pub fn is_match(&self, pathname: &str) -> bool {
        self.regex.is_match(pathname)
    }

    /// Runs the regex and returns one decoded value per parameter, in
    /// declaration order. Groups that did not participate yield `""`.
    ///
    /// # Examples
    ///
    /// ```
    /// use obelus_router::compile_pattern;
    ///
    /// let pattern = compile_pattern("/[...catchall]").unwrap();
    /// assert_eq!(pattern.exec("/a/b/c"), Some(vec!["a/b/c".to_string()]));
    /// assert_eq!(pattern.exec("/"), Some(vec![String::new()]));
    /// ```
    pub fn exec(&self, pathname: &str) -> Option<Vec<String>> {
        let captures = self.regex.captures(pathname)?;
        let values = (1..captures.len())
            .map(|index| {
                captures
                    .get(index)
                    .map(|m| decode_param(m.as_str()))
                    .unwrap_or_default()
            })
            .collect();
        Some(values)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.regex.as_str())
    }
}

/// How a single pathname segment participates in matching.
///
/// Ordered by specificity: the derived `Ord` is used to sort routes so a
/// more specific segment is tried before a looser one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SegmentKind {
    /// Plain text: `about`
    Static,
    /// Text mixed with parameters: `post-[id]`, `[slug].json`
    Dynamic,
    /// A single parameter occupying the whole segment: `[id]`
    Param,
    /// A whole-segment rest parameter: `[...path]`
    Rest,
}

/// Classifies one pathname segment.
///
/// ```
/// use obelus_router::{classify_segment, SegmentKind};
///
/// assert_eq!(classify_segment("about"), SegmentKind::Static);
/// assert_eq!(classify_segment("[id]"), SegmentKind::Param);
/// assert_eq!(classify_segment("[slug].json"), SegmentKind::Dynamic);
/// assert_eq!(classify_segment("[...rest]"), SegmentKind::Rest);
/// ```
pub fn classify_segment(segment: &str) -> SegmentKind {
    if REST_SEGMENT.is_match(segment) {
        return SegmentKind::Rest;
    }
    match split_segment(segment) {
        Ok(parts) => {
            let params = parts
                .iter()
                .filter(|part| matches!(part, SegmentPart::Token(_)))
                .count();
            match (params, parts.len()) {
                (0, _) => SegmentKind::Static,
                (1, 1) => SegmentKind::Param,
                _ => SegmentKind::Dynamic,
            }
        }
        Err(_) => SegmentKind::Static,
    }
}

/// Compiles a route id into a [`RoutePattern`].
///
/// Rules, applied per `/`-separated segment:
/// - `[...name]` alone in a segment becomes `(?:/(.*))?`, so it also matches
///   nothing at all.
/// - `[name]` becomes `([^/]+?)`; a `[...name]` embedded in other text
///   becomes `(.*?)`.
/// - Literal text is percent-encoded the way a request path would carry it,
///   then regex-escaped.
///
/// A trailing `/?` is allowed unless the last segment's literal text has a
/// `.` in it (`sitemap.xml`, `[id].json`). The root id compiles to `^/$`.
///
/// # Examples
///
/// ```
/// use obelus_router::compile_pattern;
///
/// let pattern = compile_pattern("/blog/[slug]").unwrap();
/// assert_eq!(pattern.as_str(), "^/blog/([^/]+?)/?$");
/// assert_eq!(pattern.param_names(), ["slug".to_string()]);
///
/// let root = compile_pattern("/").unwrap();
/// assert_eq!(root.as_str(), "^/$");
/// ```
pub fn compile_pattern(id: &str) -> Result<RoutePattern, PatternError> {
    let segments: Vec<&str> = id.split('/').filter(|s| !s.is_empty()).collect();

    if segments.is_empty() {
        return Ok(RoutePattern {
            regex: Regex::new("^/$").map_err(|e| PatternError::Regex(e.to_string()))?,
            param_names: Vec::new(),
            param_types: Vec::new(),
            source: id.to_string(),
        });
    }

    let mut source = String::from("^");
    let mut param_names: Vec<String> = Vec::new();
    let mut param_types: Vec<Option<String>> = Vec::new();
    let mut seen = HashSet::new();

    let mut declare = |name: &str, ty: Option<&str>| -> Result<(), PatternError> {
        if !seen.insert(name.to_string()) {
            return Err(PatternError::DuplicateParam {
                name: name.to_string(),
            });
        }
        param_names.push(name.to_string());
        param_types.push(ty.map(str::to_string));
        Ok(())
    };

    for segment in &segments {
        if let Some(caps) = REST_SEGMENT.captures(segment) {
            declare(&caps[1], caps.get(2).map(|m| m.as_str()))?;
            source.push_str("(?:/(.*))?");
            continue;
        }

        source.push('/');
        for part in split_segment(segment)? {
            match part {
                SegmentPart::Literal(text) => {
                    source.push_str(&regex::escape(&encode_literal(text)));
                }
                SegmentPart::Token(token) => {
                    let caps =
                        PARAM_TOKEN
                            .captures(token)
                            .ok_or_else(|| PatternError::InvalidParam {
                                segment: segment.to_string(),
                                token: token.to_string(),
                            })?;
                    declare(&caps[2], caps.get(3).map(|m| m.as_str()))?;
                    source.push_str(if caps.get(1).is_some() {
                        "(.*?)"
                    } else {
                        "([^/]+?)"
                    });
                }
            }
        }
    }

    let last_has_extension = segments
        .last()
        .map(|segment| has_extension(segment))
        .unwrap_or(false);
    if !last_has_extension {
        source.push_str("/?");
    }
    source.push('$');

    let regex = Regex::new(&source).map_err(|e| PatternError::Regex(e.to_string()))?;

    let captures = regex.captures_len() - 1;
    if captures != param_names.len() {
        return Err(PatternError::CaptureMismatch {
            pattern: source,
            captures,
            params: param_names.len(),
        });
    }

    Ok(RoutePattern {
        regex,
        param_names,
        param_types,
        source: id.to_string(),
    })
}

/// Whether a segment's literal text contains a `.`, marking a file-like
/// pathname that takes no trailing slash.
pub(crate) fn has_extension(segment: &str) -> bool {
    if REST_SEGMENT.is_match(segment) {
        return false;
    }
    split_segment(segment)
        .map(|parts| {
            parts
                .iter()
                .any(|part| matches!(part, SegmentPart::Literal(text) if text.contains('.')))
        })
        .unwrap_or(false)
}

#[derive(Debug, PartialEq)]
enum SegmentPart<'a> {
    Literal(&'a str),
    Token(&'a str),
}

/// Splits a segment on bracket boundaries.
fn split_segment(segment: &str) -> Result<Vec<SegmentPart<'_>>, PatternError> {
    let unbalanced = || PatternError::UnbalancedBrackets {
        segment: segment.to_string(),
    };

    let mut parts = Vec::new();
    let mut start = 0;
    let mut open: Option<usize> = None;

    for (index, ch) in segment.char_indices() {
        match (ch, open) {
            ('[', None) => {
                if index > start {
                    parts.push(SegmentPart::Literal(&segment[start..index]));
                }
                open = Some(index);
            }
            (']', Some(from)) => {
                parts.push(SegmentPart::Token(&segment[from + 1..index]));
                open = None;
                start = index + 1;
            }
            ('[', Some(_)) | (']', None) => return Err(unbalanced()),
            _ => {}
        }
    }

    if open.is_some() {
        return Err(unbalanced());
    }
    if start < segment.len() {
        parts.push(SegmentPart::Literal(&segment[start..]));
    }
    Ok(parts)
}

fn encode_literal(text: &str) -> Cow<'_, str> {
    if text
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || LITERAL_SAFE.contains(ch))
    {
        return Cow::Borrowed(text);
    }

    let mut encoded = String::with_capacity(text.len() + 8);
    let mut buf = [0u8; 4];
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() || LITERAL_SAFE.contains(ch) {
            encoded.push(ch);
        } else {
            encoded.push_str(&urlencoding::encode(ch.encode_utf8(&mut buf)));
        }
    }
    Cow::Owned(encoded)
}

/// Percent-decodes a captured value, keeping the raw text when it is not
/// valid UTF-8 after decoding.
pub(crate) fn decode_param(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw.to_string())
}

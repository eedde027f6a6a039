//! First-match route lookup with typed parameter checks.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::pattern::RoutePattern;
use crate::route::BuildRoute;

/// Anything carrying a compiled pattern can be matched. Implemented by build
/// routes here and by the runtime route table.
pub trait Routable {
    fn pattern(&self) -> &RoutePattern;
}

impl Routable for BuildRoute {
    fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }
}

type Predicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Named predicates referenced by `[name=type]` segments.
///
/// # Examples
///
/// ```
/// use obelus_router::ParamMatchers;
///
/// let matchers = ParamMatchers::new()
///     .with_matcher("int", |value| value.parse::<i64>().is_ok());
/// assert_eq!(matchers.check("int", "42"), Some(true));
/// assert_eq!(matchers.check("int", "abc"), Some(false));
/// assert_eq!(matchers.check("uuid", "abc"), None);
/// ```
#[derive(Clone, Default)]
pub struct ParamMatchers {
    matchers: HashMap<String, Predicate>,
}

impl ParamMatchers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_matcher<F>(mut self, name: impl Into<String>, matcher: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.register(name, matcher);
        self
    }

    pub fn register<F>(&mut self, name: impl Into<String>, matcher: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.matchers.insert(name.into(), Arc::new(matcher));
    }

    /// Runs a matcher; `None` when no matcher has that name.
    pub fn check(&self, name: &str, value: &str) -> Option<bool> {
        self.matchers.get(name).map(|matcher| matcher(value))
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl fmt::Debug for ParamMatchers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.matchers.keys()).finish()
    }
}

/// A matched route and its decoded parameters.
#[derive(Debug)]
pub struct RouteMatch<'a, R> {
    pub route: &'a R,
    pub params: HashMap<String, String>,
}

/// Returns the first route, in table order, whose pattern accepts `pathname`
/// and whose typed parameters all pass their matcher.
///
/// A typed parameter whose matcher fails, or has no registered matcher,
/// rejects that candidate only; matching continues with the next route.
pub fn match_route<'a, R: Routable>(
    routes: &'a [R],
    pathname: &str,
    matchers: &ParamMatchers,
) -> Option<RouteMatch<'a, R>> {
    routes.iter().find_map(|route| {
        let pattern = route.pattern();
        let values = pattern.exec(pathname)?;

        let mut params = HashMap::with_capacity(values.len());
        for ((name, ty), value) in pattern.params().zip(values) {
            if let Some(ty) = ty {
                match matchers.check(ty, &value) {
                    Some(true) => {}
                    Some(false) => return None,
                    None => {
                        warn!(
                            "No param matcher named `{}` for `{}` in {}",
                            ty,
                            name,
                            pattern.source()
                        );
                        return None;
                    }
                }
            }
            params.insert(name.to_string(), value);
        }

        Some(RouteMatch { route, params })
    })
}

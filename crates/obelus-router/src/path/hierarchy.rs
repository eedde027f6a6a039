/// Lazy iterator over a pathname and its ancestors, nearest first.
///
/// Keeps the trailing-slash style of the input, so for `/a/b/c/` it yields
/// `/a/b/c/` → `/a/b/` → `/a/` → `/`, and for `/a/b` it yields
/// `/a/b` → `/a` → `/`. The walk borrows the input; each yielded pathname
/// is a newly allocated `String`.
///
/// # Examples
///
/// ```
/// use obelus_router::path::PathHierarchy;
///
/// let paths: Vec<String> = PathHierarchy::new("/docs/guide/").collect();
/// assert_eq!(paths, vec!["/docs/guide/", "/docs/", "/"]);
///
/// let paths: Vec<String> = PathHierarchy::new("/docs/guide").collect();
/// assert_eq!(paths, vec!["/docs/guide", "/docs", "/"]);
/// ```
#[derive(Debug, Clone)]
pub struct PathHierarchy<'a> {
    current: Option<&'a str>,
    trailing_slash: bool,
}

impl<'a> PathHierarchy<'a> {
    pub fn new(pathname: &'a str) -> Self {
        let trailing_slash = pathname.len() > 1 && pathname.ends_with('/');
        let trimmed = pathname.trim_end_matches('/');
        Self {
            current: Some(if trimmed.is_empty() { "/" } else { trimmed }),
            trailing_slash,
        }
    }
}

impl<'a> Iterator for PathHierarchy<'a> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;

        self.current = match current.rfind('/') {
            _ if current == "/" => None,
            Some(0) => Some("/"),
            Some(slash) => Some(&current[..slash]),
            None => None,
        };

        if current == "/" || !self.trailing_slash {
            Some(current.to_string())
        } else {
            Some(format!("{current}/"))
        }
    }
}

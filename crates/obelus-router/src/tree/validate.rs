use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{BuildError, Collision};
use crate::route::BuildRoute;

/// Fails when two routes share a pathname, naming every file involved.
pub(crate) fn check_collisions(routes: &[BuildRoute]) -> Result<(), BuildError> {
    let mut by_pathname: BTreeMap<&str, Vec<PathBuf>> = BTreeMap::new();
    for route in routes {
        by_pathname
            .entry(route.pathname.as_str())
            .or_default()
            .push(route.file_path.clone());
    }

    let collisions: Vec<Collision> = by_pathname
        .into_iter()
        .filter(|(_, files)| files.len() > 1)
        .map(|(pathname, files)| Collision {
            pathname: pathname.to_string(),
            files,
        })
        .collect();

    if collisions.is_empty() {
        Ok(())
    } else {
        Err(BuildError::Collisions(collisions))
    }
}

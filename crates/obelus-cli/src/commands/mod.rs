pub mod build;
pub mod routes;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use obelus::Config;
use obelus_router::{BuildOptions, RouteTree};

/// Loads the config and builds the route tree it describes.
///
/// Paths in the config are relative to the config file's directory.
/// Warnings stay on the tree; fatal build errors are returned.
pub(crate) fn load_tree(config_path: &Path, routes: Option<&Path>) -> Result<(Config, PathBuf, RouteTree)> {
    let config = Config::load(config_path)?;
    let base = config_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut options: BuildOptions = config.build_options(&base);
    if let Some(routes) = routes {
        options.routes_dir = routes.to_path_buf();
    }

    let tree = RouteTree::build(&options)
        .with_context(|| format!("Failed to build routes from {}", options.routes_dir.display()))?;

    Ok((config, base, tree))
}

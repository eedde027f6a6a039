// File: src/config.rs
// Purpose: Configuration parsing from obelus.toml

use anyhow::{Context, Result};
use obelus_router::{BuildOptions, RewriteRule};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub build: BuildConfig,
}

/// Runtime mode of the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Dev,
    #[default]
    Production,
    Static,
}

impl Mode {
    pub fn is_dev(self) -> bool {
        self == Mode::Dev
    }
}

/// Routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Directory containing route files (default: "src/routes")
    #[serde(default = "default_routes_dir")]
    pub routes_dir: String,

    /// Whether page pathnames end with a slash (default: true)
    #[serde(default = "default_true")]
    pub trailing_slash: bool,

    #[serde(default = "default_page_extensions")]
    pub page_extensions: Vec<String>,

    #[serde(default = "default_endpoint_extensions")]
    pub endpoint_extensions: Vec<String>,

    /// Localized or prefixed copies of the route tree
    #[serde(default)]
    pub rewrite: Vec<RewriteRule>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub mode: Mode,

    /// Reject cross-origin form submissions (default: true)
    #[serde(default = "default_true")]
    pub check_origin: bool,
}

/// Build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_manifest")]
    pub manifest: String,
}

// Default values
fn default_routes_dir() -> String {
    "src/routes".to_string()
}

fn default_page_extensions() -> Vec<String> {
    vec![".rsx".to_string(), ".md".to_string(), ".mdx".to_string()]
}

fn default_endpoint_extensions() -> Vec<String> {
    vec![".rs".to_string()]
}

fn default_manifest() -> String {
    "dist/routes.json".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            routes_dir: default_routes_dir(),
            trailing_slash: true,
            page_extensions: default_page_extensions(),
            endpoint_extensions: default_endpoint_extensions(),
            rewrite: Vec::new(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            check_origin: true,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file. A missing or empty file yields
    /// the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Load configuration from default path (./obelus.toml)
    pub fn load_default() -> Result<Self> {
        Self::load("obelus.toml")
    }

    /// Builder options for the routing section, with `routes_dir` resolved
    /// against `base`.
    pub fn build_options(&self, base: impl AsRef<Path>) -> BuildOptions {
        let routes_dir: PathBuf = base.as_ref().join(&self.routing.routes_dir);
        let mut options = BuildOptions::new(routes_dir)
            .with_trailing_slash(self.routing.trailing_slash)
            .with_page_extensions(self.routing.page_extensions.clone())
            .with_endpoint_extensions(self.routing.endpoint_extensions.clone());
        for rule in &self.routing.rewrite {
            options = options.with_rewrite(rule.clone());
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.routing.routes_dir, "src/routes");
        assert!(config.routing.trailing_slash);
        assert_eq!(config.server.mode, Mode::Production);
        assert!(config.server.check_origin);
        assert_eq!(config.build.manifest, "dist/routes.json");
    }

    #[test]
    fn test_empty_config() {
        let config = toml::from_str::<Config>("").unwrap_or_default();
        assert_eq!(config.routing.page_extensions, vec![".rsx", ".md", ".mdx"]);
        assert_eq!(config.routing.endpoint_extensions, vec![".rs"]);
    }

    #[test]
    fn test_rewrite_rules_and_mode() {
        let toml = r#"
            [routing]
            routes_dir = "app/routes"
            trailing_slash = false

            [[routing.rewrite]]
            prefix = "de"
            paths = { about = "ueber-uns" }

            [server]
            mode = "dev"
            check_origin = false
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.routing.routes_dir, "app/routes");
        assert!(!config.routing.trailing_slash);
        assert_eq!(config.routing.rewrite.len(), 1);
        assert_eq!(config.routing.rewrite[0].prefix.as_deref(), Some("de"));
        assert_eq!(config.routing.rewrite[0].paths["about"], "ueber-uns");
        assert!(config.server.mode.is_dev());
        assert!(!config.server.check_origin);

        let options = config.build_options("/site");
        assert_eq!(options.routes_dir, PathBuf::from("/site/app/routes"));
        assert!(!options.trailing_slash);
        assert_eq!(options.rewrite_routes.len(), 1);
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("obelus.toml")).unwrap();
        assert_eq!(config.routing.routes_dir, "src/routes");
    }
}

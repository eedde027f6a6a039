use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use super::load_tree;

pub fn execute(config_path: &Path, routes: Option<&Path>, out: Option<&Path>) -> Result<()> {
    println!("{}", "Building routes...".green().bold());

    let (config, base, tree) = load_tree(config_path, routes)?;
    let out = match out {
        Some(out) => out.to_path_buf(),
        None => base.join(&config.build.manifest),
    };

    let json = tree.manifest().to_json().context("Failed to serialize route manifest")?;
    if let Some(dir) = out.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    }
    fs::write(&out, json).with_context(|| format!("Failed to write manifest: {}", out.display()))?;

    info!(
        routes = tree.routes.len(),
        layouts = tree.layouts.len(),
        plugins = tree.plugins.len(),
        "wrote {}",
        out.display()
    );

    println!();
    println!("{} {} routes", "✓".green(), tree.routes.len());
    if tree.has_warnings() {
        println!("{} {} warnings", "⚠".yellow(), tree.diagnostics.len());
        for diagnostic in &tree.diagnostics {
            println!("  {}", diagnostic.message.yellow());
        }
    }
    println!("Manifest: {}", out.display().to_string().cyan());

    Ok(())
}

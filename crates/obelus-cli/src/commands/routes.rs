use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use obelus_router::{BuildRoute, RouteKind};

use super::load_tree;

pub fn execute(config_path: &Path, routes: Option<&Path>) -> Result<()> {
    let (_, _, tree) = load_tree(config_path, routes)?;

    if tree.routes.is_empty() {
        println!("{}", "No routes found".yellow());
        return Ok(());
    }

    let width = tree
        .routes
        .iter()
        .map(|route| route.pathname.len())
        .max()
        .unwrap_or(0);

    for route in &tree.routes {
        println!("{}", format_route(route, width));
    }

    if !tree.plugins.is_empty() {
        println!();
        println!("{}", "Plugins:".bold());
        for plugin in &tree.plugins {
            println!("  {}", plugin.id);
        }
    }

    Ok(())
}

fn format_route(route: &BuildRoute, width: usize) -> String {
    let kind = match route.kind {
        RouteKind::Page => "page".green(),
        RouteKind::Endpoint => "endpoint".blue(),
    };
    let layouts = route
        .layouts
        .iter()
        .map(|layout| layout.id.as_str())
        .collect::<Vec<_>>()
        .join(" > ");
    let mut line = format!("{:<width$}  {:<8}  {}", route.pathname, kind, route.id);
    if !layouts.is_empty() {
        line.push_str(&format!("  [{}]", layouts.dimmed()));
    }
    if let Some(original) = &route.original_pathname {
        line.push_str(&format!("  (from {})", original));
    }
    line
}

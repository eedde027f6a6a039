mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "obelus")]
#[command(version, about = "Obelus CLI - file-system routing for server rendering", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the route tree and write the route manifest
    Build {
        /// Config file
        #[arg(short, long, default_value = "obelus.toml")]
        config: PathBuf,

        /// Routes directory (overrides the config)
        #[arg(short, long)]
        routes: Option<PathBuf>,

        /// Manifest output file (overrides the config)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the ordered route table
    Routes {
        /// Config file
        #[arg(short, long, default_value = "obelus.toml")]
        config: PathBuf,

        /// Routes directory (overrides the config)
        #[arg(short, long)]
        routes: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build { config, routes, out } => {
            commands::build::execute(&config, routes.as_deref(), out.as_deref())?;
        }
        Commands::Routes { config, routes } => {
            commands::routes::execute(&config, routes.as_deref())?;
        }
    }

    Ok(())
}

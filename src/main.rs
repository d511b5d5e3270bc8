//! thunderpack command-line entry point

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use thunderpack::cli::{self, Commands};
use thunderpack::config::Config;

#[derive(Parser)]
#[command(name = "thunderpack")]
#[command(author, version, about = "Downloads the latest versions of Thunderstore mods into a ready-to-use BepInEx bundle", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "THUNDERPACK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "thunderpack=debug"
    } else {
        "thunderpack=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!("Archive cache: {}", config.download.cache_dir.display());

    cli::execute(cli.command, &config)
}

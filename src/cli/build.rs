//! Build command implementation

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use colored::Colorize;

use crate::bundle::Bundler;
use crate::cache::ArchiveCache;
use crate::config::Config;
use crate::download::HttpFetcher;
use crate::modlist;
use crate::provider::ThunderstoreProvider;

use super::{print_update_ages, ConsoleReporter};

pub fn run(
    mod_list: &Path,
    output: Option<&Path>,
    export: Option<Option<PathBuf>>,
    dry_run: bool,
    config: &Config,
) -> Result<()> {
    let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let prefix = &config.bundle.output_prefix;

    // Validate every reference before any network work
    let raw = modlist::read_references(mod_list)?;
    let seeds = modlist::parse_references(&raw, &config.source)?;

    let provider = ThunderstoreProvider::new(&config.source)?;
    let fetcher = HttpFetcher::new(&config.download)?;
    let reporter = ConsoleReporter::new();
    let bundler = Bundler::new(
        &provider,
        &fetcher,
        ArchiveCache::new(&config.download.cache_dir),
        &reporter,
    )
    .with_policy(config.bundle.on_corrupt_archive);

    println!("{}", "Resolving dependencies...".cyan());
    let resolution = bundler.resolve(&seeds)?;
    println!();

    if let Some(export) = export {
        let path = export
            .unwrap_or_else(|| PathBuf::from(format!("{}_modlist_{}.txt", prefix, timestamp)));
        modlist::export_listing(&path, &resolution.requested)?;
        println!("Exported mod list to {}", path.display().to_string().bold());
        println!();
    }

    print_update_ages(&resolution.requested);
    println!();
    println!(
        "{} requested, {} dependenc{}",
        resolution.requested.len(),
        resolution.transitive.len(),
        if resolution.transitive.len() == 1 { "y" } else { "ies" }
    );
    println!();

    if dry_run {
        println!("{}", "Dry run complete - no packages downloaded.".yellow());
        return Ok(());
    }

    let base = output
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("{}_{}", prefix, timestamp)));

    println!("{}", "Downloading and installing packages...".cyan());
    let report = bundler.build(&resolution, &base)?;
    println!();

    if !report.is_complete() {
        println!(
            "{} {} package(s) could not be installed:",
            "Error:".red().bold(),
            report.skipped.len()
        );
        for err in &report.skipped {
            println!("  {} {}", "✗".red(), err);
        }
        bail!(
            "Bundle at {} is incomplete ({} of {} packages installed)",
            report.base.display(),
            report.installed.len(),
            report.installed.len() + report.skipped.len()
        );
    }

    println!(
        "{} {} package(s) installed into {}",
        "✓".green().bold(),
        report.installed.len(),
        report.base.display().to_string().bold()
    );

    Ok(())
}

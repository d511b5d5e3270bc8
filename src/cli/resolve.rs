//! Resolve command implementation

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::config::Config;
use crate::modlist;
use crate::provider::ThunderstoreProvider;
use crate::report::LogReporter;
use crate::resolver::DependencyResolver;

use super::print_update_ages;

pub fn run(mod_list: &Path, config: &Config) -> Result<()> {
    let raw = modlist::read_references(mod_list)?;
    let seeds = modlist::parse_references(&raw, &config.source)?;

    println!("{}", "Resolving dependencies...".cyan());
    println!();

    let provider = ThunderstoreProvider::new(&config.source)?;
    let resolution = DependencyResolver::new(&provider, &LogReporter).resolve(&seeds)?;

    for record in resolution.all() {
        let suffix = if resolution.is_requested(&record.reference) {
            String::new()
        } else {
            format!(" {}", "(dependency)".dimmed())
        };
        println!(
            "  {} {}-{} {} {}{}",
            "✓".green(),
            record.name.bold(),
            record.version,
            "released".dimmed(),
            record.release_date.format("%Y-%m-%d").to_string().cyan(),
            suffix
        );
    }

    println!();
    print_update_ages(&resolution.requested);
    println!();
    println!(
        "{} {} package(s) in closure",
        "✓".green().bold(),
        resolution.len()
    );

    Ok(())
}

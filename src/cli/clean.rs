//! Clean command implementation

use anyhow::Result;
use colored::Colorize;

use crate::cache::ArchiveCache;
use crate::config::Config;

use super::format_bytes;

pub fn run(all: bool, days: u64, config: &Config) -> Result<()> {
    let cache = ArchiveCache::new(&config.download.cache_dir);
    println!("  Cache directory: {}", cache.dir().display());

    let result = if all {
        println!("{}", "Cleaning all cached archives...".cyan());
        cache.clean(None)?
    } else {
        println!(
            "{}",
            format!("Cleaning cached archives older than {} days...", days).cyan()
        );
        cache.clean(Some(days))?
    };

    println!();
    if result.any_removed() {
        println!(
            "  {} Removed {} archive(s), freed {}",
            "✓".green(),
            result.removed_files,
            format_bytes(result.removed_bytes)
        );
    } else {
        println!("  Archive cache is empty or no old archives found.");
    }
    println!("  Total archive cache: {}", format_bytes(result.total_bytes));

    Ok(())
}

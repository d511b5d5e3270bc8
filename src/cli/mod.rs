//! Command-line interface for thunderpack

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Subcommand;

use crate::config::Config;
use crate::package::PackageRecord;

mod build;
mod clean;
mod progress;
mod resolve;

pub use progress::ConsoleReporter;

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve, download and lay out the mods of a mod list
    Build {
        /// File with package URLs between brackets: <thunderstore.io/c/.../p/...>
        mod_list: PathBuf,

        /// Folder to create the bundle in (default: <prefix>_<timestamp>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export a formatted mod list of the requested packages
        #[arg(short, long, num_args = 0..=1, value_name = "PATH")]
        export: Option<Option<PathBuf>>,

        /// Stop after resolving, don't download or build anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the resolved packages of a mod list without downloading
    Resolve {
        /// File with package URLs between brackets
        mod_list: PathBuf,
    },

    /// Clean the archive cache
    Clean {
        /// Remove all cached archives
        #[arg(long)]
        all: bool,

        /// Remove archives older than this many days
        #[arg(long, default_value_t = 30, conflicts_with = "all")]
        days: u64,
    },
}

/// Execute a CLI command
pub fn execute(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Build {
            mod_list,
            output,
            export,
            dry_run,
        } => build::run(&mod_list, output.as_deref(), export, dry_run, config),
        Commands::Resolve { mod_list } => resolve::run(&mod_list, config),
        Commands::Clean { all, days } => clean::run(all, days, config),
    }
}

/// One line describing how long ago a package was last updated
fn update_age_line(record: &PackageRecord, today: NaiveDate) -> String {
    let delta = (today - record.release_date).num_days();
    format!(
        "{}: updated {} day(s) ago ({}, version {}, <{}>)",
        record.name,
        delta,
        record.release_date.format("%Y-%m-%d"),
        record.version,
        record.reference
    )
}

/// Print update ages, oldest release first
fn print_update_ages(records: &[PackageRecord]) {
    let today = chrono::Local::now().date_naive();

    let mut sorted: Vec<&PackageRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.release_date);

    for record in sorted {
        println!("{}", update_age_line(record, today));
    }
}

/// Format bytes as human-readable size
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

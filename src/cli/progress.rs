//! Terminal rendering of bundle progress

use std::cell::RefCell;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::installer::PlacementMode;
use crate::package::{PackageRecord, PackageReference};
use crate::report::Reporter;

/// Reporter printing colored status lines and a download progress bar
#[derive(Default)]
pub struct ConsoleReporter {
    bar: RefCell<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .expect("Invalid progress bar template")
            .progress_chars("#>-"),
    );
    pb
}

impl Reporter for ConsoleReporter {
    fn resolved(&self, record: &PackageRecord) {
        println!(
            "  {} {} {}",
            "✓".green(),
            record.name.bold(),
            record.version.dimmed()
        );
    }

    fn new_dependencies(&self, references: &[PackageReference]) {
        if !references.is_empty() {
            println!(
                "  {} {} new dependenc{} found",
                "→".cyan(),
                references.len(),
                if references.len() == 1 { "y" } else { "ies" }
            );
        }
    }

    fn fetch_started(&self, total: usize) {
        *self.bar.borrow_mut() = Some(create_progress_bar(total as u64));
    }

    fn fetched(&self, record: &PackageRecord, cached: bool) {
        if let Some(pb) = self.bar.borrow().as_ref() {
            let note = if cached { " (cached)" } else { "" };
            pb.set_message(format!("{}{}", record.name, note));
            pb.inc(1);
        }
    }

    fn fetch_finished(&self) {
        if let Some(pb) = self.bar.borrow_mut().take() {
            pb.finish_with_message("archives ready");
        }
    }

    fn installed(&self, record: &PackageRecord, _rank: usize, mode: PlacementMode, files: usize) {
        println!(
            "  {} {} {}",
            "✓".green(),
            record.name.bold(),
            format!("({}, {} file(s))", mode, files).dimmed()
        );
    }
}

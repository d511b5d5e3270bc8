//! Progress reporting passed into the resolver, installer and bundle run

use crate::installer::PlacementMode;
use crate::package::{PackageRecord, PackageReference};

/// Receives progress events from a bundle run.
///
/// Every method has a no-op default so implementors only handle the events
/// they care about.
pub trait Reporter {
    /// A resolution frontier is about to be queried
    fn frontier(&self, _references: &[PackageReference]) {}

    /// Metadata for one package was obtained
    fn resolved(&self, _record: &PackageRecord) {}

    /// References discovered in the last frontier that were not seen before
    fn new_dependencies(&self, _references: &[PackageReference]) {}

    /// Archive fetching is starting for `total` packages
    fn fetch_started(&self, _total: usize) {}

    /// One archive is available locally
    fn fetched(&self, _record: &PackageRecord, _cached: bool) {}

    fn fetch_finished(&self) {}

    /// One package was laid out into the tree
    fn installed(&self, _record: &PackageRecord, _rank: usize, _mode: PlacementMode, _files: usize) {}
}

/// Reporter that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Reporter for Silent {}

/// Reporter that forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn frontier(&self, references: &[PackageReference]) {
        tracing::info!("Querying {} package(s)", references.len());
    }

    fn resolved(&self, record: &PackageRecord) {
        tracing::info!(
            "Got info for {}, version {}, last updated {}",
            record.name,
            record.version,
            record.release_date
        );
    }

    fn new_dependencies(&self, references: &[PackageReference]) {
        if references.is_empty() {
            tracing::info!("No more dependencies found");
        } else {
            let joined = references
                .iter()
                .map(|r| r.as_str())
                .collect::<Vec<_>>()
                .join(">, <");
            tracing::info!("New dependencies found: <{}>", joined);
        }
    }

    fn fetched(&self, record: &PackageRecord, cached: bool) {
        if cached {
            tracing::info!("Skipping download of {}, archive found in cache", record.name);
        } else {
            tracing::info!("Downloaded {}", record.full_id());
        }
    }

    fn installed(&self, record: &PackageRecord, rank: usize, mode: PlacementMode, files: usize) {
        tracing::info!(
            "Installed {} (rank {}, {}, {} file(s))",
            record.name,
            rank,
            mode,
            files
        );
    }
}

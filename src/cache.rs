//! Local archive cache
//!
//! Archives are stored as `{full_id}.zip`. A file already present under that
//! name is reused as-is: there is no expiry and no integrity check, so a
//! damaged file stays in use until it is removed with `thunderpack clean`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::NamedTempFile;

use crate::download::BlobFetcher;
use crate::error::{BundleError, Result};
use crate::package::PackageRecord;

/// Directory of downloaded package archives
#[derive(Debug, Clone)]
pub struct ArchiveCache {
    dir: PathBuf,
}

/// Where an archive came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedArchive {
    pub path: PathBuf,
    /// True when the file was already present and no fetch happened
    pub cached: bool,
}

impl ArchiveCache {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache path for a package release
    pub fn path_for(&self, record: &PackageRecord) -> PathBuf {
        self.dir.join(format!("{}.zip", record.full_id()))
    }

    /// Return the cached archive for a release, fetching it first if needed
    pub fn get_or_fetch(&self, record: &PackageRecord, fetcher: &dyn BlobFetcher) -> Result<CachedArchive> {
        let path = self.path_for(record);
        if path.is_file() {
            tracing::debug!("Skipping download, archive found at: {}", path.display());
            return Ok(CachedArchive { path, cached: true });
        }

        tracing::info!("Downloading mod: {}", record.name);
        let bytes = fetcher.fetch_archive(&record.download_locator)?;

        tracing::debug!("Saving mod {} as {}", record.name, path.display());
        self.store(&path, &bytes)?;

        Ok(CachedArchive { path, cached: false })
    }

    /// Write through a temp file so a partial download never takes the final name
    fn store(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| BundleError::io_at(&self.dir, e))?;

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| BundleError::io_at(&self.dir, e))?;
        tmp.write_all(bytes).map_err(|e| BundleError::io_at(tmp.path(), e))?;
        tmp.persist(path)
            .map_err(|e| BundleError::io_at(path, e.error))?;
        Ok(())
    }

    /// Remove cached archives.
    ///
    /// With `older_than_days` only archives last modified before that many
    /// days ago are removed; otherwise everything goes.
    pub fn clean(&self, older_than_days: Option<u64>) -> Result<CleanResult> {
        let mut result = CleanResult::default();
        if !self.dir.exists() {
            return Ok(result);
        }

        let cutoff = older_than_days.map(cutoff_for);

        for entry in fs::read_dir(&self.dir).map_err(|e| BundleError::io_at(&self.dir, e))? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() || path.extension().map(|e| e != "zip").unwrap_or(true) {
                continue;
            }

            let metadata = entry.metadata()?;
            result.total_bytes += metadata.len();

            let expired = match cutoff {
                // Cutoff before the epoch: nothing is that old
                Some(None) => false,
                Some(Some(cutoff)) => metadata.modified().map(|m| m < cutoff).unwrap_or(false),
                None => true,
            };

            if expired {
                fs::remove_file(&path).map_err(|e| BundleError::io_at(&path, e))?;
                result.removed_files += 1;
                result.removed_bytes += metadata.len();
            }
        }

        Ok(result)
    }
}

/// Point in time `days` ago, or `None` when that lies outside `SystemTime`
fn cutoff_for(days: u64) -> Option<SystemTime> {
    let secs = days.checked_mul(24 * 60 * 60)?;
    SystemTime::now().checked_sub(Duration::from_secs(secs))
}

/// Result of a cache clean
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanResult {
    pub removed_files: usize,
    pub removed_bytes: u64,
    /// Size of the cache before cleaning
    pub total_bytes: u64,
}

impl CleanResult {
    pub fn any_removed(&self) -> bool {
        self.removed_files > 0
    }
}

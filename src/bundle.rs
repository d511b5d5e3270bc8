//! Bundle assembly
//!
//! Ties resolution, fetching and installation together. All archives are
//! fetched before the tree is created, so a failed download never leaves a
//! bundle folder behind. Installation then runs strictly in priority order:
//! dependencies first, deepest first, and the requested packages last.

use std::path::{Path, PathBuf};

use crate::cache::ArchiveCache;
use crate::config::CorruptArchivePolicy;
use crate::download::BlobFetcher;
use crate::error::{BundleError, Result};
use crate::installer::{ArchiveInstaller, PackageArchive, PlacementMode};
use crate::package::{PackageRecord, PackageReference, ResolutionResult};
use crate::provider::MetadataProvider;
use crate::report::Reporter;
use crate::resolver::DependencyResolver;
use crate::tree::TargetTree;

/// A package whose archive is available locally
#[derive(Debug, Clone)]
pub struct FetchedPackage<'r> {
    pub record: &'r PackageRecord,
    pub archive_path: PathBuf,
}

/// Outcome of a bundle build
#[derive(Debug)]
pub struct BundleReport {
    /// Root of the finished tree
    pub base: PathBuf,
    /// Installed packages (full id, placement), in install order
    pub installed: Vec<(String, PlacementMode)>,
    /// Packages whose archives could not be installed
    pub skipped: Vec<BundleError>,
}

impl BundleReport {
    /// Whether every resolved package made it into the tree
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Assembles bundles from package references
pub struct Bundler<'a> {
    provider: &'a dyn MetadataProvider,
    fetcher: &'a dyn BlobFetcher,
    cache: ArchiveCache,
    policy: CorruptArchivePolicy,
    reporter: &'a dyn Reporter,
}

impl<'a> Bundler<'a> {
    pub fn new(
        provider: &'a dyn MetadataProvider,
        fetcher: &'a dyn BlobFetcher,
        cache: ArchiveCache,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            provider,
            fetcher,
            cache,
            policy: CorruptArchivePolicy::default(),
            reporter,
        }
    }

    /// Set what happens when an archive turns out to be corrupt
    pub fn with_policy(mut self, policy: CorruptArchivePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Resolve the dependency closure of the seeds
    pub fn resolve(&self, seeds: &[PackageReference]) -> Result<ResolutionResult> {
        tracing::info!("Collecting mod data from {} reference(s)", seeds.len());
        DependencyResolver::new(self.provider, self.reporter).resolve(seeds)
    }

    /// Make every archive available locally, returned in install order
    pub fn fetch_all<'r>(&self, resolution: &'r ResolutionResult) -> Result<Vec<FetchedPackage<'r>>> {
        self.reporter.fetch_started(resolution.len());

        let mut fetched = Vec::with_capacity(resolution.len());
        for record in resolution.install_order() {
            let archive = self.cache.get_or_fetch(record, self.fetcher)?;
            self.reporter.fetched(record, archive.cached);
            fetched.push(FetchedPackage {
                record,
                archive_path: archive.path,
            });
        }

        self.reporter.fetch_finished();
        Ok(fetched)
    }

    /// Install fetched packages into the tree, in the given order
    pub fn install_all(
        &self,
        tree: &mut TargetTree,
        fetched: &[FetchedPackage<'_>],
    ) -> Result<(Vec<(String, PlacementMode)>, Vec<BundleError>)> {
        let installer = ArchiveInstaller::new(self.reporter);
        let mut installed = Vec::with_capacity(fetched.len());
        let mut skipped = Vec::new();

        for (rank, package) in fetched.iter().enumerate() {
            let full_id = package.record.full_id();
            let outcome = PackageArchive::open(&full_id, &package.archive_path)
                .and_then(|archive| installer.install(tree, package.record, &archive, rank));

            match outcome {
                Ok(outcome) => installed.push((full_id, outcome.mode)),
                Err(err @ BundleError::ArchiveCorrupt { .. })
                    if self.policy == CorruptArchivePolicy::Continue =>
                {
                    tracing::error!("{}", err);
                    skipped.push(err);
                }
                Err(err) => return Err(err),
            }
        }

        Ok((installed, skipped))
    }

    /// Fetch every resolved package and lay them out in a new tree at `base`
    pub fn build(&self, resolution: &ResolutionResult, base: &Path) -> Result<BundleReport> {
        let fetched = self.fetch_all(resolution)?;

        let mut tree = TargetTree::create(base)?;
        let (installed, skipped) = self.install_all(&mut tree, &fetched)?;

        Ok(BundleReport {
            base: tree.finalize(),
            installed,
            skipped,
        })
    }
}

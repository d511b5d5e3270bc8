//! Dependency closure resolution
//!
//! Resolution is a level-order walk of the dependency graph. Every reference
//! is queried exactly once, no matter how many packages depend on it, and a
//! cycle can only re-introduce references that were already seen, so the walk
//! always terminates.
//!
//! The records of the first level are the requested packages; everything
//! discovered afterwards is transitive. The split is made by position in the
//! call sequence, which is what later drives installation priority.

use std::collections::HashSet;

use crate::error::{BundleError, Result};
use crate::package::{PackageRecord, PackageReference, ResolutionResult};
use crate::provider::MetadataProvider;
use crate::report::Reporter;

/// Resolves a seed set into its full dependency closure
pub struct DependencyResolver<'a, P: MetadataProvider> {
    provider: P,
    reporter: &'a dyn Reporter,
}

impl<'a, P: MetadataProvider> DependencyResolver<'a, P> {
    pub fn new(provider: P, reporter: &'a dyn Reporter) -> Self {
        Self { provider, reporter }
    }

    /// Resolve seeds and all of their transitive dependencies.
    ///
    /// Duplicate seeds are collapsed, keeping first-occurrence order. Any
    /// provider failure aborts the whole resolution.
    pub fn resolve(&self, seeds: &[PackageReference]) -> Result<ResolutionResult> {
        let mut seen: HashSet<PackageReference> = HashSet::new();
        let mut frontier: Vec<PackageReference> = seeds
            .iter()
            .filter(|r| seen.insert((*r).clone()))
            .cloned()
            .collect();

        if frontier.is_empty() {
            return Err(BundleError::InvalidReference {
                reference: String::new(),
                reason: "No package references to resolve".to_string(),
            });
        }

        // The first frontier is exactly the deduplicated seed set
        self.reporter.frontier(&frontier);
        let mut batch = self.query_frontier(&frontier)?;
        let requested_count = batch.len();

        let mut records: Vec<PackageRecord> = Vec::new();

        loop {
            let mut new_refs: Vec<PackageReference> = Vec::new();
            for dep in batch.iter().flat_map(|r| r.dependencies.iter()) {
                if seen.insert(dep.clone()) {
                    new_refs.push(dep.clone());
                }
            }

            records.extend(batch);
            self.reporter.new_dependencies(&new_refs);

            if new_refs.is_empty() {
                break;
            }

            tracing::debug!("Next frontier: {} reference(s)", new_refs.len());
            frontier = new_refs;
            self.reporter.frontier(&frontier);
            batch = self.query_frontier(&frontier)?;
        }

        let transitive = records.split_off(requested_count);

        Ok(ResolutionResult {
            requested: records,
            transitive,
        })
    }

    /// Query every reference of one frontier, in order
    fn query_frontier(&self, frontier: &[PackageReference]) -> Result<Vec<PackageRecord>> {
        let mut batch = Vec::with_capacity(frontier.len());
        for reference in frontier {
            let record = self.provider.fetch_package(reference).map_err(|e| match e {
                err @ BundleError::MetadataFetch { .. } => err,
                other => BundleError::MetadataFetch {
                    reference: reference.to_string(),
                    reason: other.to_string(),
                },
            })?;
            self.reporter.resolved(&record);
            batch.push(record);
        }
        Ok(batch)
    }
}

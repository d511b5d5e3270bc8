//! Package metadata providers
//!
//! A [`MetadataProvider`] turns a package reference into the record of the
//! package's latest release. [`ThunderstoreProvider`] queries the Thunderstore
//! package API; tests substitute in-memory providers.

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;

use crate::config::SourceConfig;
use crate::error::{BundleError, Result};
use crate::modlist::{canonical_reference, package_coordinates};
use crate::package::{PackageRecord, PackageReference};

/// Source of package metadata
pub trait MetadataProvider {
    /// Fetch the latest release record for a package.
    ///
    /// Either every field of the record is populated or the call fails.
    fn fetch_package(&self, reference: &PackageReference) -> Result<PackageRecord>;
}

impl<P: MetadataProvider + ?Sized> MetadataProvider for &P {
    fn fetch_package(&self, reference: &PackageReference) -> Result<PackageRecord> {
        (**self).fetch_package(reference)
    }
}

/// Package as returned by the experimental package endpoint
#[derive(Debug, Deserialize)]
struct ApiPackage {
    latest: ApiVersion,
}

/// One released version of a package
#[derive(Debug, Deserialize)]
struct ApiVersion {
    name: String,
    version_number: String,
    date_created: DateTime<Utc>,
    download_url: String,
    #[serde(default)]
    dependencies: Vec<String>,
}

/// Metadata provider backed by the Thunderstore web API
pub struct ThunderstoreProvider {
    client: Client,
    source: SourceConfig,
}

impl ThunderstoreProvider {
    /// Create a provider for the configured package source
    pub fn new(source: &SourceConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(source.timeout_secs))
            .user_agent(concat!("thunderpack/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            source: source.clone(),
        })
    }

    /// API endpoint describing the referenced package
    pub fn api_url(&self, reference: &PackageReference) -> Result<String> {
        let (namespace, name) = Url::parse(reference.as_str())
            .ok()
            .as_ref()
            .and_then(package_coordinates)
            .ok_or_else(|| BundleError::MetadataFetch {
                reference: reference.to_string(),
                reason: "reference does not name a package".to_string(),
            })?;

        Ok(format!(
            "{}/api/experimental/package/{}/{}/",
            self.source.api_base.trim_end_matches('/'),
            namespace,
            name
        ))
    }
}

impl MetadataProvider for ThunderstoreProvider {
    fn fetch_package(&self, reference: &PackageReference) -> Result<PackageRecord> {
        let url = self.api_url(reference)?;
        tracing::debug!("Getting info from: <{}>", url);

        let failed = |reason: String| BundleError::MetadataFetch {
            reference: reference.to_string(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let body = response.text().map_err(|e| failed(e.to_string()))?;
        parse_record(reference, &body, &self.source)
    }
}

/// Build a record from an API response body
pub fn parse_record(
    reference: &PackageReference,
    body: &str,
    source: &SourceConfig,
) -> Result<PackageRecord> {
    let failed = |reason: String| BundleError::MetadataFetch {
        reference: reference.to_string(),
        reason,
    };

    let package: ApiPackage =
        serde_json::from_str(body).map_err(|e| failed(format!("malformed response: {}", e)))?;
    let latest = package.latest;

    let dependencies = latest
        .dependencies
        .iter()
        .map(|dep| {
            dependency_reference(dep, source)
                .ok_or_else(|| failed(format!("malformed dependency string {:?}", dep)))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PackageRecord {
        name: latest.name,
        reference: reference.clone(),
        version: latest.version_number,
        release_date: latest.date_created.date_naive(),
        download_locator: latest.download_url,
        dependencies,
    })
}

/// Map a `Namespace-Name-Version` dependency string to a package reference
fn dependency_reference(dependency: &str, source: &SourceConfig) -> Option<PackageReference> {
    let mut parts = dependency.splitn(3, '-');
    let namespace = parts.next().filter(|s| !s.is_empty())?;
    let name = parts.next().filter(|s| !s.is_empty())?;
    parts.next().filter(|s| !s.is_empty())?;
    Some(canonical_reference(source, namespace, name))
}

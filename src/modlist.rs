//! Mod list files: reading package references and exporting listings
//!
//! A mod list is free-form text in which every package reference is written
//! between angle brackets, e.g. `<https://thunderstore.io/c/lethal-company/p/BepInEx/BepInExPack/>`.
//! The same format is produced by [`export_listing`], so an exported listing
//! can be fed straight back into a build.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use reqwest::Url;

use crate::config::SourceConfig;
use crate::error::{BundleError, Result};
use crate::package::{PackageRecord, PackageReference};

fn bracket_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<([^>]+)>").unwrap())
}

/// Extract every bracketed reference from text, in order of appearance
pub fn extract_references(text: &str) -> Vec<String> {
    bracket_pattern()
        .captures_iter(text)
        .map(|c| c[1].trim().to_string())
        .collect()
}

/// Read the raw references listed in a mod list file
pub fn read_references(path: &Path) -> Result<Vec<String>> {
    tracing::info!("Reading: {}", path.display());

    let text = fs::read_to_string(path).map_err(|e| BundleError::io_at(path, e))?;
    let references = extract_references(&text);

    tracing::info!("Found {} references", references.len());

    if references.is_empty() {
        return Err(BundleError::InvalidReference {
            reference: path.display().to_string(),
            reason: "No package references found in file".to_string(),
        });
    }

    Ok(references)
}

/// Canonical reference for a package in the configured community
pub fn canonical_reference(source: &SourceConfig, namespace: &str, name: &str) -> PackageReference {
    PackageReference::new(format!(
        "https://{}/c/{}/p/{}/{}/",
        source.domain, source.community, namespace, name
    ))
}

/// Namespace and name of a package, taken from a package page URL.
///
/// Accepts both `/c/{community}/p/{namespace}/{name}` and the legacy
/// `/package/{namespace}/{name}` layouts.
pub fn package_coordinates(url: &Url) -> Option<(String, String)> {
    let segments: Vec<&str> = url
        .path_segments()?
        .filter(|s| !s.is_empty())
        .collect();

    match segments.as_slice() {
        ["c", _community, "p", namespace, name] => {
            Some((namespace.to_string(), name.to_string()))
        }
        ["package", namespace, name] => Some((namespace.to_string(), name.to_string())),
        _ => None,
    }
}

/// Validate a raw reference and turn it into its canonical form
pub fn parse_reference(raw: &str, source: &SourceConfig) -> Result<PackageReference> {
    let invalid = |reason: String| BundleError::InvalidReference {
        reference: raw.to_string(),
        reason,
    };

    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    let url = Url::parse(&with_scheme).map_err(|e| invalid(e.to_string()))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }

    if url.host_str() != Some(source.domain.as_str()) {
        return Err(invalid(format!("URL not from {}", source.domain)));
    }

    let (namespace, name) = package_coordinates(&url)
        .ok_or_else(|| invalid("URL does not point at a package page".to_string()))?;

    Ok(canonical_reference(source, &namespace, &name))
}

/// Validate every raw reference, failing on the first malformed one
pub fn parse_references(raw: &[String], source: &SourceConfig) -> Result<Vec<PackageReference>> {
    raw.iter().map(|r| parse_reference(r, source)).collect()
}

/// Write a listing of packages that can be read back as a mod list
pub fn export_listing(path: &Path, records: &[PackageRecord]) -> Result<()> {
    tracing::info!("Exporting mod list for {} mod(s)", records.len());

    let mut sorted: Vec<&PackageRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut file = fs::File::create(path).map_err(|e| BundleError::io_at(path, e))?;
    for record in sorted {
        write!(file, "{}\n<{}>\n\n", record.name, record.reference)
            .map_err(|e| BundleError::io_at(path, e))?;
    }

    Ok(())
}

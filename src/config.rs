//! Configuration management for thunderpack

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Package source configuration
    #[serde(default)]
    pub source: SourceConfig,

    /// Archive download configuration
    #[serde(default)]
    pub download: DownloadConfig,

    /// Bundle layout configuration
    #[serde(default)]
    pub bundle: BundleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Host that package references must point at
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Thunderstore community the packages belong to
    #[serde(default = "default_community")]
    pub community: String,

    /// Base URL of the package API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Timeout for metadata requests, in seconds
    #[serde(default = "default_metadata_timeout")]
    pub timeout_secs: u64,
}

fn default_domain() -> String {
    "thunderstore.io".to_string()
}

fn default_community() -> String {
    "lethal-company".to_string()
}

fn default_api_base() -> String {
    "https://thunderstore.io".to_string()
}

fn default_metadata_timeout() -> u64 {
    5
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            community: default_community(),
            api_base: default_api_base(),
            timeout_secs: default_metadata_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory holding downloaded archives, keyed by package full id
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Timeout for archive downloads, in seconds
    #[serde(default = "default_download_timeout")]
    pub timeout_secs: u64,

    /// Extra attempts after a failed download
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_cache_dir() -> PathBuf {
    directories::ProjectDirs::from("io", "thunderpack", "thunderpack")
        .map(|d| d.cache_dir().join("archives"))
        .unwrap_or_else(|| PathBuf::from(".thunderpack-cache"))
}

fn default_download_timeout() -> u64 {
    60
}

fn default_retries() -> u32 {
    2
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            timeout_secs: default_download_timeout(),
            retries: default_retries(),
        }
    }
}

/// What to do when a package archive cannot be read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorruptArchivePolicy {
    /// Stop the run at the first corrupt archive
    #[default]
    Abort,
    /// Keep installing the remaining packages, then fail the run
    Continue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleConfig {
    /// Prefix for generated bundle folders and export files
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,

    #[serde(default)]
    pub on_corrupt_archive: CorruptArchivePolicy,
}

fn default_output_prefix() -> String {
    "LC_modpack".to_string()
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            output_prefix: default_output_prefix(),
            on_corrupt_archive: CorruptArchivePolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, or use defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(PathBuf::from).or_else(|| {
            directories::ProjectDirs::from("io", "thunderpack", "thunderpack")
                .map(|d| d.config_dir().join("thunderpack.toml"))
                .filter(|p| p.exists())
        });

        match config_path {
            Some(path) => {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config: {}", path.display()))?;
                Self::from_toml(&content)
                    .with_context(|| format!("Failed to parse config: {}", path.display()))
            }
            None => Ok(Config::default()),
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

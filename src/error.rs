//! Error types for thunderpack

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for bundle operations
#[derive(Error, Debug)]
pub enum BundleError {
    #[error("Invalid package reference {reference}: {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error("Failed to fetch metadata for <{reference}>: {reason}")]
    MetadataFetch { reference: String, reason: String },

    #[error("Failed to fetch archive <{locator}>: {reason}")]
    Fetch { locator: String, reason: String },

    #[error("Corrupt archive for {package}: {reason}")]
    ArchiveCorrupt { package: String, reason: String },

    #[error("Folder {} already exists", .0.display())]
    TreeExists(PathBuf),

    #[error("IO error at {}: {source}", path.display())]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BundleError {
    /// Wrap an IO error with the path it happened at
    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BundleError::IoAt {
            path: path.into(),
            source,
        }
    }

    /// Package id or reference the error is about, if any
    pub fn subject(&self) -> Option<&str> {
        match self {
            BundleError::InvalidReference { reference, .. } => Some(reference),
            BundleError::MetadataFetch { reference, .. } => Some(reference),
            BundleError::Fetch { locator, .. } => Some(locator),
            BundleError::ArchiveCorrupt { package, .. } => Some(package),
            _ => None,
        }
    }
}

/// Result type alias for bundle operations
pub type Result<T> = std::result::Result<T, BundleError>;

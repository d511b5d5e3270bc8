//! On-disk layout of a bundle

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{BundleError, Result};

/// Folder the plugin loader and its subfolders live in
pub const LOADER_FOLDER: &str = "BepInEx";

/// Fixed subfolders under [`LOADER_FOLDER`]
pub const LOADER_SUBFOLDERS: [&str; 5] = ["cache", "config", "core", "patchers", "plugins"];

/// Subfolder plain plugin packages are placed in
pub const PLUGINS_FOLDER: &str = "plugins";

/// A bundle directory being populated by the installer.
///
/// The tree is created empty with the loader scaffold, mutated through
/// `&mut` by successive installs and consumed by [`TargetTree::finalize`].
#[derive(Debug)]
pub struct TargetTree {
    base: PathBuf,
}

impl TargetTree {
    /// Create the scaffold at `base`, which must not exist yet
    pub fn create(base: &Path) -> Result<Self> {
        tracing::info!("Creating tree at: {}", base.display());

        if base.exists() {
            return Err(BundleError::TreeExists(base.to_path_buf()));
        }

        if let Some(parent) = base.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| BundleError::io_at(parent, e))?;
        }
        fs::create_dir(base).map_err(|e| BundleError::io_at(base, e))?;

        let loader = base.join(LOADER_FOLDER);
        fs::create_dir(&loader).map_err(|e| BundleError::io_at(&loader, e))?;
        for sub in LOADER_SUBFOLDERS {
            let dir = loader.join(sub);
            fs::create_dir(&dir).map_err(|e| BundleError::io_at(&dir, e))?;
        }

        Ok(Self {
            base: base.to_path_buf(),
        })
    }

    /// Root of the bundle
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The loader folder inside the bundle
    pub fn loader_dir(&self) -> PathBuf {
        self.base.join(LOADER_FOLDER)
    }

    /// Where plain plugin packages go
    pub fn plugins_dir(&self) -> PathBuf {
        self.loader_dir().join(PLUGINS_FOLDER)
    }

    /// Finish population; the returned path is not touched again
    pub fn finalize(self) -> PathBuf {
        tracing::info!("Bundle complete at: {}", self.base.display());
        self.base
    }
}

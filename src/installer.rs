//! Archive layout installer
//!
//! Packages do not agree on where their files are rooted. Some ship the
//! loader itself, some ship a full `BepInEx/...` tree, some ship only the
//! loader subfolders (`plugins/`, `config/`, ...) and most ship bare plugin
//! files. The installer looks at the first path segment of every entry to
//! decide which of these an archive is, then writes it to the matching place
//! in the bundle.
//!
//! Installs are applied one package at a time in priority order and later
//! writes replace earlier ones, which is how path conflicts are settled.

use std::fmt;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::error::{BundleError, Result};
use crate::package::PackageRecord;
use crate::report::Reporter;
use crate::tree::{TargetTree, LOADER_FOLDER, LOADER_SUBFOLDERS};

/// Top-level archive entries that only describe the package
pub const EXCLUDED_ENTRIES: [&str; 4] = ["icon.png", "manifest.json", "README.md", "CHANGELOG.md"];

/// Folder a loader-core package ships its payload in
pub const LOADER_CORE_FOLDER: &str = "BepInExPack";

/// A single file inside a package archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Relative path, `/`-separated
    pub path: String,
    pub contents: Vec<u8>,
}

impl ArchiveEntry {
    pub fn new(path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }

    /// First component of the entry path
    pub fn first_segment(&self) -> &str {
        self.path.split('/').next().unwrap_or("")
    }

    /// Whether this entry is package metadata that is never installed
    pub fn is_excluded(&self) -> bool {
        EXCLUDED_ENTRIES.contains(&self.path.as_str())
    }
}

/// Contents of one package archive, fully read into memory
#[derive(Debug, Clone)]
pub struct PackageArchive {
    package: String,
    entries: Vec<ArchiveEntry>,
}

impl PackageArchive {
    /// Parse zip bytes.
    ///
    /// Every file entry is read and decompressed up front, so a damaged
    /// archive is rejected before anything is written.
    pub fn from_bytes(package: &str, bytes: &[u8]) -> Result<Self> {
        let corrupt = |reason: String| BundleError::ArchiveCorrupt {
            package: package.to_string(),
            reason,
        };

        let mut zip = ZipArchive::new(Cursor::new(bytes)).map_err(|e| corrupt(e.to_string()))?;
        let mut entries = Vec::with_capacity(zip.len());

        for index in 0..zip.len() {
            let mut file = zip.by_index(index).map_err(|e| corrupt(e.to_string()))?;
            if file.is_dir() {
                continue;
            }

            let raw_name = file.name().to_string();
            let path = normalize_entry_path(&raw_name)
                .ok_or_else(|| corrupt(format!("unsafe entry path {:?}", raw_name)))?;
            if path.is_empty() {
                continue;
            }

            // The declared size comes from the archive and is not trusted
            let mut contents = Vec::new();
            file.read_to_end(&mut contents)
                .map_err(|e| corrupt(format!("{}: {}", raw_name, e)))?;

            entries.push(ArchiveEntry { path, contents });
        }

        Ok(Self {
            package: package.to_string(),
            entries,
        })
    }

    /// Read and parse an archive file
    pub fn open(package: &str, path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| BundleError::io_at(path, e))?;
        Self::from_bytes(package, &bytes)
    }

    /// Package id the archive belongs to
    pub fn package(&self) -> &str {
        &self.package
    }

    #[cfg(test)]
    pub(crate) fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Entries that get written to the bundle
    pub fn installable(&self) -> Vec<&ArchiveEntry> {
        self.entries.iter().filter(|e| !e.is_excluded()).collect()
    }
}

/// Normalize an archive entry name to a safe relative `/`-separated path.
///
/// Returns `None` for names that would escape the extraction root.
pub fn normalize_entry_path(name: &str) -> Option<String> {
    let unified = name.replace('\\', "/");
    if unified.starts_with('/') {
        return None;
    }

    let mut parts = Vec::new();
    for part in unified.split('/') {
        match part {
            "" | "." => continue,
            ".." => return None,
            p if p.contains(':') => return None,
            p => parts.push(p),
        }
    }

    Some(parts.join("/"))
}

/// Where an archive's contents are rooted in the bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementMode {
    /// Ships the loader itself under `BepInExPack/`
    LoaderCore,
    /// Ships a `BepInEx/` tree
    LoaderRooted,
    /// Ships loader subfolders such as `plugins/` or `config/`
    SubfolderRooted,
    /// Ships plugin files with no recognized layout
    Plugin,
}

impl fmt::Display for PlacementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementMode::LoaderCore => write!(f, "loader core"),
            PlacementMode::LoaderRooted => write!(f, "loader rooted"),
            PlacementMode::SubfolderRooted => write!(f, "subfolder rooted"),
            PlacementMode::Plugin => write!(f, "plugin"),
        }
    }
}

fn subfolder_name(segment: &str) -> Option<&'static str> {
    LOADER_SUBFOLDERS
        .iter()
        .copied()
        .find(|s| s.eq_ignore_ascii_case(segment))
}

/// Decide the placement of an archive from its installable entries
pub fn classify(entries: &[&ArchiveEntry]) -> PlacementMode {
    let segments: Vec<&str> = entries.iter().map(|e| e.first_segment()).collect();

    if segments.iter().any(|s| *s == LOADER_CORE_FOLDER) {
        PlacementMode::LoaderCore
    } else if segments.iter().any(|s| s.eq_ignore_ascii_case(LOADER_FOLDER)) {
        PlacementMode::LoaderRooted
    } else if segments.iter().any(|s| subfolder_name(s).is_some()) {
        PlacementMode::SubfolderRooted
    } else {
        PlacementMode::Plugin
    }
}

/// Path of an entry relative to the destination root.
///
/// A recognized first segment is rewritten to the scaffold's spelling so
/// case variants land in the existing folders.
fn relative_path(entry: &ArchiveEntry, mode: PlacementMode) -> String {
    let first = entry.first_segment();
    let canonical = match mode {
        PlacementMode::LoaderRooted if first.eq_ignore_ascii_case(LOADER_FOLDER) => {
            Some(LOADER_FOLDER)
        }
        PlacementMode::SubfolderRooted => subfolder_name(first),
        _ => None,
    };

    match canonical {
        Some(name) => format!("{}{}", name, &entry.path[first.len()..]),
        None => entry.path.clone(),
    }
}

/// Result of installing one package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallOutcome {
    pub mode: PlacementMode,
    /// Number of archive entries written
    pub files: usize,
}

/// Lays package archives out into a bundle
pub struct ArchiveInstaller<'a> {
    reporter: &'a dyn Reporter,
}

impl<'a> ArchiveInstaller<'a> {
    pub fn new(reporter: &'a dyn Reporter) -> Self {
        Self { reporter }
    }

    /// Install one package archive into the tree.
    ///
    /// `rank` is the package's position in the install order; packages with a
    /// higher rank are installed later and win path conflicts.
    pub fn install(
        &self,
        tree: &mut TargetTree,
        record: &PackageRecord,
        archive: &PackageArchive,
        rank: usize,
    ) -> Result<InstallOutcome> {
        tracing::debug!("Verifying: {}", archive.package());

        let entries = archive.installable();
        let mode = classify(&entries);

        let root = match mode {
            PlacementMode::LoaderCore | PlacementMode::LoaderRooted => tree.base().to_path_buf(),
            PlacementMode::SubfolderRooted => tree.loader_dir(),
            PlacementMode::Plugin => tree.plugins_dir(),
        };

        tracing::debug!(
            "Unpacking {} as {} into {}",
            archive.package(),
            mode,
            root.display()
        );

        for entry in &entries {
            let dest = root.join(relative_path(entry, mode));
            write_file(&dest, &entry.contents)?;
        }

        if mode == PlacementMode::LoaderCore {
            tracing::info!("BepInEx detected: {}", archive.package());
            let pack = root.join(LOADER_CORE_FOLDER);
            if pack.is_dir() {
                merge_dir(&pack, &root)?;
                fs::remove_dir_all(&pack).map_err(|e| BundleError::io_at(&pack, e))?;
            }
        }

        let outcome = InstallOutcome {
            mode,
            files: entries.len(),
        };
        self.reporter.installed(record, rank, mode, outcome.files);
        Ok(outcome)
    }
}

fn write_file(dest: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| BundleError::io_at(parent, e))?;
    }
    fs::write(dest, contents).map_err(|e| BundleError::io_at(dest, e))
}

/// Copy everything under `src` into `dest`, replacing existing files
fn merge_dir(src: &Path, dest: &Path) -> Result<()> {
    for entry in fs::read_dir(src).map_err(|e| BundleError::io_at(src, e))? {
        let entry = entry.map_err(|e| BundleError::io_at(src, e))?;
        let from = entry.path();
        let to: PathBuf = dest.join(entry.file_name());

        if from.is_dir() {
            fs::create_dir_all(&to).map_err(|e| BundleError::io_at(&to, e))?;
            merge_dir(&from, &to)?;
        } else {
            fs::copy(&from, &to).map_err(|e| BundleError::io_at(&to, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::package::tests::record;
    use crate::report::Silent;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    pub(crate) fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in files {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn install(tree: &mut TargetTree, name: &str, files: &[(&str, &str)]) -> InstallOutcome {
        let archive = PackageArchive::from_bytes(name, &zip_bytes(files)).unwrap();
        ArchiveInstaller::new(&Silent)
            .install(tree, &record(name, &[]), &archive, 0)
            .unwrap()
    }

    fn new_tree() -> (tempfile::TempDir, TargetTree) {
        let dir = tempfile::tempdir().unwrap();
        let tree = TargetTree::create(&dir.path().join("bundle")).unwrap();
        (dir, tree)
    }

    fn read(tree: &TargetTree, rel: &str) -> String {
        fs::read_to_string(tree.base().join(rel)).unwrap()
    }

    fn entry(path: &str) -> ArchiveEntry {
        ArchiveEntry::new(path, Vec::new())
    }

    #[test]
    fn test_classify_precedence() {
        let core = [entry("BepInExPack/core/loader.dll"), entry("BepInEx/plugins/a.dll")];
        assert_eq!(classify(&core.iter().collect::<Vec<_>>()), PlacementMode::LoaderCore);

        let rooted = [entry("bepinex/plugins/a.dll"), entry("plugins/b.dll")];
        assert_eq!(classify(&rooted.iter().collect::<Vec<_>>()), PlacementMode::LoaderRooted);

        let sub = [entry("Config/a.cfg"), entry("readme.txt")];
        assert_eq!(classify(&sub.iter().collect::<Vec<_>>()), PlacementMode::SubfolderRooted);

        let plugin = [entry("MyMod/mod.dll")];
        assert_eq!(classify(&plugin.iter().collect::<Vec<_>>()), PlacementMode::Plugin);

        assert_eq!(classify(&[]), PlacementMode::Plugin);
    }

    #[test]
    fn test_loader_core_match_is_case_sensitive() {
        let entries = [entry("bepinexpack/core/loader.dll")];
        assert_eq!(classify(&entries.iter().collect::<Vec<_>>()), PlacementMode::Plugin);
    }

    #[test]
    fn test_subfolder_archive_lands_under_loader() {
        let (_dir, mut tree) = new_tree();

        let outcome = install(&mut tree, "Sub", &[("Plugins/Sub/sub.dll", "sub")]);

        assert_eq!(outcome.mode, PlacementMode::SubfolderRooted);
        assert_eq!(read(&tree, "BepInEx/plugins/Sub/sub.dll"), "sub");
    }

    #[test]
    fn test_generic_archive_lands_under_plugins() {
        let (_dir, mut tree) = new_tree();

        let outcome = install(&mut tree, "MyMod", &[("MyMod/mod.dll", "mod")]);

        assert_eq!(outcome.mode, PlacementMode::Plugin);
        assert_eq!(outcome.files, 1);
        assert_eq!(read(&tree, "BepInEx/plugins/MyMod/mod.dll"), "mod");
    }

    #[test]
    fn test_loader_rooted_archive_lands_at_base() {
        let (_dir, mut tree) = new_tree();

        let outcome = install(
            &mut tree,
            "Rooted",
            &[("bepinex/config/rooted.cfg", "cfg"), ("extra.txt", "x")],
        );

        assert_eq!(outcome.mode, PlacementMode::LoaderRooted);
        assert_eq!(read(&tree, "BepInEx/config/rooted.cfg"), "cfg");
        assert_eq!(read(&tree, "extra.txt"), "x");
    }

    #[test]
    fn test_loader_core_merge() {
        let (_dir, mut tree) = new_tree();

        let outcome = install(
            &mut tree,
            "BepInExPack",
            &[
                ("BepInExPack/core/loader.dll", "loader"),
                ("BepInExPack/BepInEx/core/BepInEx.dll", "bepinex"),
                ("BepInExPack/winhttp.dll", "proxy"),
                ("manifest.json", "{}"),
            ],
        );

        assert_eq!(outcome.mode, PlacementMode::LoaderCore);
        assert_eq!(read(&tree, "core/loader.dll"), "loader");
        assert_eq!(read(&tree, "BepInEx/core/BepInEx.dll"), "bepinex");
        assert_eq!(read(&tree, "winhttp.dll"), "proxy");
        assert!(!tree.base().join("BepInExPack").exists());
    }

    #[test]
    fn test_metadata_files_never_written() {
        for files in [
            vec![("manifest.json", "{}"), ("icon.png", "png"), ("Mod.dll", "dll")],
            vec![("manifest.json", "{}"), ("plugins/Mod.dll", "dll")],
            vec![("manifest.json", "{}"), ("README.md", "# Mod"), ("BepInEx/plugins/Mod.dll", "dll")],
        ] {
            let (_dir, mut tree) = new_tree();
            install(&mut tree, "Mod", &files);

            for root in ["", "BepInEx", "BepInEx/plugins"] {
                let base = tree.base().join(root);
                assert!(!base.join("manifest.json").exists(), "manifest in {:?}", root);
                assert!(!base.join("icon.png").exists());
                assert!(!base.join("README.md").exists());
            }
            assert_eq!(read(&tree, "BepInEx/plugins/Mod.dll"), "dll");
        }
    }

    #[test]
    fn test_metadata_only_archive_writes_nothing() {
        let (_dir, mut tree) = new_tree();

        let outcome = install(
            &mut tree,
            "Modpack",
            &[("manifest.json", "{}"), ("icon.png", "png"), ("CHANGELOG.md", "")],
        );

        assert_eq!(outcome.files, 0);
        assert_eq!(fs::read_dir(tree.plugins_dir()).unwrap().count(), 0);
    }

    #[test]
    fn test_later_install_overwrites() {
        let (_dir, mut tree) = new_tree();

        install(&mut tree, "Dep", &[("plugins/x.dll", "D")]);
        install(&mut tree, "Req", &[("plugins/x.dll", "R")]);

        assert_eq!(read(&tree, "BepInEx/plugins/x.dll"), "R");
    }

    #[test]
    fn test_from_bytes_skips_directories() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .add_directory("MyMod/", SimpleFileOptions::default())
            .unwrap();
        writer
            .start_file("MyMod\\mod.dll", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"mod").unwrap();
        writer
            .start_file("manifest.json", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"{}").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let archive = PackageArchive::from_bytes("MyMod", &bytes).unwrap();

        let paths: Vec<&str> = archive.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["MyMod/mod.dll", "manifest.json"]);
        assert_eq!(archive.installable().len(), 1);
        assert_eq!(archive.package(), "MyMod");
    }

    #[test]
    fn test_forged_entry_size_is_not_trusted() {
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("mod.dll", options).unwrap();
        writer.write_all(b"mod").unwrap();
        let mut bytes = writer.finish().unwrap().into_inner();

        // Central directory header: uncompressed size sits 24 bytes in
        let header = bytes
            .windows(4)
            .position(|w| w == [0x50, 0x4b, 0x01, 0x02])
            .unwrap();
        bytes[header + 24..header + 28].copy_from_slice(&0xFFFF_FFFEu32.to_le_bytes());

        match PackageArchive::from_bytes("Forged", &bytes) {
            Ok(archive) => assert_eq!(archive.entries()[0].contents, b"mod"),
            Err(BundleError::ArchiveCorrupt { package, .. }) => assert_eq!(package, "Forged"),
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_corrupt_archive_names_package() {
        let err = PackageArchive::from_bytes("Broken_2024-01-01_1.0.0", b"definitely not a zip")
            .unwrap_err();

        match err {
            BundleError::ArchiveCorrupt { package, .. } => {
                assert_eq!(package, "Broken_2024-01-01_1.0.0")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_normalize_entry_path() {
        assert_eq!(normalize_entry_path("a/b.dll").as_deref(), Some("a/b.dll"));
        assert_eq!(normalize_entry_path("a\\b.dll").as_deref(), Some("a/b.dll"));
        assert_eq!(normalize_entry_path("./a//b.dll").as_deref(), Some("a/b.dll"));
        assert_eq!(normalize_entry_path("a/").as_deref(), Some("a"));
        assert_eq!(normalize_entry_path("../evil.dll"), None);
        assert_eq!(normalize_entry_path("a/../../evil.dll"), None);
        assert_eq!(normalize_entry_path("/etc/passwd"), None);
        assert_eq!(normalize_entry_path("C:/evil.dll"), None);
    }

    #[test]
    fn test_relative_path_canonicalizes_recognized_segment() {
        assert_eq!(
            relative_path(&entry("BEPINEX/plugins/a.dll"), PlacementMode::LoaderRooted),
            "BepInEx/plugins/a.dll"
        );
        assert_eq!(
            relative_path(&entry("Config/a.cfg"), PlacementMode::SubfolderRooted),
            "config/a.cfg"
        );
        assert_eq!(
            relative_path(&entry("other/a.txt"), PlacementMode::SubfolderRooted),
            "other/a.txt"
        );
        assert_eq!(
            relative_path(&entry("Plugins/a.dll"), PlacementMode::Plugin),
            "Plugins/a.dll"
        );
    }
}

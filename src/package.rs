//! Package types and operations

use std::fmt;

use chrono::NaiveDate;

/// Canonical locator of a package page, used as its identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageReference(String);

impl PackageReference {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PackageReference {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Latest release of a package, as reported by a metadata provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    /// Display name
    pub name: String,

    /// Reference this record was resolved from
    pub reference: PackageReference,

    /// Version of the latest release
    pub version: String,

    /// Date of the latest release
    pub release_date: NaiveDate,

    /// Where the release archive can be downloaded
    pub download_locator: String,

    /// Dependency references, in provider order
    pub dependencies: Vec<PackageReference>,
}

impl PackageRecord {
    /// Stable key for the on-disk archive of this release
    pub fn full_id(&self) -> String {
        format!(
            "{}_{}_{}",
            self.name,
            self.release_date.format("%Y-%m-%d"),
            self.version
        )
    }
}

/// Output of dependency resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionResult {
    /// Packages named directly by the caller, in resolution order
    pub requested: Vec<PackageRecord>,

    /// Packages pulled in only as dependencies, in discovery order
    pub transitive: Vec<PackageRecord>,
}

impl ResolutionResult {
    /// All records in discovery order (requested first)
    pub fn all(&self) -> impl Iterator<Item = &PackageRecord> {
        self.requested.iter().chain(self.transitive.iter())
    }

    /// Total number of resolved packages
    pub fn len(&self) -> usize {
        self.requested.len() + self.transitive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requested.is_empty() && self.transitive.is_empty()
    }

    /// Records in installation order.
    ///
    /// Transitive records come first and requested records last, each group
    /// reversed, so that later installs overwrite earlier ones in favour of
    /// the user's explicit picks and of shallower dependencies.
    pub fn install_order(&self) -> Vec<&PackageRecord> {
        self.transitive
            .iter()
            .rev()
            .chain(self.requested.iter().rev())
            .collect()
    }

    /// Whether a reference was explicitly requested
    pub fn is_requested(&self, reference: &PackageReference) -> bool {
        self.requested.iter().any(|r| &r.reference == reference)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn record(name: &str, deps: &[&str]) -> PackageRecord {
        PackageRecord {
            name: name.to_string(),
            reference: PackageReference::new(name),
            version: "1.0.0".to_string(),
            release_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            download_locator: format!("https://example.invalid/{}.zip", name),
            dependencies: deps.iter().map(|d| PackageReference::new(*d)).collect(),
        }
    }

    #[test]
    fn test_full_id_format() {
        let rec = record("LethalLib", &[]);
        assert_eq!(rec.full_id(), "LethalLib_2024-01-15_1.0.0");
    }

    #[test]
    fn test_install_order_puts_requested_last() {
        let result = ResolutionResult {
            requested: vec![record("A", &["C"]), record("B", &["D"])],
            transitive: vec![record("C", &[]), record("D", &[])],
        };

        let order: Vec<&str> = result
            .install_order()
            .into_iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(order, vec!["D", "C", "B", "A"]);
    }

    #[test]
    fn test_is_requested() {
        let result = ResolutionResult {
            requested: vec![record("A", &["C"])],
            transitive: vec![record("C", &[])],
        };
        assert!(result.is_requested(&PackageReference::new("A")));
        assert!(!result.is_requested(&PackageReference::new("C")));
        assert_eq!(result.len(), 2);
    }
}

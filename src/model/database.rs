use serde::Serialize;
use std::collections::HashMap;

/// Removes every whitespace character from a package name.
///
/// Both database names and dependency names go through this before they
/// are compared, so `" lo dash "` and `"lodash"` refer to the same package.
pub fn normalize_name(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect()
}

/// A package with the versions known to be affected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VulnerablePackage {
    name: String,
    affected_versions: Vec<String>,
}

impl VulnerablePackage {
    pub fn new(name: impl AsRef<str>, affected_versions: Vec<String>) -> Self {
        Self {
            name: normalize_name(name.as_ref()),
            affected_versions,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Affected versions in the order they appeared in the source row.
    pub fn affected_versions(&self) -> &[String] {
        &self.affected_versions
    }

    /// Exact string comparison, no range semantics.
    pub fn is_affected(&self, version: &str) -> bool {
        self.affected_versions.iter().any(|v| v == version)
    }
}

/// In-memory vulnerability database for a single scan.
///
/// Entries keep their load order. Rows sharing a name stay separate
/// entries and are all returned by [`lookup`](Self::lookup).
#[derive(Debug, Clone, Default, Serialize)]
pub struct VersionDatabase {
    entries: Vec<VulnerablePackage>,
    #[serde(skip)]
    index: HashMap<String, Vec<usize>>,
}

impl VersionDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, package: VulnerablePackage) {
        self.index
            .entry(package.name.clone())
            .or_default()
            .push(self.entries.len());
        self.entries.push(package);
    }

    pub fn entries(&self) -> &[VulnerablePackage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries whose name equals `name` after whitespace normalization.
    pub fn lookup<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a VulnerablePackage> + 'a {
        self.index
            .get(&normalize_name(name))
            .into_iter()
            .flatten()
            .map(move |&i| &self.entries[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&normalize_name(name))
    }
}

impl FromIterator<VulnerablePackage> for VersionDatabase {
    fn from_iter<I: IntoIterator<Item = VulnerablePackage>>(iter: I) -> Self {
        let mut db = VersionDatabase::new();
        for package in iter {
            db.insert(package);
        }
        db
    }
}

use serde::Serialize;
use std::fmt;

/// Separator used when a [`DependencyPath`] is rendered as text.
pub const PATH_SEPARATOR: &str = " -> ";

/// One `name@version` step of a dependency chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub name: String,
    pub version: String,
}

impl Breadcrumb {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for Breadcrumb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// The chain of packages from a direct dependency down to an instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DependencyPath(Vec<Breadcrumb>);

impl DependencyPath {
    pub fn new(crumbs: Vec<Breadcrumb>) -> Self {
        Self(crumbs)
    }

    pub fn breadcrumbs(&self) -> &[Breadcrumb] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DependencyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, crumb) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(PATH_SEPARATOR)?;
            }
            write!(f, "{}", crumb)?;
        }
        Ok(())
    }
}

/// A package occurrence found in the dependency listing.
///
/// The same package may appear many times at different versions or through
/// different parents; every occurrence is its own instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyInstance {
    pub name: String,
    pub version: String,
    pub path: DependencyPath,
    /// Declared by the project itself rather than pulled in by another package.
    pub is_direct: bool,
}

impl DependencyInstance {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        path: DependencyPath,
        is_direct: bool,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            path,
            is_direct,
        }
    }

    /// A top-level dependency whose path is only itself.
    pub fn direct(name: impl Into<String>, version: impl Into<String>) -> Self {
        let name = name.into();
        let version = version.into();
        let path = DependencyPath::new(vec![Breadcrumb::new(&name, &version)]);
        Self::new(name, version, path, true)
    }
}

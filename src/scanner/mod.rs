//! Obtaining and reconstructing the dependency listing.
//!
//! A [`DependencyLister`] produces the raw text of `npm list --json --all`
//! for a project; [`TreeReconstructor`] turns that text into
//! [`DependencyInstance`](crate::model::DependencyInstance)s.
//!
//! | Lister | Source |
//! |--------|--------|
//! | [`NpmLister`] | Runs npm in the project directory |
//! | [`ListingFile`] | Reads a listing saved earlier |
//!
//! # Example
//!
//! ```no_run
//! use npm_vulnscan::scanner::{DependencyLister, NpmLister, TreeReconstructor};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let listing = NpmLister::new("./my-app").list().await?;
//!     let deps = TreeReconstructor::new().reconstruct(listing.as_slice())?;
//!     println!("Found {} dependencies", deps.len());
//!     Ok(())
//! }
//! ```

mod npm;
mod tree;

pub use npm::{default_npm_program, NpmLister};
pub use tree::{TreeReconstructor, DEFAULT_MAX_DEPTH};

use crate::error::{Result, ScanError};
use async_trait::async_trait;
use std::path::PathBuf;

/// Source of a dependency listing.
///
/// Implementations only produce text; they never interpret it, so the
/// reconstructor and matcher can be exercised without a package manager.
#[async_trait]
pub trait DependencyLister: Send + Sync {
    /// Returns the human-readable name of this lister.
    fn name(&self) -> &'static str;

    /// Produces the full listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be obtained at all (missing
    /// project manifest, npm not installed, unreadable file).
    async fn list(&self) -> Result<Vec<u8>>;
}

/// A listing previously written to disk, e.g. by `npm list --json --all > deps.json`.
pub struct ListingFile {
    path: PathBuf,
}

impl ListingFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DependencyLister for ListingFile {
    fn name(&self) -> &'static str {
        "saved listing"
    }

    async fn list(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| ScanError::read(&self.path, e))
    }
}

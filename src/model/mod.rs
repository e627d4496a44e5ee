//! Core data types for the vulnerability database, the reconstructed
//! dependency tree and scan outcomes.
//!
//! - [`VulnerablePackage`] - A package name with its known-affected versions
//! - [`VersionDatabase`] - All vulnerable packages loaded for one scan
//! - [`DependencyInstance`] - One occurrence of a package in the dependency tree
//! - [`MatchResult`] - A dependency instance flagged by the matcher
//! - [`ScanOutcome`] - Confirmed and uncertain matches of a scan
//!
//! # Example
//!
//! ```
//! use npm_vulnscan::model::{DependencyInstance, VersionDatabase, VulnerablePackage};
//!
//! let mut db = VersionDatabase::new();
//! db.insert(VulnerablePackage::new("lodash", vec!["4.17.19".to_string()]));
//!
//! let dep = DependencyInstance::direct("lodash", "4.17.19");
//! assert!(db.lookup(&dep.name).any(|entry| entry.is_affected(&dep.version)));
//! ```

mod database;
mod dependency;
mod outcome;

pub use database::*;
pub use dependency::*;
pub use outcome::*;

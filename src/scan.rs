//! The scan pipeline: database, listing, reconstruction, matching.
//!
//! Everything a scan needs is passed in through a [`ScanContext`] built per
//! invocation, and everything it produces comes back in a [`ScanReport`].
//! Nothing is shared between scans, so independent scans may run side by
//! side.

use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{info, warn};

use crate::checker::Matcher;
use crate::database::{self, CsvColumns};
use crate::error::Result;
use crate::model::{DependencyInstance, ScanOutcome, VersionDatabase};
use crate::scanner::{DependencyLister, TreeReconstructor, DEFAULT_MAX_DEPTH};

/// Inputs of a single scan.
#[derive(Debug, Clone)]
pub struct ScanContext {
    /// CSV vulnerability database.
    pub csv_path: PathBuf,
    pub columns: CsvColumns,
    /// Deepest nesting level whose packages are recorded.
    pub max_depth: usize,
}

impl ScanContext {
    pub fn new(csv_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
            columns: CsvColumns::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_columns(mut self, columns: CsvColumns) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Everything produced by one scan; the input of every report format.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub scanned_at: DateTime<Local>,
    pub database: VersionDatabase,
    pub dependencies: Vec<DependencyInstance>,
    pub outcome: ScanOutcome,
}

/// Runs a full scan.
///
/// # Errors
///
/// Fails if the database cannot be read or the lister cannot produce a
/// listing. Malformed rows and listing lines never fail the scan.
pub async fn run_scan(context: &ScanContext, lister: &dyn DependencyLister) -> Result<ScanReport> {
    let database = database::load_csv(&context.csv_path, context.columns)?;
    if database.is_empty() {
        warn!(path = %context.csv_path.display(), "vulnerability database is empty");
    }

    info!(lister = lister.name(), "listing dependencies");
    let listing = lister.list().await?;

    Ok(analyze(context, database, &listing))
}

/// Reconstructs and matches an already obtained listing.
pub fn analyze(context: &ScanContext, database: VersionDatabase, listing: &[u8]) -> ScanReport {
    // Reading from a byte slice cannot fail.
    let dependencies = TreeReconstructor::with_max_depth(context.max_depth)
        .reconstruct(listing)
        .unwrap_or_default();
    if dependencies.is_empty() {
        warn!(
            "no dependencies found; the project may have none, or npm printed an error instead of a tree"
        );
    } else {
        info!(dependencies = dependencies.len(), "reconstructed dependency tree");
    }

    let outcome = Matcher::new(&database).check(&dependencies);
    info!(
        confirmed = outcome.confirmed_count(),
        warnings = outcome.warning_count(),
        "matched dependencies against database"
    );

    ScanReport {
        scanned_at: Local::now(),
        database,
        dependencies,
        outcome,
    }
}

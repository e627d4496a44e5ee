//! Error type shared by the scan stages.
//!
//! Only unreadable sources and a failed npm invocation abort a scan.
//! Malformed CSV rows and listing lines are skipped where they are read
//! and never surface as a [`ScanError`].

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// A database file or dependency listing could not be opened or read.
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The project directory has no `package.json`.
    #[error("no package.json found in {0}")]
    MissingManifest(PathBuf),

    /// The package manager could not be started at all.
    #[error("failed to execute `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Every listing command exited unsuccessfully without printing a tree.
    #[error("`{command}` failed ({status}) and produced no dependency listing")]
    ListingFailed { command: String, status: String },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid CSV columns: {0}")]
    InvalidColumns(String),
}

impl ScanError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ScanError::Read {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = ScanError> = std::result::Result<T, E>;

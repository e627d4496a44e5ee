pub mod checker;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod model;
pub mod output;
pub mod scan;
pub mod scanner;

pub use checker::Matcher;
pub use config::Config;
pub use error::ScanError;
pub use model::{DependencyInstance, MatchResult, ScanOutcome, VersionDatabase, VulnerablePackage};
pub use scan::{run_scan, ScanContext, ScanReport};
pub use scanner::{DependencyLister, TreeReconstructor};

use serde::Serialize;
use std::fmt;

use super::{DependencyInstance, DependencyPath};

/// Why a dependency instance was flagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchBasis {
    /// Exact name, and the used version is listed as affected.
    AffectedVersion { version: String },
    /// Names differ only in ASCII case.
    CaseInsensitiveName,
    /// Names agree once an `@scope/` prefix is dropped.
    ScopeStrippedName,
    /// One name appears as a delimited part of the other.
    NameContainment,
}

impl MatchBasis {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, MatchBasis::AffectedVersion { .. })
    }

    /// Lower is stronger. Used to pick between several partial candidates.
    pub fn rank(&self) -> u8 {
        match self {
            MatchBasis::AffectedVersion { .. } => 0,
            MatchBasis::CaseInsensitiveName => 1,
            MatchBasis::ScopeStrippedName => 2,
            MatchBasis::NameContainment => 3,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            MatchBasis::AffectedVersion { .. } => "affected version",
            MatchBasis::CaseInsensitiveName => "name differs only in case",
            MatchBasis::ScopeStrippedName => "same name outside npm scope",
            MatchBasis::NameContainment => "name contains database entry",
        }
    }
}

impl fmt::Display for MatchBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A dependency instance tied to the database entry that flagged it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub name: String,
    pub version: String,
    pub path: DependencyPath,
    pub is_direct: bool,
    /// Name of the matched database entry.
    pub entry_name: String,
    pub basis: MatchBasis,
}

impl MatchResult {
    pub fn new(instance: &DependencyInstance, entry_name: impl Into<String>, basis: MatchBasis) -> Self {
        Self {
            name: instance.name.clone(),
            version: instance.version.clone(),
            path: instance.path.clone(),
            is_direct: instance.is_direct,
            entry_name: entry_name.into(),
            basis,
        }
    }

    /// The affected version that triggered a confirmed match.
    pub fn affected_version(&self) -> Option<&str> {
        match &self.basis {
            MatchBasis::AffectedVersion { version } => Some(version),
            _ => None,
        }
    }
}

/// How a single dependency instance relates to the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Vulnerable(MatchResult),
    /// Known package, but the used version is not listed as affected.
    Safe {
        entry_name: String,
        affected_versions: Vec<String>,
    },
    Warning(MatchResult),
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScanStatus {
    Vulnerable,
    Warning,
    Ok,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Vulnerable => "VULNERABLE",
            ScanStatus::Warning => "WARNING",
            ScanStatus::Ok => "OK",
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confirmed and uncertain matches of one scan, in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanOutcome {
    pub confirmed: Vec<MatchResult>,
    pub warnings: Vec<MatchResult>,
}

impl ScanOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirmed_count(&self) -> usize {
        self.confirmed.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Confirmed matches on direct dependencies.
    pub fn direct_count(&self) -> usize {
        self.confirmed.iter().filter(|m| m.is_direct).count()
    }

    pub fn indirect_count(&self) -> usize {
        self.confirmed_count() - self.direct_count()
    }

    pub fn status(&self) -> ScanStatus {
        if !self.confirmed.is_empty() {
            ScanStatus::Vulnerable
        } else if !self.warnings.is_empty() {
            ScanStatus::Warning
        } else {
            ScanStatus::Ok
        }
    }

    pub fn has_vulnerabilities(&self) -> bool {
        !self.confirmed.is_empty()
    }
}

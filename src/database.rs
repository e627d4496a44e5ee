//! Loading the vulnerability database from a CSV file.
//!
//! The file has one header line followed by one row per package. Two
//! columns are used: the package name and a cell of whitespace-separated
//! affected versions. Any other columns (severity, notes) are ignored.
//!
//! ```text
//! Package,Versions,Severity
//! lodash,4.17.20 4.17.19,High
//! express,4.17.0 4.16.4,Medium
//! ```
//!
//! Rows that cannot be used are skipped with a warning; only an unreadable
//! file fails the load.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use tracing::{info, warn};

use crate::error::{Result, ScanError};
use crate::model::{normalize_name, VersionDatabase, VulnerablePackage};

/// 0-based indices of the CSV columns holding names and versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvColumns {
    pub name: usize,
    pub versions: usize,
}

impl CsvColumns {
    /// Builds column indices from the 1-based numbers users type.
    pub fn from_one_based(name: usize, versions: usize) -> Result<Self> {
        if name == 0 || versions == 0 {
            return Err(ScanError::InvalidColumns(format!(
                "column numbers start at 1 (got name={}, versions={})",
                name, versions
            )));
        }
        Ok(Self {
            name: name - 1,
            versions: versions - 1,
        })
    }

    fn required(&self) -> usize {
        self.name.max(self.versions) + 1
    }
}

impl Default for CsvColumns {
    fn default() -> Self {
        Self {
            name: 0,
            versions: 1,
        }
    }
}

/// Loads the database from a CSV file on disk.
pub fn load_csv(path: &Path, columns: CsvColumns) -> Result<VersionDatabase> {
    let file = File::open(path).map_err(|e| ScanError::read(path, e))?;
    let db = from_reader(BufReader::new(file), columns).map_err(|e| ScanError::read(path, e))?;
    info!(path = %path.display(), packages = db.len(), "loaded vulnerability database");
    Ok(db)
}

/// Parses CSV rows from any buffered reader.
pub fn from_reader<R: BufRead>(mut reader: R, columns: CsvColumns) -> io::Result<VersionDatabase> {
    let mut db = VersionDatabase::new();
    let mut buf = Vec::new();
    let mut line_number = 0usize;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_number += 1;

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        if line_number == 1 || line.trim().is_empty() {
            continue;
        }

        if let Some(package) = parse_row(line, line_number, columns) {
            db.insert(package);
        }
    }

    Ok(db)
}

fn parse_row(line: &str, line_number: usize, columns: CsvColumns) -> Option<VulnerablePackage> {
    // Empty cells keep their position, so `lodash,,4.17.19` has its
    // versions in the third column, not the second.
    let cells: Vec<&str> = line.split(',').map(unquote).collect();

    if cells.len() < columns.required() {
        warn!(
            line = line_number,
            found = cells.len(),
            needed = columns.required(),
            "skipping row with insufficient columns"
        );
        return None;
    }

    let name = clean_package_name(cells[columns.name]);
    if name.is_empty() {
        warn!(line = line_number, "skipping row with empty package name");
        return None;
    }

    let versions = parse_versions(cells[columns.versions]);
    if versions.is_empty() {
        warn!(line = line_number, package = %name, "skipping row without versions");
        return None;
    }

    Some(VulnerablePackage::new(name, versions))
}

fn unquote(cell: &str) -> &str {
    let trimmed = cell.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed)
}

/// Splits a versions cell on whitespace.
pub fn parse_versions(cell: &str) -> Vec<String> {
    cell.split_whitespace().map(str::to_string).collect()
}

/// Normalizes a package name cell.
///
/// Whitespace is removed, and a trailing `@<version>` that was pasted into
/// the name column is cut off. A leading `@` is an npm scope and is kept.
pub fn clean_package_name(raw: &str) -> String {
    let mut name = normalize_name(raw);
    if let Some(at) = name.rfind('@') {
        if at > 0 && looks_like_version(&name[at + 1..]) {
            name.truncate(at);
        }
    }
    name
}

fn looks_like_version(s: &str) -> bool {
    s.chars()
        .any(|c| c.is_ascii_digit() || c == '.' || c == '-' || c == 'v')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;

    fn load(content: &str) -> VersionDatabase {
        from_reader(Cursor::new(content), CsvColumns::default()).unwrap()
    }

    #[test]
    fn test_loads_rows_and_skips_header() {
        let db = load(
            "Package,Versions,Severity\n\
             lodash,4.17.20 4.17.19,High\n\
             express,4.17.0 4.16.4,Medium\n",
        );

        assert_eq!(db.len(), 2);
        assert_eq!(db.entries()[0].name(), "lodash");
        assert_eq!(db.entries()[0].affected_versions(), ["4.17.20", "4.17.19"]);
        assert_eq!(db.entries()[1].name(), "express");
    }

    #[test]
    fn test_skips_bad_rows() {
        let db = load(
            "Package,Versions\n\
             \n\
             only-one-column\n\
             ,1.0.0\n\
             no-versions,   \n\
             moment,2.29.1\r\n",
        );

        assert_eq!(db.len(), 1);
        assert_eq!(db.entries()[0].name(), "moment");
        assert_eq!(db.entries()[0].affected_versions(), ["2.29.1"]);
    }

    #[test]
    fn test_custom_columns() {
        let columns = CsvColumns::from_one_based(2, 4).unwrap();
        let db = from_reader(
            Cursor::new("id,name,severity,versions\n1,axios,high,0.21.0 0.18.0\n"),
            columns,
        )
        .unwrap();

        assert_eq!(db.len(), 1);
        assert_eq!(db.entries()[0].name(), "axios");
        assert_eq!(db.entries()[0].affected_versions(), ["0.21.0", "0.18.0"]);
    }

    #[test]
    fn test_empty_cells_keep_column_positions() {
        let db = load("Package,Versions\nlodash,,4.17.19\n");
        assert!(db.is_empty());

        let columns = CsvColumns::from_one_based(1, 3).unwrap();
        let db = from_reader(Cursor::new("Package,Notes,Versions\nlodash,,4.17.19\n"), columns).unwrap();
        assert_eq!(db.len(), 1);
        assert_eq!(db.entries()[0].affected_versions(), ["4.17.19"]);
    }

    #[test]
    fn test_zero_column_rejected() {
        assert!(matches!(
            CsvColumns::from_one_based(0, 2),
            Err(ScanError::InvalidColumns(_))
        ));
    }

    #[test]
    fn test_clean_package_name() {
        assert_eq!(clean_package_name(" lodash "), "lodash");
        assert_eq!(clean_package_name("lodash@4.17.19"), "lodash");
        assert_eq!(clean_package_name("@babel/core"), "@babel/core");
        assert_eq!(clean_package_name("@babel/core@7.0.0"), "@babel/core");
        assert_eq!(clean_package_name("pkg@latest"), "pkg@latest");
    }

    #[test]
    fn test_quoted_cells() {
        let db = load("name,versions\n\"lodash\",\"4.17.19 4.17.20\"\n");
        assert_eq!(db.entries()[0].name(), "lodash");
        assert_eq!(db.entries()[0].affected_versions().len(), 2);
    }

    #[test]
    fn test_load_csv_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Package,Versions\nlodash,4.17.19\n").unwrap();

        let db = load_csv(file.path(), CsvColumns::default()).unwrap();
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn test_load_csv_missing_file() {
        let err = load_csv(Path::new("/nonexistent/vulns.csv"), CsvColumns::default()).unwrap_err();
        assert!(matches!(err, ScanError::Read { .. }));
    }
}

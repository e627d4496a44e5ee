use crate::model::{MatchResult, ScanStatus};
use crate::scan::ScanReport;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct MatchRow {
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Type")]
    dependency_type: &'static str,
    #[tabled(rename = "Database Entry")]
    entry: String,
    #[tabled(rename = "Basis")]
    basis: String,
    #[tabled(rename = "Path")]
    path: String,
}

impl MatchRow {
    fn from_match(m: &MatchResult) -> Self {
        Self {
            package: truncate(&m.name, 40),
            version: m.version.clone(),
            dependency_type: if m.is_direct { "direct" } else { "indirect" },
            entry: truncate(&m.entry_name, 40),
            basis: m.basis.to_string(),
            path: truncate(&m.path.to_string(), 60),
        }
    }
}

pub fn print_cli_table(report: &ScanReport) {
    let outcome = &report.outcome;

    println!();
    println!(
        "Scan completed at: {}",
        report.scanned_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!();

    if !outcome.confirmed.is_empty() {
        println!("Found {} vulnerable dependencies:", outcome.confirmed_count());
        println!();
        print_rows(&outcome.confirmed);
    }

    if !outcome.warnings.is_empty() {
        println!();
        println!(
            "Found {} potential matches requiring review:",
            outcome.warning_count()
        );
        println!();
        print_rows(&outcome.warnings);
    }

    println!();
    println!("Summary:");
    println!("  Dependencies analyzed: {}", report.dependencies.len());
    println!("  Packages in database: {}", report.database.len());
    if outcome.has_vulnerabilities() {
        println!(
            "  Vulnerabilities: {} ({} direct, {} indirect)",
            outcome.confirmed_count(),
            outcome.direct_count(),
            outcome.indirect_count()
        );
    }
    println!("  Warnings: {}", outcome.warning_count());
    println!();
    println!("Status: {}", format_status(outcome.status()));
}

fn print_rows(matches: &[MatchResult]) {
    let rows: Vec<MatchRow> = matches.iter().map(MatchRow::from_match).collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

fn format_status(status: ScanStatus) -> String {
    match status {
        ScanStatus::Vulnerable => "\x1b[31mVULNERABLE\x1b[0m".to_string(),
        ScanStatus::Warning => "\x1b[33mWARNING\x1b[0m".to_string(),
        ScanStatus::Ok => "\x1b[32mOK\x1b[0m".to_string(),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

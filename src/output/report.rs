//! Plain-text vulnerability report written to the `--output` file.

use crate::checker::Matcher;
use crate::model::{normalize_name, Classification, ScanStatus};
use crate::scan::ScanReport;

const HEADER: &str = "NPM VULNERABILITY REPORT";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn generate_text_report(report: &ScanReport) -> String {
    let mut text = String::new();

    text.push_str(&format!(
        "{}\n{}\nGenerated: {}\n\n",
        HEADER,
        "=".repeat(HEADER.len()),
        report.scanned_at.format(TIMESTAMP_FORMAT)
    ));

    push_status(&mut text, report);
    push_vulnerability_details(&mut text, report);
    push_summary(&mut text, report);
    push_potential_matches(&mut text, report);
    push_matching_analysis(&mut text, report);

    text
}

fn push_status(text: &mut String, report: &ScanReport) {
    let outcome = &report.outcome;
    let status = outcome.status();
    text.push_str(&format!("STATUS: {}\n", status));
    match status {
        ScanStatus::Vulnerable => text.push_str(&format!(
            "Found {} vulnerable package(s) in your project\n\n",
            outcome.confirmed_count()
        )),
        ScanStatus::Warning => text.push_str(&format!(
            "Found {} potential package match(es) requiring attention\n\n",
            outcome.warning_count()
        )),
        ScanStatus::Ok => text.push_str("No vulnerable packages found in your project.\n\n"),
    }
}

fn push_vulnerability_details(text: &mut String, report: &ScanReport) {
    if report.outcome.confirmed.is_empty() {
        return;
    }

    text.push_str("VULNERABILITY DETAILS:\n=====================\n");

    for (i, m) in report.outcome.confirmed.iter().enumerate() {
        text.push_str(&format!(
            "\n[{}] VULNERABLE PACKAGE FOUND:\n\
             \x20   Package Name: {} {} (Reported Vulnerable Package: {} {})\n\
             \x20   Dependency Type: {}\n\
             \x20   Dependency Levels: {}\n",
            i + 1,
            m.name,
            m.version,
            m.entry_name,
            m.affected_version().unwrap_or_default(),
            if m.is_direct { "Direct" } else { "Indirect" },
            m.path
        ));

        let affected = affected_versions(report, &m.entry_name);
        text.push_str(&format!(
            "    All Vulnerable Versions in Database: {}\n",
            if affected.is_empty() {
                "Unknown".to_string()
            } else {
                affected.join(", ")
            }
        ));

        let used = used_versions(report, &m.name);
        text.push_str(&format!(
            "    All Instances in the Project: {}\n",
            if used.is_empty() {
                "Not found".to_string()
            } else {
                used.join(", ")
            }
        ));
    }

    text.push('\n');
}

fn push_summary(text: &mut String, report: &ScanReport) {
    let outcome = &report.outcome;
    text.push_str(&format!(
        "SCAN SUMMARY:\n\
         =============\n\
         Total dependencies scanned: {}\n\
         Vulnerable packages in database: {}\n\
         Vulnerabilities found: {}\n\
         Direct dependency vulnerabilities: {}\n\
         Indirect dependency vulnerabilities: {}\n\
         Potential matches (warnings): {}\n\n",
        report.dependencies.len(),
        report.database.len(),
        outcome.confirmed_count(),
        outcome.direct_count(),
        outcome.indirect_count(),
        outcome.warning_count()
    ));
}

fn push_potential_matches(text: &mut String, report: &ScanReport) {
    if report.outcome.warnings.is_empty() {
        return;
    }

    text.push_str("POTENTIAL PACKAGE MATCHES:\n=========================\n");

    for (i, w) in report.outcome.warnings.iter().enumerate() {
        let affected = affected_versions(report, &w.entry_name);
        text.push_str(&format!(
            "[{}] {}@{} (vulnerable: {} {})\n\
             \x20   Match Basis: {}\n\
             \x20   Dependency Levels: {}\n",
            i + 1,
            w.name,
            w.version,
            w.entry_name,
            if affected.is_empty() {
                "unknown".to_string()
            } else {
                affected.join(", ")
            },
            w.basis,
            w.path
        ));
    }

    text.push('\n');
}

fn push_matching_analysis(text: &mut String, report: &ScanReport) {
    text.push_str("PACKAGE MATCHING ANALYSIS:\n=========================\n");

    let matcher = Matcher::new(&report.database);
    for dep in &report.dependencies {
        match matcher.classify(dep) {
            Classification::Vulnerable(_) => text.push_str(&format!(
                "  {}@{} -> VULNERABLE\n    Dependency Levels: {}\n",
                dep.name, dep.version, dep.path
            )),
            Classification::Safe {
                affected_versions, ..
            } => text.push_str(&format!(
                "  {}@{} -> Safe version (unsafe: {})\n    Dependency Levels: {}\n",
                dep.name,
                dep.version,
                affected_versions.join(", "),
                dep.path
            )),
            Classification::Warning(_) | Classification::Unknown => {}
        }
    }

    let tally = matcher.tally(&report.dependencies);
    text.push_str(&format!(
        "\nPackages found in vulnerability database: {}\n\
         Packages not in database (unknown): {}\n\
         Warnings (partial matches): {}\n",
        tally.in_database(),
        tally.not_in_database(),
        report.outcome.warning_count()
    ));
}

/// Every affected version listed under `entry_name`, across duplicate rows.
fn affected_versions<'a>(report: &'a ScanReport, entry_name: &str) -> Vec<&'a str> {
    report
        .database
        .lookup(entry_name)
        .flat_map(|entry| entry.affected_versions().iter().map(String::as_str))
        .collect()
}

/// Versions of `name` present anywhere in the project, in traversal order.
fn used_versions<'a>(report: &'a ScanReport, name: &str) -> Vec<&'a str> {
    let name = normalize_name(name);
    report
        .dependencies
        .iter()
        .filter(|d| normalize_name(&d.name) == name)
        .map(|d| d.version.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::Matcher;
    use crate::model::{
        Breadcrumb, DependencyInstance, DependencyPath, VersionDatabase, VulnerablePackage,
    };
    use chrono::{Local, TimeZone};

    fn report(db: &[(&str, &[&str])], dependencies: Vec<DependencyInstance>) -> ScanReport {
        let database: VersionDatabase = db
            .iter()
            .map(|(name, versions)| {
                VulnerablePackage::new(name, versions.iter().map(|v| v.to_string()).collect())
            })
            .collect();
        let outcome = Matcher::new(&database).check(&dependencies);
        ScanReport {
            scanned_at: Local.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            database,
            dependencies,
            outcome,
        }
    }

    fn simple_dependencies() -> Vec<DependencyInstance> {
        vec![
            DependencyInstance::direct("lodash", "4.17.20"),
            DependencyInstance::direct("express", "4.17.1"),
            DependencyInstance::direct("moment", "2.24.0"),
        ]
    }

    #[test]
    fn test_ok_report() {
        let text = generate_text_report(&report(
            &[("nonexistent-package", &["1.0.0"]), ("express", &["4.16.4"])],
            simple_dependencies(),
        ));

        assert!(text.starts_with("NPM VULNERABILITY REPORT\n========================\n"));
        assert!(text.contains("Generated: 2024-03-01 09:30:00"));
        assert!(text.contains("STATUS: OK"));
        assert!(text.contains("No vulnerable packages found"));
        assert!(!text.contains("VULNERABILITY DETAILS:"));
        assert!(!text.contains("POTENTIAL PACKAGE MATCHES:"));
        assert!(text.contains("SCAN SUMMARY:"));
        assert!(text.contains("PACKAGE MATCHING ANALYSIS:"));
        assert!(text.contains("express@4.17.1 -> Safe version (unsafe: 4.16.4)"));
    }

    #[test]
    fn test_vulnerable_report() {
        let text = generate_text_report(&report(
            &[
                ("lodash", &["4.17.20"]),
                ("express", &["4.17.1"]),
                ("moment", &["2.24.0"]),
            ],
            simple_dependencies(),
        ));

        assert!(text.contains("STATUS: VULNERABLE"));
        assert!(text.contains("Found 3 vulnerable package(s)"));
        assert!(text.contains("VULNERABILITY DETAILS:"));
        assert!(text.contains("[1] VULNERABLE PACKAGE FOUND:"));
        assert!(text.contains(
            "Package Name: lodash 4.17.20 (Reported Vulnerable Package: lodash 4.17.20)"
        ));
        assert!(text.contains("Dependency Type: Direct"));
        assert!(text.contains("Vulnerabilities found: 3"));
        assert!(text.contains("Direct dependency vulnerabilities: 3"));
        assert!(text.contains("Indirect dependency vulnerabilities: 0"));
        assert!(text.contains("lodash@4.17.20 -> VULNERABLE"));
    }

    #[test]
    fn test_details_list_all_versions() {
        let dependencies = vec![
            DependencyInstance::direct("lodash", "4.17.20"),
            DependencyInstance::new(
                "lodash",
                "4.17.19",
                DependencyPath::new(vec![
                    Breadcrumb::new("async", "2.6.3"),
                    Breadcrumb::new("lodash", "4.17.19"),
                ]),
                false,
            ),
        ];
        let text = generate_text_report(&report(&[("lodash", &["4.17.19", "4.17.15"])], dependencies));

        assert!(text.contains("Dependency Type: Indirect"));
        assert!(text.contains("Dependency Levels: async@2.6.3 -> lodash@4.17.19"));
        assert!(text.contains("All Vulnerable Versions in Database: 4.17.19, 4.17.15"));
        assert!(text.contains("All Instances in the Project: 4.17.20, 4.17.19"));
        assert!(text.contains("Packages found in vulnerability database: 2"));
    }

    #[test]
    fn test_warning_report() {
        let dependencies = vec![
            DependencyInstance::direct("lodash-es", "4.17.21"),
            DependencyInstance::direct("moment", "2.24.0"),
        ];
        let text = generate_text_report(&report(&[("lodash", &["4.17.19"])], dependencies));

        assert!(text.contains("STATUS: WARNING"));
        assert!(text.contains("Found 1 potential package match(es)"));
        assert!(text.contains("POTENTIAL PACKAGE MATCHES:"));
        assert!(text.contains("[1] lodash-es@4.17.21 (vulnerable: lodash 4.17.19)"));
        assert!(text.contains("Match Basis: name contains database entry"));
        assert!(text.contains("Packages not in database (unknown): 2"));
        assert!(text.contains("Warnings (partial matches): 1"));
        assert!(text.contains("Potential matches (warnings): 1"));
    }

    #[test]
    fn test_warning_lists_closest_entry_versions() {
        let dependencies = vec![DependencyInstance::direct("Lodash-ES", "4.17.21")];
        let text = generate_text_report(&report(
            &[("lodash", &["4.17.19"]), ("lodash-es", &["4.17.21"])],
            dependencies,
        ));

        assert!(text.contains("[1] Lodash-ES@4.17.21 (vulnerable: lodash-es 4.17.21)"));
        assert!(text.contains("Match Basis: name differs only in case"));
    }

    #[test]
    fn test_empty_scan() {
        let text = generate_text_report(&report(&[], Vec::new()));
        assert!(text.contains("STATUS: OK"));
        assert!(text.contains("Total dependencies scanned: 0"));
        assert!(text.contains("Vulnerable packages in database: 0"));
    }
}

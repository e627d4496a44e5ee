//! Matching dependency instances against the vulnerability database.
//!
//! Every instance is classified on its own, in traversal order:
//!
//! | Database has the name | Version listed | Result |
//! |-----------------------|----------------|--------|
//! | yes | yes | confirmed match |
//! | yes | no | safe |
//! | no, but a [`partial_match`] | - | warning against the closest entry |
//! | no | - | unknown |
//!
//! Names are compared after whitespace removal, versions as exact strings.

mod partial;

pub use partial::{partial_match, MIN_CONTAINMENT_LEN};

use crate::model::{
    normalize_name, Classification, DependencyInstance, MatchBasis, MatchResult, ScanOutcome,
    VersionDatabase,
};

/// Per-category counts over a whole dependency list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchTally {
    pub vulnerable: usize,
    pub safe: usize,
    pub warnings: usize,
    pub unknown: usize,
}

impl MatchTally {
    /// Instances whose name is in the database.
    pub fn in_database(&self) -> usize {
        self.vulnerable + self.safe
    }

    /// Instances whose name is not in the database, warnings included.
    pub fn not_in_database(&self) -> usize {
        self.warnings + self.unknown
    }
}

/// Classifies dependency instances against a [`VersionDatabase`].
///
/// The matcher holds no state besides the database reference, so checking
/// the same dependencies twice gives identical outcomes.
///
/// # Example
///
/// ```
/// use npm_vulnscan::checker::Matcher;
/// use npm_vulnscan::model::{DependencyInstance, VersionDatabase, VulnerablePackage};
///
/// let db: VersionDatabase = vec![VulnerablePackage::new("lodash", vec!["4.17.19".into()])]
///     .into_iter()
///     .collect();
/// let deps = vec![DependencyInstance::direct("lodash", "4.17.19")];
///
/// let outcome = Matcher::new(&db).check(&deps);
/// assert_eq!(outcome.confirmed_count(), 1);
/// assert!(outcome.confirmed[0].is_direct);
/// ```
pub struct Matcher<'a> {
    database: &'a VersionDatabase,
}

impl<'a> Matcher<'a> {
    pub fn new(database: &'a VersionDatabase) -> Self {
        Self { database }
    }

    pub fn classify(&self, instance: &DependencyInstance) -> Classification {
        let name = normalize_name(&instance.name);

        let mut known = None;
        for entry in self.database.lookup(&name) {
            if let Some(version) = entry
                .affected_versions()
                .iter()
                .find(|v| **v == instance.version)
            {
                return Classification::Vulnerable(MatchResult::new(
                    instance,
                    entry.name(),
                    MatchBasis::AffectedVersion {
                        version: version.clone(),
                    },
                ));
            }
            known.get_or_insert(entry);
        }

        if let Some(entry) = known {
            return Classification::Safe {
                entry_name: entry.name().to_string(),
                affected_versions: entry.affected_versions().to_vec(),
            };
        }

        // min_by_key keeps the first of equally strong candidates.
        self.database
            .entries()
            .iter()
            .filter_map(|entry| partial_match(&name, entry.name()).map(|basis| (entry, basis)))
            .min_by_key(|(_, basis)| basis.rank())
            .map_or(Classification::Unknown, |(entry, basis)| {
                Classification::Warning(MatchResult::new(instance, entry.name(), basis))
            })
    }

    /// Runs the classification over every instance and keeps the flagged ones.
    pub fn check(&self, dependencies: &[DependencyInstance]) -> ScanOutcome {
        let mut outcome = ScanOutcome::new();
        for instance in dependencies {
            match self.classify(instance) {
                Classification::Vulnerable(m) => outcome.confirmed.push(m),
                Classification::Warning(m) => outcome.warnings.push(m),
                Classification::Safe { .. } | Classification::Unknown => {}
            }
        }
        outcome
    }

    pub fn tally(&self, dependencies: &[DependencyInstance]) -> MatchTally {
        let mut tally = MatchTally::default();
        for instance in dependencies {
            match self.classify(instance) {
                Classification::Vulnerable(_) => tally.vulnerable += 1,
                Classification::Safe { .. } => tally.safe += 1,
                Classification::Warning(_) => tally.warnings += 1,
                Classification::Unknown => tally.unknown += 1,
            }
        }
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Breadcrumb, DependencyPath, VulnerablePackage};

    fn db(entries: &[(&str, &[&str])]) -> VersionDatabase {
        entries
            .iter()
            .map(|(name, versions)| {
                VulnerablePackage::new(name, versions.iter().map(|v| v.to_string()).collect())
            })
            .collect()
    }

    fn transitive(parent: (&str, &str), name: &str, version: &str) -> DependencyInstance {
        DependencyInstance::new(
            name,
            version,
            DependencyPath::new(vec![
                Breadcrumb::new(parent.0, parent.1),
                Breadcrumb::new(name, version),
            ]),
            false,
        )
    }

    #[test]
    fn test_direct_confirmed_match() {
        let db = db(&[("lodash", &["4.17.19"])]);
        let deps = vec![DependencyInstance::direct("lodash", "4.17.19")];

        let outcome = Matcher::new(&db).check(&deps);
        assert_eq!(outcome.confirmed_count(), 1);
        assert_eq!(outcome.warning_count(), 0);

        let m = &outcome.confirmed[0];
        assert!(m.is_direct);
        assert_eq!(m.entry_name, "lodash");
        assert_eq!(m.affected_version(), Some("4.17.19"));
    }

    #[test]
    fn test_safe_version_is_neither_confirmed_nor_warning() {
        let db = db(&[("lodash", &["4.17.19"])]);
        let deps = vec![DependencyInstance::direct("lodash", "4.17.20")];

        let matcher = Matcher::new(&db);
        let outcome = matcher.check(&deps);
        assert_eq!(outcome.confirmed_count(), 0);
        assert_eq!(outcome.warning_count(), 0);
        assert_eq!(
            matcher.classify(&deps[0]),
            Classification::Safe {
                entry_name: "lodash".to_string(),
                affected_versions: vec!["4.17.19".to_string()],
            }
        );
    }

    #[test]
    fn test_empty_database_leaves_everything_unknown() {
        let db = VersionDatabase::new();
        let deps = vec![
            DependencyInstance::direct("lodash", "4.17.19"),
            transitive(("express", "4.17.1"), "debug", "2.6.9"),
        ];

        let matcher = Matcher::new(&db);
        assert_eq!(matcher.check(&deps), ScanOutcome::default());
        assert_eq!(
            matcher.tally(&deps),
            MatchTally {
                unknown: 2,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_transitive_match_keeps_path() {
        let db = db(&[("debug", &["2.6.8", "2.6.9"])]);
        let deps = vec![
            DependencyInstance::direct("express", "4.17.1"),
            transitive(("express", "4.17.1"), "debug", "2.6.9"),
        ];

        let outcome = Matcher::new(&db).check(&deps);
        assert_eq!(outcome.confirmed_count(), 1);
        assert_eq!(outcome.direct_count(), 0);
        assert_eq!(outcome.indirect_count(), 1);
        assert_eq!(
            outcome.confirmed[0].path.to_string(),
            "express@4.17.1 -> debug@2.6.9"
        );
    }

    #[test]
    fn test_every_instance_reported_in_order() {
        let db = db(&[("lodash", &["4.17.19", "4.17.15"])]);
        let deps = vec![
            DependencyInstance::direct("lodash", "4.17.19"),
            transitive(("a", "1.0.0"), "lodash", "4.17.20"),
            transitive(("b", "1.0.0"), "lodash", "4.17.15"),
            transitive(("c", "1.0.0"), "lodash", "4.17.19"),
        ];

        let outcome = Matcher::new(&db).check(&deps);
        let versions: Vec<_> = outcome.confirmed.iter().map(|m| m.version.as_str()).collect();
        assert_eq!(versions, vec!["4.17.19", "4.17.15", "4.17.19"]);
    }

    #[test]
    fn test_confirmed_results_exist_in_database() {
        let db = db(&[("lodash", &["4.17.19"]), ("minimist", &["0.0.8", "1.2.0"])]);
        let deps = vec![
            DependencyInstance::direct("lodash", "4.17.19"),
            transitive(("mkdirp", "0.5.1"), "minimist", "0.0.8"),
            DependencyInstance::direct("minimist", "1.2.6"),
        ];

        let outcome = Matcher::new(&db).check(&deps);
        assert_eq!(outcome.confirmed_count(), 2);
        for m in &outcome.confirmed {
            assert!(db.lookup(&m.name).any(|e| e.is_affected(&m.version)));
        }
    }

    #[test]
    fn test_matching_is_idempotent() {
        let db = db(&[("lodash", &["4.17.19"]), ("express", &["4.16.4"])]);
        let deps = vec![
            DependencyInstance::direct("lodash", "4.17.19"),
            DependencyInstance::direct("lodash-es", "4.17.19"),
            transitive(("a", "1.0.0"), "express", "4.16.4"),
        ];

        let matcher = Matcher::new(&db);
        assert_eq!(matcher.check(&deps), matcher.check(&deps));
    }

    #[test]
    fn test_partial_name_becomes_warning() {
        let db = db(&[("lodash", &["4.17.19"])]);
        let deps = vec![
            DependencyInstance::direct("lodash.merge", "4.6.1"),
            DependencyInstance::direct("@types/lodash", "4.14.0"),
            DependencyInstance::direct("Lodash", "4.17.19"),
            DependencyInstance::direct("moment", "2.29.1"),
        ];

        let matcher = Matcher::new(&db);
        let outcome = matcher.check(&deps);
        assert_eq!(outcome.confirmed_count(), 0);
        let bases: Vec<_> = outcome.warnings.iter().map(|w| w.basis.clone()).collect();
        assert_eq!(
            bases,
            vec![
                MatchBasis::NameContainment,
                MatchBasis::ScopeStrippedName,
                MatchBasis::CaseInsensitiveName,
            ]
        );
        assert!(outcome.warnings.iter().all(|w| w.entry_name == "lodash"));
        assert_eq!(matcher.classify(&deps[3]), Classification::Unknown);
    }

    #[test]
    fn test_strongest_partial_entry_wins() {
        let db = db(&[("lodash", &["4.17.19"]), ("lodash-es", &["4.17.21"])]);
        let deps = vec![DependencyInstance::direct("Lodash-ES", "4.17.21")];

        let outcome = Matcher::new(&db).check(&deps);
        assert_eq!(outcome.warning_count(), 1);
        let w = &outcome.warnings[0];
        assert_eq!(w.entry_name, "lodash-es");
        assert_eq!(w.basis, MatchBasis::CaseInsensitiveName);
    }

    #[test]
    fn test_equally_strong_partial_entries_keep_load_order() {
        let forward = db(&[("lodash", &["4.17.19"]), ("merge", &["1.2.0"])]);
        let deps = vec![DependencyInstance::direct("lodash.merge", "4.6.1")];

        let outcome = Matcher::new(&forward).check(&deps);
        assert_eq!(outcome.warnings[0].entry_name, "lodash");
        assert_eq!(outcome.warnings[0].basis, MatchBasis::NameContainment);

        let reversed = db(&[("merge", &["1.2.0"]), ("lodash", &["4.17.19"])]);
        let outcome = Matcher::new(&reversed).check(&deps);
        assert_eq!(outcome.warnings[0].entry_name, "merge");
    }

    #[test]
    fn test_exact_name_suppresses_partial_warning() {
        // lodash.merge is in the database at a safe version; lodash must not
        // turn it into a warning.
        let db = db(&[("lodash", &["4.17.19"]), ("lodash.merge", &["4.6.0"])]);
        let deps = vec![DependencyInstance::direct("lodash.merge", "4.6.2")];

        let outcome = Matcher::new(&db).check(&deps);
        assert_eq!(outcome, ScanOutcome::default());
    }

    #[test]
    fn test_names_compared_without_whitespace() {
        let db = db(&[(" lodash ", &["4.17.19"])]);
        let deps = vec![DependencyInstance::direct("lo dash", "4.17.19")];

        let outcome = Matcher::new(&db).check(&deps);
        assert_eq!(outcome.confirmed_count(), 1);
    }

    #[test]
    fn test_duplicate_entries_are_all_consulted() {
        let db = db(&[("lodash", &["3.0.0"]), ("lodash", &["4.17.19"])]);
        let deps = vec![DependencyInstance::direct("lodash", "4.17.19")];

        let outcome = Matcher::new(&db).check(&deps);
        assert_eq!(outcome.confirmed_count(), 1);
    }

    #[test]
    fn test_tally() {
        let db = db(&[("lodash", &["4.17.19"]), ("express", &["4.16.4"])]);
        let deps = vec![
            DependencyInstance::direct("lodash", "4.17.19"),
            DependencyInstance::direct("express", "4.17.1"),
            DependencyInstance::direct("lodash-es", "4.17.21"),
            DependencyInstance::direct("moment", "2.29.1"),
        ];

        let tally = Matcher::new(&db).tally(&deps);
        assert_eq!(
            tally,
            MatchTally {
                vulnerable: 1,
                safe: 1,
                warnings: 1,
                unknown: 1,
            }
        );
        assert_eq!(tally.in_database(), 2);
        assert_eq!(tally.not_in_database(), 2);
    }
}

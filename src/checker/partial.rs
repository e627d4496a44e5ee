//! Uncertain name correspondence between a dependency and a database entry.
//!
//! Used only when no database entry has exactly the dependency's name.
//! The checks run from strongest to weakest and the first one that holds
//! is reported.

use crate::model::MatchBasis;

/// Shortest name that may take part in a containment match.
pub const MIN_CONTAINMENT_LEN: usize = 3;

const NAME_DELIMITERS: [char; 5] = ['-', '.', '_', '/', '@'];

/// Returns how `dependency` loosely corresponds to `entry`, if at all.
///
/// Both names must already be whitespace-normalized. Identical names are
/// not a partial match and yield `None`.
///
/// ```
/// use npm_vulnscan::checker::partial_match;
/// use npm_vulnscan::model::MatchBasis;
///
/// assert_eq!(partial_match("Lodash", "lodash"), Some(MatchBasis::CaseInsensitiveName));
/// assert_eq!(partial_match("@types/lodash", "lodash"), Some(MatchBasis::ScopeStrippedName));
/// assert_eq!(partial_match("lodash.merge", "lodash"), Some(MatchBasis::NameContainment));
/// assert_eq!(partial_match("flash", "lodash"), None);
/// ```
pub fn partial_match(dependency: &str, entry: &str) -> Option<MatchBasis> {
    if dependency == entry {
        return None;
    }

    let dep = dependency.to_ascii_lowercase();
    let ent = entry.to_ascii_lowercase();

    if dep == ent {
        return Some(MatchBasis::CaseInsensitiveName);
    }

    if strip_scope(&dep) == strip_scope(&ent) {
        return Some(MatchBasis::ScopeStrippedName);
    }

    let (short, long) = if dep.len() <= ent.len() {
        (dep.as_str(), ent.as_str())
    } else {
        (ent.as_str(), dep.as_str())
    };
    if short.len() >= MIN_CONTAINMENT_LEN && contains_delimited(long, short) {
        return Some(MatchBasis::NameContainment);
    }

    None
}

/// Drops a leading `@scope/` from an npm package name.
fn strip_scope(name: &str) -> &str {
    if name.starts_with('@') {
        if let Some((_, rest)) = name.split_once('/') {
            if !rest.is_empty() {
                return rest;
            }
        }
    }
    name
}

/// True when `needle` occurs in `haystack` with a delimiter or the string
/// edge on both sides.
fn contains_delimited(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| NAME_DELIMITERS.contains(&c));
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| NAME_DELIMITERS.contains(&c));
        before_ok && after_ok
    })
}

//! Rebuilds a flat dependency list from `npm list --json --all` output.
//!
//! The listing is read one line at a time without a JSON parser. npm can
//! interleave diagnostics with the tree or stop half way, so nothing here
//! fails on content: lines that do not fit are skipped.
//!
//! Nesting is tracked by counting braces. Each depth has a slot holding the
//! package name opened at that depth and, once seen, its version. In npm's
//! layout depth 0 is the document, depth 1 the top-level `dependencies`
//! object, and package names sit on even depths starting at 2 with their
//! `"version"` field one level below.
//!
//! ```text
//! {                              depth 0
//!   "name": "app",
//!   "dependencies": {            depth 1
//!     "express": {               depth 2  (direct)
//!       "version": "4.17.1",     depth 3
//!       "dependencies": {
//!         "debug": {             depth 4  (express@4.17.1 -> debug@2.6.9)
//!           "version": "2.6.9"
//! ```

use std::io::{self, BufRead};

use tracing::{debug, trace};

use crate::model::{Breadcrumb, DependencyInstance, DependencyPath};

/// Default deepest slot that records package names.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Depth of packages declared by the project itself.
const DIRECT_DEPTH: usize = 2;

/// Keys that open structural objects rather than packages.
const RESERVED_KEYS: [&str; 5] = ["name", "version", "lockfileVersion", "requires", "dependencies"];

#[derive(Debug, Clone, Default)]
struct Slot {
    name: String,
    version: Option<String>,
}

/// Per-depth name and version slots, grown on demand.
#[derive(Debug, Default)]
struct DepthStack {
    slots: Vec<Slot>,
}

impl DepthStack {
    fn open(&mut self, depth: usize, name: String) {
        if self.slots.len() <= depth {
            self.slots.resize_with(depth + 1, Slot::default);
        }
        self.slots[depth] = Slot {
            name,
            version: None,
        };
    }

    fn name_at(&self, depth: usize) -> Option<&str> {
        self.slots
            .get(depth)
            .map(|slot| slot.name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// Nearest depth at or above `depth` holding a package name.
    fn owner_of(&self, depth: usize) -> Option<usize> {
        (0..=depth).rev().find(|&d| self.name_at(d).is_some())
    }

    fn set_version(&mut self, depth: usize, version: &str) {
        if let Some(slot) = self.slots.get_mut(depth) {
            slot.version = Some(version.to_string());
        }
    }

    fn path_to(&self, depth: usize) -> DependencyPath {
        let crumbs = self
            .slots
            .iter()
            .take(depth + 1)
            .skip(DIRECT_DEPTH)
            .filter_map(|slot| {
                slot.version
                    .as_ref()
                    .map(|version| Breadcrumb::new(&slot.name, version))
            })
            .collect();
        DependencyPath::new(crumbs)
    }

    /// Forgets every slot at `depth` and deeper.
    fn clear_from(&mut self, depth: usize) {
        self.slots.truncate(depth);
    }
}

/// Single-pass reconstructor for npm dependency listings.
///
/// # Example
///
/// ```
/// use npm_vulnscan::scanner::TreeReconstructor;
///
/// let listing = r#"{
///   "name": "app",
///   "version": "1.0.0",
///   "dependencies": {
///     "lodash": {
///       "version": "4.17.20"
///     }
///   }
/// }"#;
///
/// let deps = TreeReconstructor::new().reconstruct_str(listing);
/// assert_eq!(deps.len(), 1);
/// assert!(deps[0].is_direct);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TreeReconstructor {
    max_depth: usize,
}

impl TreeReconstructor {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Limits how deep package names are recorded. Packages nested below
    /// this depth are ignored.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Reads the listing to the end and returns every dependency instance
    /// in the order it appears.
    ///
    /// # Errors
    ///
    /// Only I/O errors from `reader` are returned. Invalid UTF-8 is decoded
    /// lossily and unrecognised lines are skipped.
    pub fn reconstruct<R: BufRead>(&self, mut reader: R) -> io::Result<Vec<DependencyInstance>> {
        let mut state = ReconstructState::new(self.max_depth);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            state.feed(&String::from_utf8_lossy(&buf));
        }

        debug!(
            lines = state.lines,
            dependencies = state.instances.len(),
            "reconstructed dependency tree"
        );
        Ok(state.instances)
    }

    /// Convenience wrapper for listings already held in memory.
    pub fn reconstruct_str(&self, listing: &str) -> Vec<DependencyInstance> {
        let mut state = ReconstructState::new(self.max_depth);
        for line in listing.lines() {
            state.feed(line);
        }
        state.instances
    }
}

impl Default for TreeReconstructor {
    fn default() -> Self {
        Self::new()
    }
}

struct ReconstructState {
    max_depth: usize,
    depth: usize,
    stack: DepthStack,
    instances: Vec<DependencyInstance>,
    lines: usize,
}

impl ReconstructState {
    fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            depth: 0,
            stack: DepthStack::default(),
            instances: Vec::new(),
            lines: 0,
        }
    }

    fn feed(&mut self, line: &str) {
        self.lines += 1;
        let opened = line.matches('{').count();
        let closed = line.matches('}').count();

        if let Some(name) = package_key(line) {
            if self.depth <= self.max_depth {
                self.stack.open(self.depth, name.to_string());
            } else {
                trace!(depth = self.depth, package = name, "ignoring package beyond max depth");
            }
            self.advance(opened, closed);
            return;
        }

        if line.contains("\"version\":") {
            match extract_string_value(line, "version") {
                Some(version) => self.record_version(version),
                None => debug!(line = self.lines, "skipping unreadable version field"),
            }
        }

        self.advance(opened, closed);
        if closed > 0 {
            self.stack.clear_from(self.depth);
        }
    }

    fn advance(&mut self, opened: usize, closed: usize) {
        self.depth = (self.depth + opened).saturating_sub(closed);
    }

    fn record_version(&mut self, version: &str) {
        // A version more than one level past the bound belongs to a package
        // whose name was never recorded.
        if self.depth > self.max_depth.saturating_add(1) {
            return;
        }

        let Some(owner) = self.stack.owner_of(self.depth.min(self.max_depth)) else {
            return;
        };
        if owner < DIRECT_DEPTH {
            return;
        }

        self.stack.set_version(owner, version);
        let name = self.stack.name_at(owner).unwrap_or_default().to_string();
        let path = self.stack.path_to(owner);
        self.instances.push(DependencyInstance::new(
            name,
            version,
            path,
            owner == DIRECT_DEPTH,
        ));
    }
}

/// Returns the key of a `"key": {` line unless it is a structural key.
fn package_key(line: &str) -> Option<&str> {
    if !(line.contains('"') && line.contains(':') && line.contains('{')) {
        return None;
    }
    let key = first_quoted(line)?;
    if RESERVED_KEYS.contains(&key) {
        None
    } else {
        Some(key)
    }
}

fn first_quoted(s: &str) -> Option<&str> {
    let start = s.find('"')? + 1;
    let len = s[start..].find('"')?;
    Some(&s[start..start + len])
}

/// Extracts the string value of `"key": "value"` from a line.
fn extract_string_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let pattern = format!("\"{}\":", key);
    let after_key = &line[line.find(&pattern)? + pattern.len()..];
    first_quoted(after_key)
}

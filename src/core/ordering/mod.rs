//! # Ordering Module
//!
//! Natural ordering for file names that mix text and numbers, so that
//! `slide2.png` sorts before `slide10.png`.
//!
//! A name is split into alternating runs: a (possibly empty) text run,
//! then a digit run, then text again, and so on. Runs are compared
//! position by position - digit runs by numeric value, text runs
//! case-insensitively. Because the first run is always text, runs at the
//! same position always have the same kind.
//!
//! Only ASCII `0-9` form digit runs. Other Unicode digits are ordinary
//! text, which keeps the length-then-lexical number comparison exact.

use regex::Regex;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn digit_runs() -> &'static Regex {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    DIGITS.get_or_init(|| Regex::new(r"[0-9]+").expect("static pattern is valid"))
}

/// One run of a natural sort key
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    /// Digits with leading zeros stripped
    Number(String),
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
            (Segment::Number(a), Segment::Number(b)) => {
                a.len().cmp(&b.len()).then_with(|| a.cmp(b))
            }
            (Segment::Text(_), Segment::Number(_)) => Ordering::Less,
            (Segment::Number(_), Segment::Text(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Precomputed natural sort key for a string
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NaturalKey {
    segments: Vec<Segment>,
}

impl NaturalKey {
    pub fn new(s: &str) -> Self {
        let mut segments = Vec::new();
        let mut last = 0;

        for run in digit_runs().find_iter(s) {
            segments.push(Segment::Text(s[last..run.start()].to_lowercase()));
            let trimmed = run.as_str().trim_start_matches('0');
            segments.push(Segment::Number(trimmed.to_string()));
            last = run.end();
        }

        let tail = &s[last..];
        if !tail.is_empty() || segments.is_empty() {
            segments.push(Segment::Text(tail.to_lowercase()));
        }

        Self { segments }
    }

    /// Key for a path's file name (the display name of a catalog item)
    pub fn for_path(path: &Path) -> Self {
        Self::new(&display_name(path))
    }
}

/// Compare two strings in natural order
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    NaturalKey::new(a).cmp(&NaturalKey::new(b))
}

/// The name shown for a file: its final path component
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Sort strings in natural order (stable for equal keys)
pub fn sort_natural(names: &mut [String]) {
    names.sort_by_cached_key(|name| NaturalKey::new(name));
}

/// Sort paths by the natural order of their file names (stable)
pub fn sort_paths_natural(paths: &mut [PathBuf]) {
    paths.sort_by_cached_key(|path| NaturalKey::for_path(path));
}

//! Attributes uncovered lines to the Dart function that encloses them.
//!
//! Declarations are found line by line with a regex; a line belongs to the
//! most recent declaration above it. Nested closures are not tracked, so a
//! closure's lines count toward its enclosing function.

use super::lcov::FileCoverage;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

/// Names treated as entry points of a library or tool.
const ENTRY_POINTS: &[&str] = &["main", "run", "analyze", "execute", "runAll"];

/// Words that can precede `name(` without it being a declaration.
const NOT_A_DECLARATION: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "await", "new", "else", "throw",
    "assert", "yield", "case", "in", "is", "as", "super", "this",
];

/// `<modifiers and return type> name<generics>(`, anchored at the line start.
static DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:[A-Za-z_$][\w$<>?,\[\]]*\s+)*([A-Za-z_$][\w$<>?,\[\]]*)\s+([A-Za-z_$][\w$]*)\s*(?:<[^>()]*>)?\s*\(",
    )
    .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GapPriority {
    /// Entry points; covering them usually reaches the most code
    High,
    /// Public helpers
    Medium,
    /// Private (`_`-prefixed) members
    Low,
}

impl GapPriority {
    pub fn of_function(name: &str) -> Self {
        if ENTRY_POINTS.contains(&name) {
            GapPriority::High
        } else if name.starts_with('_') {
            GapPriority::Low
        } else {
            GapPriority::Medium
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GapPriority::High => "HIGH",
            GapPriority::Medium => "MEDIUM",
            GapPriority::Low => "LOW",
        }
    }
}

impl fmt::Display for GapPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A function with at least one uncovered line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionGap {
    pub file: String,
    pub function: String,
    /// Line of the declaration
    pub line: u32,
    pub uncovered_lines: usize,
    pub priority: GapPriority,
}

/// Name of the function declared on `lines[index]`, if any.
///
/// A declaration needs a body: `{` or `=>` on the same line or the next one.
fn declared_function(lines: &[&str], index: usize) -> Option<String> {
    let captures = DECLARATION.captures(lines[index])?;
    let preceding = captures.get(1)?.as_str();
    let name = captures.get(2)?.as_str();
    if NOT_A_DECLARATION.contains(&preceding) || NOT_A_DECLARATION.contains(&name) {
        return None;
    }
    let opens_body = |line: &str| line.contains('{') || line.contains("=>");
    let has_body = opens_body(lines[index]) || lines.get(index + 1).is_some_and(|l| opens_body(l));
    has_body.then(|| name.to_string())
}

/// Functions of one source file that contain uncovered lines, in file order.
pub fn find_function_gaps(file: &str, source: &str, uncovered: &BTreeSet<u32>) -> Vec<FunctionGap> {
    let lines: Vec<&str> = source.lines().collect();
    let mut gaps: Vec<FunctionGap> = Vec::new();
    let mut current: Option<(String, u32)> = None;

    for index in 0..lines.len() {
        let number = index as u32 + 1;
        if let Some(name) = declared_function(&lines, index) {
            current = Some((name, number));
        }
        if !uncovered.contains(&number) {
            continue;
        }
        let Some((name, start)) = &current else {
            continue;
        };
        match gaps.last_mut() {
            Some(gap) if gap.line == *start => gap.uncovered_lines += 1,
            _ => gaps.push(FunctionGap {
                file: file.to_string(),
                function: name.clone(),
                line: *start,
                uncovered_lines: 1,
                priority: GapPriority::of_function(name),
            }),
        }
    }
    gaps
}

/// Gaps across every file with uncovered lines, highest priority first,
/// then by the number of uncovered lines.
///
/// File paths are resolved against `project_root`; unreadable sources are
/// skipped.
pub fn analyze_function_gaps<'a>(
    files: impl IntoIterator<Item = &'a FileCoverage>,
    project_root: &Path,
) -> Vec<FunctionGap> {
    let mut gaps: Vec<FunctionGap> = Vec::new();
    for file in files.into_iter().filter(|f| !f.uncovered_lines.is_empty()) {
        let path = project_root.join(&file.path);
        match fs::read_to_string(&path) {
            Ok(source) => gaps.extend(find_function_gaps(&file.path, &source, &file.uncovered_lines)),
            Err(e) => tracing::debug!(path = %path.display(), "source not readable for gap analysis: {}", e),
        }
    }
    gaps.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then(b.uncovered_lines.cmp(&a.uncovered_lines))
            .then_with(|| a.file.cmp(&b.file))
            .then(a.line.cmp(&b.line))
    });
    gaps
}

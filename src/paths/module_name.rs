//! Qualified module names used to correlate reports across tools.
//!
//! A qualified name is a lowercase, hyphenated base name followed by a
//! two-letter target suffix: `auth-fo` (folder), `login-fi` (file),
//! `all-tests-pr` (project root). The computation is a pure function of the
//! path string, so `test/auth/` and `lib/src/auth/` both become `auth-fo`
//! without any shared state between the tools that analyze them.

use super::normalize_path;
use std::fmt;

/// Base name used for the bare `test/` directory
pub const ALL_TESTS: &str = "all_tests";
/// Base name used for the bare `lib/` directory
pub const ALL_SOURCES: &str = "all_sources";

/// What kind of target a path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Folder,
    File,
    Project,
}

impl TargetKind {
    /// Two-letter suffix appended to qualified names
    pub fn suffix(self) -> &'static str {
        match self {
            TargetKind::Folder => "fo",
            TargetKind::File => "fi",
            TargetKind::Project => "pr",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "fo" => Some(TargetKind::Folder),
            "fi" => Some(TargetKind::File),
            "pr" => Some(TargetKind::Project),
            _ => None,
        }
    }

    /// Classify a path purely from its text.
    pub fn of_path(path: &str) -> Self {
        let normalized = normalize_path(path);
        match normalized.as_str() {
            "" | "." | "test" | "lib" => TargetKind::Project,
            p if p.ends_with(".dart") => TargetKind::File,
            _ => TargetKind::Folder,
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TargetKind::Folder => "folder",
            TargetKind::File => "file",
            TargetKind::Project => "project",
        };
        f.write_str(label)
    }
}

/// A qualified name split back into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedModuleName {
    pub base_name: String,
    pub kind: TargetKind,
}

/// Last meaningful path segment, with `.dart` and `_test` removed.
pub fn extract_module_name(path: &str) -> String {
    let normalized = normalize_path(path);
    match normalized.as_str() {
        "test" => return ALL_TESTS.to_string(),
        "lib" => return ALL_SOURCES.to_string(),
        "" | "." => return "project".to_string(),
        _ => {}
    }

    let segment = normalized.rsplit('/').next().unwrap_or(normalized.as_str());
    let stem = segment.strip_suffix(".dart").unwrap_or(segment);
    let base = stem.strip_suffix("_test").unwrap_or(stem);
    if base.is_empty() {
        stem.to_string()
    } else {
        base.to_string()
    }
}

/// `auth_flow` + folder → `auth-flow-fo`
///
/// Everything outside `[a-z0-9]` after ASCII lowercasing becomes `-`, so the
/// result is always accepted back as `--module-name` and parses out of a
/// report filename.
pub fn generate_qualified_name(base_name: &str, kind: TargetKind) -> String {
    let slug: String = base_name
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' })
        .collect();
    format!("{}-{}", slug, kind.suffix())
}

/// The single entry point other components use.
pub fn get_qualified_module_name(path: &str) -> String {
    generate_qualified_name(&extract_module_name(path), TargetKind::of_path(path))
}

/// Split `auth-flow-fo` into `("auth-flow", Folder)`.
///
/// Returns `None` when the suffix is not one of the known target kinds.
pub fn parse_qualified_name(qualified: &str) -> Option<ParsedModuleName> {
    let (base, suffix) = qualified.rsplit_once('-')?;
    if base.is_empty() {
        return None;
    }
    let kind = TargetKind::from_suffix(suffix)?;
    Some(ParsedModuleName {
        base_name: base.to_string(),
        kind,
    })
}

//! Core data types for LCOV coverage data.
//!
//! Pure data; no I/O. Percentages follow two different zero-denominator
//! rules on purpose: a file with no executable lines is fully covered
//! (`100`), while an input with no executable lines at all reports `0`.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Line coverage for one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileCoverage {
    pub path: String,
    pub total_lines: usize,
    pub hit_lines: usize,
    pub uncovered_lines: BTreeSet<u32>,
}

impl FileCoverage {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            total_lines: 0,
            hit_lines: 0,
            uncovered_lines: BTreeSet::new(),
        }
    }

    /// `hit / total * 100`, or `100` when there is nothing to cover.
    pub fn percent(&self) -> f64 {
        if self.total_lines == 0 {
            100.0
        } else {
            self.hit_lines as f64 / self.total_lines as f64 * 100.0
        }
    }
}

/// Branch totals, present only when the input carried `BRF:`/`BRH:` records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BranchCoverage {
    pub found: usize,
    pub hit: usize,
}

impl BranchCoverage {
    pub fn percent(&self) -> f64 {
        if self.found == 0 {
            100.0
        } else {
            self.hit as f64 / self.found as f64 * 100.0
        }
    }
}

/// A record that was skipped while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    /// 1-based line in the LCOV input
    pub line: usize,
    pub file: Option<String>,
    pub message: String,
}

/// Parsed LCOV data keyed by normalized source path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LcovData {
    pub files: BTreeMap<String, FileCoverage>,
    pub branches: Option<BranchCoverage>,
    pub warnings: Vec<ParseWarning>,
}

impl LcovData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_lines(&self) -> usize {
        self.files.values().map(|f| f.total_lines).sum()
    }

    pub fn hit_lines(&self) -> usize {
        self.files.values().map(|f| f.hit_lines).sum()
    }

    /// Sum of hits over sum of totals; `0` when there are no lines at all.
    pub fn overall_percent(&self) -> f64 {
        let total = self.total_lines();
        if total == 0 {
            0.0
        } else {
            self.hit_lines() as f64 / total as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_fully_covered() {
        assert_eq!(FileCoverage::new("lib/a.dart").percent(), 100.0);
    }

    #[test]
    fn test_empty_data_is_zero_percent() {
        let mut data = LcovData::new();
        assert_eq!(data.overall_percent(), 0.0);

        data.files
            .insert("lib/a.dart".into(), FileCoverage::new("lib/a.dart"));
        assert_eq!(data.overall_percent(), 0.0);
    }

    #[test]
    fn test_overall_is_weighted_by_lines() {
        let mut data = LcovData::new();
        for (path, total, hit) in [("lib/a.dart", 10, 10), ("lib/b.dart", 30, 15)] {
            data.files.insert(
                path.into(),
                FileCoverage {
                    path: path.into(),
                    total_lines: total,
                    hit_lines: hit,
                    uncovered_lines: BTreeSet::new(),
                },
            );
        }
        assert_eq!(data.overall_percent(), 62.5);
    }
}

//! Turns uncovered lines into suggested test cases.

use super::lcov::FileCoverage;
use crate::reports::markdown::{format_range, line_ranges};
use crate::reports::ChecklistMode;
use serde::Serialize;

/// Ranges longer than this are suggested as a group of tests, not one.
const LARGE_RANGE_LINES: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistItem {
    pub file: String,
    pub lines: String,
    pub suggestion: String,
}

impl ChecklistItem {
    pub fn to_markdown(&self) -> String {
        format!("- [ ] `{}` lines {}: {}", self.file, self.lines, self.suggestion)
    }
}

fn suggestion_for((start, end): (u32, u32)) -> String {
    let span = end - start + 1;
    if span == 1 {
        "add an assertion that reaches this line".to_string()
    } else if span > LARGE_RANGE_LINES {
        format!("split into several cases; {span} consecutive lines are never executed")
    } else {
        format!("add a test case exercising this {span}-line branch")
    }
}

/// Items for files with gaps, worst coverage first.
pub fn build_checklist<'a>(
    files: impl IntoIterator<Item = &'a FileCoverage>,
    mode: ChecklistMode,
) -> Vec<ChecklistItem> {
    let mut files: Vec<&FileCoverage> = files
        .into_iter()
        .filter(|f| !f.uncovered_lines.is_empty())
        .collect();
    files.sort_by(|a, b| a.percent().total_cmp(&b.percent()).then(a.path.cmp(&b.path)));

    match mode {
        ChecklistMode::None => Vec::new(),
        ChecklistMode::Minimal => files
            .into_iter()
            .map(|file| {
                let lines: Vec<u32> = file.uncovered_lines.iter().copied().collect();
                let ranges = line_ranges(&lines);
                ChecklistItem {
                    file: file.path.clone(),
                    lines: ranges
                        .iter()
                        .map(|r| format_range(*r))
                        .collect::<Vec<_>>()
                        .join(", "),
                    suggestion: format!(
                        "cover {} uncovered line(s) in {} range(s)",
                        lines.len(),
                        ranges.len()
                    ),
                }
            })
            .collect(),
        ChecklistMode::Full => files
            .into_iter()
            .flat_map(|file| {
                let lines: Vec<u32> = file.uncovered_lines.iter().copied().collect();
                line_ranges(&lines)
                    .into_iter()
                    .map(|range| ChecklistItem {
                        file: file.path.clone(),
                        lines: format_range(range),
                        suggestion: suggestion_for(range),
                    })
                    .collect::<Vec<_>>()
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn file(path: &str, total: usize, uncovered: &[u32]) -> FileCoverage {
        FileCoverage {
            path: path.into(),
            total_lines: total,
            hit_lines: total - uncovered.len(),
            uncovered_lines: uncovered.iter().copied().collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn test_full_checklist_groups_ranges() {
        let files = [file("lib/a.dart", 20, &[3, 4, 5, 9])];
        let items = build_checklist(&files, ChecklistMode::Full);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].lines, "3-5");
        assert_eq!(items[1].lines, "9");
        assert_eq!(
            items[1].to_markdown(),
            "- [ ] `lib/a.dart` lines 9: add an assertion that reaches this line"
        );
    }

    #[test]
    fn test_minimal_checklist_one_item_per_file_worst_first() {
        let files = [
            file("lib/good.dart", 10, &[1]),
            file("lib/bad.dart", 10, &[1, 2, 3, 7]),
            file("lib/full.dart", 10, &[]),
        ];
        let items = build_checklist(&files, ChecklistMode::Minimal);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].file, "lib/bad.dart");
        assert_eq!(items[0].lines, "1-3, 7");
        assert!(items[0].suggestion.contains("4 uncovered line(s) in 2 range(s)"));
    }

    #[test]
    fn test_none_mode_is_empty() {
        let files = [file("lib/a.dart", 2, &[1])];
        assert!(build_checklist(&files, ChecklistMode::None).is_empty());
    }
}

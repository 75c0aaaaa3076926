//! Pure handler functions for LCOV record types.
//!
//! Each handler takes the parser state and one record's data. A block is
//! committed to [`LcovData`] only at `end_of_record` (or end of input); a
//! block that saw a malformed record is dropped with a warning and the rest
//! of the input keeps parsing.

use super::types::{BranchCoverage, FileCoverage, LcovData, ParseWarning};
use crate::paths::normalize_path;
use std::collections::BTreeMap;

/// Mutable state during LCOV parsing.
#[derive(Debug, Default)]
pub(crate) struct LcovParserState {
    pub data: LcovData,
    /// Source file of the open block
    pub current_file: Option<String>,
    /// `DA:` execution counts for the open block
    pub file_lines: BTreeMap<u32, u64>,
    pub lines_found: Option<u32>,
    pub lines_hit: Option<u32>,
    /// `BRF:`/`BRH:` of the open block, added to the totals on commit
    pub branches_found: Option<u32>,
    pub branches_hit: Option<u32>,
    /// First malformed record seen in the open block
    pub malformed: Option<(usize, String)>,
    /// Records seen before any `SF:` in the current block
    pub orphan_line: Option<usize>,
    pub file_count: usize,
}

impl LcovParserState {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset_block(&mut self) {
        self.current_file = None;
        self.file_lines.clear();
        self.lines_found = None;
        self.lines_hit = None;
        self.branches_found = None;
        self.branches_hit = None;
        self.malformed = None;
        self.orphan_line = None;
    }

    fn warn(&mut self, line: usize, file: Option<String>, message: String) {
        tracing::warn!(line, file = file.as_deref().unwrap_or("-"), "{}", message);
        self.data.warnings.push(ParseWarning {
            line,
            file,
            message,
        });
    }
}

/// Build a `FileCoverage` from one block's records.
///
/// `LF:`/`LH:` summaries win when present; otherwise totals come from `DA:` lines.
pub fn build_file_coverage(
    path: &str,
    lines: &BTreeMap<u32, u64>,
    lines_found: Option<u32>,
    lines_hit: Option<u32>,
) -> FileCoverage {
    let uncovered_lines = lines
        .iter()
        .filter(|(_, &count)| count == 0)
        .map(|(&line, _)| line)
        .collect();
    let total_lines = lines_found.map(|n| n as usize).unwrap_or(lines.len());
    let hit_lines = lines_hit
        .map(|n| n as usize)
        .unwrap_or_else(|| lines.values().filter(|&&count| count > 0).count());

    FileCoverage {
        path: path.to_string(),
        total_lines,
        hit_lines: hit_lines.min(total_lines),
        uncovered_lines,
    }
}

pub(crate) fn handle_source_file(state: &mut LcovParserState, line: usize, path: &str) {
    if state.current_file.is_some() {
        // Previous block never saw end_of_record
        commit_block(state, line);
    } else if let Some(orphan) = state.orphan_line.take() {
        state.warn(orphan, None, "records before SF: skipped".to_string());
    }
    state.reset_block();
    state.current_file = Some(normalize_path(path));
}

fn note_orphan(state: &mut LcovParserState, line: usize) -> bool {
    if state.current_file.is_none() {
        state.orphan_line.get_or_insert(line);
        return true;
    }
    false
}

pub(crate) fn handle_line_data(state: &mut LcovParserState, line: usize, number: u32, count: u64) {
    if note_orphan(state, line) {
        return;
    }
    *state.file_lines.entry(number).or_insert(0) += count;
}

pub(crate) fn handle_lines_found(state: &mut LcovParserState, line: usize, found: u32) {
    if !note_orphan(state, line) {
        state.lines_found = Some(found);
    }
}

pub(crate) fn handle_lines_hit(state: &mut LcovParserState, line: usize, hit: u32) {
    if !note_orphan(state, line) {
        state.lines_hit = Some(hit);
    }
}

pub(crate) fn handle_branches_found(state: &mut LcovParserState, line: usize, found: u32) {
    if !note_orphan(state, line) {
        state.branches_found = Some(found);
    }
}

pub(crate) fn handle_branches_hit(state: &mut LcovParserState, line: usize, hit: u32) {
    if !note_orphan(state, line) {
        state.branches_hit = Some(hit);
    }
}

pub(crate) fn handle_malformed(state: &mut LcovParserState, line: usize, message: String) {
    if state.current_file.is_some() {
        state.malformed.get_or_insert((line, message));
    } else {
        state.warn(line, None, message);
    }
}

pub(crate) fn handle_end_of_record(state: &mut LcovParserState, line: usize) {
    if state.current_file.is_some() {
        commit_block(state, line);
    } else {
        state.warn(line, None, "block without SF: skipped".to_string());
    }
    state.reset_block();
}

/// Flush a trailing block that has no `end_of_record`.
pub(crate) fn handle_incomplete_file(state: &mut LcovParserState, line: usize) {
    if state.current_file.is_some() {
        commit_block(state, line);
    } else if let Some(orphan) = state.orphan_line.take() {
        state.warn(orphan, None, "records before SF: skipped".to_string());
    }
    state.reset_block();
}

fn commit_block(state: &mut LcovParserState, line: usize) {
    let Some(path) = state.current_file.clone() else {
        return;
    };

    if let Some((bad_line, message)) = state.malformed.take() {
        state.warn(
            bad_line,
            Some(path),
            format!("{message}; file skipped"),
        );
        return;
    }

    let coverage = build_file_coverage(
        &path,
        &state.file_lines,
        state.lines_found,
        state.lines_hit,
    );
    if state.data.files.insert(path.clone(), coverage).is_some() {
        state.warn(
            line,
            Some(path),
            "duplicate SF: block replaces the earlier one".to_string(),
        );
    }
    state.file_count += 1;

    if state.branches_found.is_some() || state.branches_hit.is_some() {
        let hit = state.branches_hit.unwrap_or(0);
        // A lone BRH: counts its branches as found
        let found = state.branches_found.unwrap_or(hit);
        let branches = state.data.branches.get_or_insert_with(BranchCoverage::default);
        branches.found += found as usize;
        branches.hit += hit.min(found) as usize;
    }
}

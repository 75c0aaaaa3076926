//! LCOV parser - the imperative shell.
//!
//! Splits the input into lines, parses each with the `lcov` crate's record
//! grammar, and dispatches to the pure handlers. Malformed records never
//! abort the parse: the enclosing block is skipped and a warning recorded.

use super::handlers::{
    handle_branches_found, handle_branches_hit, handle_end_of_record, handle_incomplete_file,
    handle_line_data, handle_lines_found, handle_lines_hit, handle_malformed, handle_source_file,
    LcovParserState,
};
use super::types::LcovData;
use crate::errors::{AnalyzerError, Result};
use lcov::Record;
use std::path::Path;

/// Parse LCOV text.
pub fn parse_lcov_str(content: &str) -> LcovData {
    let mut state = LcovParserState::new();
    let mut last_line = 0;

    for (index, raw) in content.lines().enumerate() {
        let line = index + 1;
        last_line = line;
        let text = raw.trim();
        if text.is_empty() {
            continue;
        }

        let record = match text.parse::<Record>() {
            Ok(record) => record,
            Err(e) => {
                handle_malformed(&mut state, line, format!("malformed record `{text}`: {e}"));
                continue;
            }
        };

        match record {
            Record::SourceFile { path } => {
                handle_source_file(&mut state, line, &path.to_string_lossy())
            }
            Record::LineData { line: number, count, .. } => {
                handle_line_data(&mut state, line, number, count)
            }
            Record::LinesFound { found } => handle_lines_found(&mut state, line, found),
            Record::LinesHit { hit } => handle_lines_hit(&mut state, line, hit),
            Record::BranchesFound { found } => handle_branches_found(&mut state, line, found),
            Record::BranchesHit { hit } => handle_branches_hit(&mut state, line, hit),
            Record::EndOfRecord => handle_end_of_record(&mut state, line),
            _ => {} // Ignore other record types
        }
    }

    // Handle case where input doesn't end with end_of_record
    handle_incomplete_file(&mut state, last_line);

    tracing::debug!(
        files = state.file_count,
        warnings = state.data.warnings.len(),
        "parsed LCOV"
    );
    state.data
}

/// Parse an LCOV file from disk.
pub fn parse_lcov_file(path: &Path) -> Result<LcovData> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::InvalidData {
            AnalyzerError::parse(path.display().to_string(), "LCOV file is not valid UTF-8")
        } else {
            AnalyzerError::file_system(path, e)
        }
    })?;
    Ok(parse_lcov_str(&content))
}

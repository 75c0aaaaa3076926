//! Markdown helpers shared by every report writer.

use serde_json::Value;
use std::fmt::Write as _;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";
pub const DATA_SECTION_HEADING: &str = "## Machine-readable data";

/// Append the JSON payload as a fenced block so the `.md` is self-contained.
pub fn append_json_section(markdown: &mut String, data: &Value) {
    let pretty = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
    if !markdown.ends_with('\n') {
        markdown.push('\n');
    }
    let _ = write!(
        markdown,
        "\n{DATA_SECTION_HEADING}\n\n<details>\n<summary>JSON</summary>\n\n{JSON_FENCE}\n{pretty}\n{FENCE}\n\n</details>\n"
    );
}

/// Parse the fenced ```json block of the data section.
///
/// Fences earlier in the report (quoted stderr, test output) are ignored.
pub fn extract_json_block(markdown: &str) -> Option<Value> {
    let section = markdown.rfind(DATA_SECTION_HEADING)?;
    let data = &markdown[section..];
    let start = data.find(JSON_FENCE)? + JSON_FENCE.len();
    let body = &data[start..];
    let end = body.find(&format!("\n{FENCE}"))?;
    serde_json::from_str(body[..end].trim()).ok()
}

/// Collapse sorted line numbers into `3-5, 9, 12-13` style ranges.
pub fn line_ranges(lines: &[u32]) -> Vec<(u32, u32)> {
    let mut ranges: Vec<(u32, u32)> = Vec::new();
    for &line in lines {
        match ranges.last_mut() {
            Some((_, end)) if line == *end + 1 => *end = line,
            Some((_, end)) if line == *end => {}
            _ => ranges.push((line, line)),
        }
    }
    ranges
}

pub fn format_range((start, end): (u32, u32)) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{start}-{end}")
    }
}

/// Escape pipes so free text does not break table rows.
pub fn table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// First non-empty line, truncated for tables and checklists.
pub fn summarize(text: &str, max_chars: usize) -> String {
    let first = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    if first.chars().count() <= max_chars {
        first.to_string()
    } else {
        let truncated: String = first.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{truncated}…")
    }
}

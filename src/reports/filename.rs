//! Report filename codec.
//!
//! `{module}_{tool}_{type}@{YYYYMMDD-HHMM}.{md|json}`
//!
//! Module names never contain `_` and type names contain neither `_` nor
//! `@`, so the module is everything before the first `_`, the type is
//! everything after the last `_`, and the tool is what remains.

use super::context::{ReportContext, ReportType};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M";
pub const MARKDOWN_EXT: &str = "md";
pub const JSON_EXT: &str = "json";

/// Filename without extension for a context.
pub fn base_name(context: &ReportContext) -> String {
    format!(
        "{}_{}_{}@{}",
        context.module_name,
        context.tool_name,
        context.report_type.as_str(),
        context.timestamp.format(TIMESTAMP_FORMAT)
    )
}

/// Metadata decoded from a report filename stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportName {
    pub module_name: String,
    pub tool_name: String,
    pub report_type: ReportType,
    pub timestamp: NaiveDateTime,
}

impl ReportName {
    pub fn parse(stem: &str) -> Option<Self> {
        let (key, stamp) = stem.rsplit_once('@')?;
        let timestamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
        let (module_name, rest) = key.split_once('_')?;
        let (tool_name, type_name) = rest.rsplit_once('_')?;
        if module_name.is_empty() || tool_name.is_empty() {
            return None;
        }
        Some(Self {
            module_name: module_name.to_string(),
            tool_name: tool_name.to_string(),
            report_type: type_name.parse().ok()?,
            timestamp,
        })
    }

    pub fn stem(&self) -> String {
        format!(
            "{}_{}_{}@{}",
            self.module_name,
            self.tool_name,
            self.report_type.as_str(),
            self.timestamp.format(TIMESTAMP_FORMAT)
        )
    }
}

/// One report pair on disk, parsed once after listing a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFile {
    pub name: ReportName,
    pub directory: PathBuf,
    pub has_markdown: bool,
    pub has_json: bool,
}

impl ReportFile {
    pub fn markdown_path(&self) -> PathBuf {
        self.directory
            .join(format!("{}.{}", self.name.stem(), MARKDOWN_EXT))
    }

    pub fn json_path(&self) -> PathBuf {
        self.directory.join(format!("{}.{}", self.name.stem(), JSON_EXT))
    }

    /// Paths of the files of this pair that actually exist.
    pub fn existing_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(2);
        if self.has_markdown {
            paths.push(self.markdown_path());
        }
        if self.has_json {
            paths.push(self.json_path());
        }
        paths
    }

    pub fn matches(&self, module_name: &str, tool_name: Option<&str>) -> bool {
        self.name.module_name == module_name
            && tool_name.is_none_or(|tool| self.name.tool_name == tool)
    }
}

/// Split a path into a parsed name and whether it is the markdown or json half.
pub fn classify_path(path: &Path) -> Option<(ReportName, &'static str)> {
    let ext = match path.extension()?.to_str()? {
        MARKDOWN_EXT => MARKDOWN_EXT,
        JSON_EXT => JSON_EXT,
        _ => return None,
    };
    let stem = path.file_stem()?.to_str()?;
    ReportName::parse(stem).map(|name| (name, ext))
}

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of report; each kind lives in its own subdirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Coverage,
    Tests,
    Failures,
    Suite,
}

impl ReportType {
    pub const ALL: [ReportType; 4] = [
        ReportType::Coverage,
        ReportType::Tests,
        ReportType::Failures,
        ReportType::Suite,
    ];

    /// Name embedded in report filenames
    pub fn as_str(self) -> &'static str {
        match self {
            ReportType::Coverage => "coverage",
            ReportType::Tests => "tests",
            ReportType::Failures => "failures",
            ReportType::Suite => "suite",
        }
    }

    /// Subdirectory under the report root
    pub fn directory(self) -> &'static str {
        match self {
            ReportType::Coverage => "quality",
            ReportType::Tests => "reliability",
            ReportType::Failures => "failures",
            ReportType::Suite => "suite",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown report type '{s}'"))
    }
}

/// Identity of one report write. Only used to build the output path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportContext {
    pub module_name: String,
    pub report_type: ReportType,
    pub tool_name: String,
    pub timestamp: NaiveDateTime,
    pub report_id: String,
}

impl ReportContext {
    /// Capture the current local time and a fresh id.
    pub fn new(module_name: &str, report_type: ReportType, tool_name: &str) -> Self {
        Self::at(module_name, report_type, tool_name, Local::now().naive_local())
    }

    pub fn at(
        module_name: &str,
        report_type: ReportType,
        tool_name: &str,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            module_name: module_name.to_string(),
            report_type,
            tool_name: tool_name.to_string(),
            timestamp,
            report_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Whether the analyzer finished its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Complete,
    /// A subprocess failed; the report holds what was collected before that
    Incomplete,
}

/// Fields every JSON payload starts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportHeader {
    pub module: String,
    pub tool: String,
    pub report_type: ReportType,
    pub report_id: String,
    pub generated_at: String,
    pub status: ReportStatus,
}

impl ReportHeader {
    pub fn new(context: &ReportContext, status: ReportStatus) -> Self {
        Self {
            module: context.module_name.clone(),
            tool: context.tool_name.clone(),
            report_type: context.report_type,
            report_id: context.report_id.clone(),
            generated_at: context.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
            status,
        }
    }

    /// `**Generated:** ...` line shared by Markdown headers
    pub fn markdown_line(&self) -> String {
        format!(
            "**Generated:** {} | **Module:** `{}` | **Report ID:** `{}`",
            self.generated_at.replace('T', " "),
            self.module,
            self.report_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_type_round_trips_through_str() {
        for report_type in ReportType::ALL {
            assert_eq!(report_type.as_str().parse::<ReportType>(), Ok(report_type));
        }
        assert!("quality".parse::<ReportType>().is_err());
    }

    #[test]
    fn test_directories() {
        assert_eq!(ReportType::Coverage.directory(), "quality");
        assert_eq!(ReportType::Tests.directory(), "reliability");
    }

    #[test]
    fn test_contexts_get_distinct_ids() {
        let a = ReportContext::new("auth-fo", ReportType::Coverage, "analyze_coverage");
        let b = ReportContext::new("auth-fo", ReportType::Coverage, "analyze_coverage");
        assert_ne!(a.report_id, b.report_id);
    }

    #[test]
    fn test_header_serializes_status_lowercase() {
        let timestamp = chrono::NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 7, 0)
            .unwrap();
        let context = ReportContext::at("auth-fo", ReportType::Tests, "analyze_tests", timestamp);
        let header = ReportHeader::new(&context, ReportStatus::Incomplete);
        let json = serde_json::to_value(&header).unwrap();

        assert_eq!(json["status"], "incomplete");
        assert_eq!(json["report_type"], "tests");
        assert_eq!(json["generated_at"], "2024-03-05T14:07:00");
    }
}

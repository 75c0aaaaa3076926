//! Coverage history for a module and progress toward a target.
//!
//! Every complete coverage run appends a sample to
//! `<report root>/history/<module>_coverage.jsonl`. Report retention never
//! touches that file, so the trend survives `--keep 1`. Reports still on
//! disk that predate the history file are merged in by report id.

use crate::errors::{AnalyzerError, Result};
use crate::reports::{extract_json_from_report, ReportManager, ReportStatus, ReportType};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_TARGET_PERCENT: f64 = 95.0;

/// Directory under the report root that retention leaves alone.
pub const HISTORY_DIR: &str = "history";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageSample {
    pub generated_at: NaiveDateTime,
    pub percent: f64,
    pub tool: String,
    #[serde(default)]
    pub report_id: String,
    /// Where the report was written; it may since have been cleaned up
    pub report: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub module: String,
    pub target_percent: f64,
    /// Oldest first
    pub samples: Vec<CoverageSample>,
    pub progress_percent: f64,
    /// Tests in the module's latest complete reliability report
    pub test_count: Option<usize>,
    pub estimated_remaining_tests: Option<usize>,
}

impl ProgressSummary {
    pub fn first(&self) -> Option<&CoverageSample> {
        self.samples.first()
    }

    pub fn current(&self) -> Option<&CoverageSample> {
        self.samples.last()
    }

    /// Change between the oldest and newest sample, in percentage points.
    pub fn delta(&self) -> f64 {
        match (self.first(), self.current()) {
            (Some(first), Some(current)) => current.percent - first.percent,
            _ => 0.0,
        }
    }
}

/// Share of the distance from `first` to `target` covered so far, 0..=100.
pub fn progress_toward(first: f64, current: f64, target: f64) -> f64 {
    if target <= first {
        return 100.0;
    }
    ((current - first) / (target - first) * 100.0).clamp(0.0, 100.0)
}

/// Tests still needed to reach `target`, assuming each existing test
/// contributed an equal share of the current coverage.
///
/// `None` when there is nothing to extrapolate from.
pub fn estimate_remaining_tests(current: f64, test_count: usize, target: f64) -> Option<usize> {
    if current >= target {
        return Some(0);
    }
    if test_count == 0 || current <= 0.0 {
        return None;
    }
    let per_test = current / test_count as f64;
    Some(((target - current) / per_test).ceil() as usize)
}

pub fn history_path(report_root: &Path, module_name: &str) -> PathBuf {
    report_root
        .join(HISTORY_DIR)
        .join(format!("{module_name}_coverage.jsonl"))
}

/// Append one sample to the module's history file.
pub fn record_sample(report_root: &Path, module_name: &str, sample: &CoverageSample) -> Result<()> {
    let path = history_path(report_root, module_name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| AnalyzerError::file_system(parent, e))?;
    }
    let line = serde_json::to_string(sample)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .and_then(|mut file| writeln!(file, "{line}"))
        .map_err(|e| AnalyzerError::file_system(&path, e))
}

/// Samples from the history file; unparsable lines are skipped.
pub fn read_history(report_root: &Path, module_name: &str) -> Result<Vec<CoverageSample>> {
    let path = history_path(report_root, module_name);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(AnalyzerError::file_system(&path, e)),
    };
    let mut samples = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(sample) => samples.push(sample),
            Err(e) => tracing::warn!(path = %path.display(), line = index + 1, "skipping history entry: {}", e),
        }
    }
    Ok(samples)
}

fn generated_at(json: &Value) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(json.get("generated_at")?.as_str()?, "%Y-%m-%dT%H:%M:%S").ok()
}

fn is_complete(json: &Value) -> bool {
    let status: Option<ReportStatus> = json
        .get("status")
        .and_then(|s| serde_json::from_value(s.clone()).ok());
    status != Some(ReportStatus::Incomplete)
}

/// The module's history file plus any complete coverage report it does not
/// list yet, oldest first.
pub fn coverage_history(manager: &ReportManager, module_name: &str) -> Result<Vec<CoverageSample>> {
    let mut samples = read_history(manager.root(), module_name)?;
    let known: HashSet<String> = samples
        .iter()
        .map(|s| s.report_id.clone())
        .filter(|id| !id.is_empty())
        .collect();
    for file in manager.list_reports(ReportType::Coverage)? {
        if !file.has_markdown || file.name.module_name != module_name {
            continue;
        }
        let path = file.markdown_path();
        let Some(json) = extract_json_from_report(&path) else {
            tracing::debug!(path = %path.display(), "skipping report without JSON");
            continue;
        };
        if !is_complete(&json) {
            continue;
        }
        let report_id = json
            .get("report_id")
            .and_then(|id| id.as_str())
            .unwrap_or_default()
            .to_string();
        if known.contains(&report_id) {
            continue;
        }
        let Some(percent) = json.get("overall_percent").and_then(|p| p.as_f64()) else {
            continue;
        };
        samples.push(CoverageSample {
            generated_at: generated_at(&json).unwrap_or(file.name.timestamp),
            percent,
            tool: file.name.tool_name.clone(),
            report_id,
            report: path,
        });
    }
    samples.sort_by(|a, b| a.generated_at.cmp(&b.generated_at));
    Ok(samples)
}

/// Test count from the module's newest complete reliability report.
fn latest_test_count(manager: &ReportManager, module_name: &str) -> Result<Option<usize>> {
    let Some(path) = manager.find_latest_report(module_name, ReportType::Tests, None)? else {
        return Ok(None);
    };
    Ok(extract_json_from_report(&path)
        .filter(is_complete)
        .and_then(|json| json.pointer("/summary/total_tests")?.as_u64())
        .map(|n| n as usize))
}

/// `None` when the module has no coverage history yet.
pub fn track(
    manager: &ReportManager,
    module_name: &str,
    target_percent: f64,
) -> Result<Option<ProgressSummary>> {
    let samples = coverage_history(manager, module_name)?;
    let (Some(first), Some(current)) = (samples.first(), samples.last()) else {
        return Ok(None);
    };
    let progress_percent = progress_toward(first.percent, current.percent, target_percent);
    let test_count = latest_test_count(manager, module_name)?;
    let estimated_remaining_tests =
        test_count.and_then(|count| estimate_remaining_tests(current.percent, count, target_percent));
    Ok(Some(ProgressSummary {
        module: module_name.to_string(),
        target_percent,
        progress_percent,
        test_count,
        estimated_remaining_tests,
        samples,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::markdown::append_json_section;
    use crate::reports::ReportContext;
    use chrono::{Duration, NaiveDate};
    use serde_json::json;
    use tempfile::TempDir;

    fn at(hours_ago: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 18)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            - Duration::hours(hours_ago)
    }

    fn seed_report(manager: &ReportManager, report_type: ReportType, hours_ago: i64, data: Value) {
        let context = ReportContext::at("auth-fo", report_type, "seeded", at(hours_ago));
        let mut markdown = String::from("# Seeded\n");
        append_json_section(&mut markdown, &data);
        manager
            .write_report(&context, &markdown, &data, usize::MAX)
            .unwrap();
    }

    fn seed(manager: &ReportManager, module: &str, hours_ago: i64, percent: f64, status: &str) {
        let context = ReportContext::at(module, ReportType::Coverage, "analyze_coverage", at(hours_ago));
        let data = json!({
            "generated_at": at(hours_ago).format("%Y-%m-%dT%H:%M:%S").to_string(),
            "report_id": context.report_id,
            "status": status,
            "overall_percent": percent,
        });
        let mut markdown = String::from("# Coverage\n");
        append_json_section(&mut markdown, &data);
        manager
            .write_report(&context, &markdown, &data, usize::MAX)
            .unwrap();
    }

    fn sample(hours_ago: i64, percent: f64, report_id: &str) -> CoverageSample {
        CoverageSample {
            generated_at: at(hours_ago),
            percent,
            tool: "analyze_coverage".into(),
            report_id: report_id.into(),
            report: PathBuf::from("tests_reports/quality/gone.md"),
        }
    }

    #[test]
    fn test_progress_formula() {
        assert_eq!(progress_toward(60.0, 78.0, 96.0), 50.0);
        assert_eq!(progress_toward(60.0, 50.0, 95.0), 0.0);
        assert_eq!(progress_toward(60.0, 99.0, 95.0), 100.0);
        assert_eq!(progress_toward(97.0, 90.0, 95.0), 100.0);
    }

    #[test]
    fn test_history_is_ordered_and_filtered() {
        let dir = TempDir::new().unwrap();
        let manager = ReportManager::new(dir.path());
        seed(&manager, "auth-fo", 1, 80.0, "complete");
        seed(&manager, "auth-fo", 5, 60.0, "complete");
        seed(&manager, "auth-fo", 3, 0.0, "incomplete");
        seed(&manager, "cart-fo", 2, 10.0, "complete");

        let summary = track(&manager, "auth-fo", 100.0).unwrap().unwrap();
        let percents: Vec<f64> = summary.samples.iter().map(|s| s.percent).collect();
        assert_eq!(percents, vec![60.0, 80.0]);
        assert_eq!(summary.delta(), 20.0);
        assert_eq!(summary.progress_percent, 50.0);
    }

    #[test]
    fn test_history_file_outlives_reports() {
        let dir = TempDir::new().unwrap();
        let manager = ReportManager::new(dir.path());
        record_sample(dir.path(), "auth-fo", &sample(48, 40.0, "a")).unwrap();
        record_sample(dir.path(), "auth-fo", &sample(24, 55.0, "b")).unwrap();
        fs::write(
            history_path(dir.path(), "auth-fo"),
            fs::read_to_string(history_path(dir.path(), "auth-fo")).unwrap() + "not json\n",
        )
        .unwrap();
        seed(&manager, "auth-fo", 1, 70.0, "complete");

        let percents: Vec<f64> = coverage_history(&manager, "auth-fo")
            .unwrap()
            .iter()
            .map(|s| s.percent)
            .collect();
        assert_eq!(percents, vec![40.0, 55.0, 70.0]);
    }

    #[test]
    fn test_reports_already_in_history_are_not_counted_twice() {
        let dir = TempDir::new().unwrap();
        let manager = ReportManager::new(dir.path());
        seed(&manager, "auth-fo", 1, 70.0, "complete");
        let report = manager.list_reports(ReportType::Coverage).unwrap().remove(0);
        let json = extract_json_from_report(&report.markdown_path()).unwrap();
        let id = json["report_id"].as_str().unwrap();
        record_sample(dir.path(), "auth-fo", &sample(1, 70.0, id)).unwrap();

        assert_eq!(coverage_history(&manager, "auth-fo").unwrap().len(), 1);
    }

    #[test]
    fn test_estimate_remaining_tests() {
        assert_eq!(estimate_remaining_tests(96.0, 100, 95.0), Some(0));
        // 0.5 points per test, 10 points to go
        assert_eq!(estimate_remaining_tests(50.0, 100, 60.0), Some(20));
        assert_eq!(estimate_remaining_tests(50.0, 0, 60.0), None);
        assert_eq!(estimate_remaining_tests(0.0, 10, 60.0), None);
    }

    #[test]
    fn test_estimate_uses_latest_complete_reliability_report() {
        let dir = TempDir::new().unwrap();
        let manager = ReportManager::new(dir.path());
        seed(&manager, "auth-fo", 2, 40.0, "complete");
        seed(&manager, "auth-fo", 1, 50.0, "complete");
        seed_report(
            &manager,
            ReportType::Tests,
            1,
            json!({"status": "complete", "summary": {"total_tests": 25}}),
        );

        let summary = track(&manager, "auth-fo", 60.0).unwrap().unwrap();
        assert_eq!(summary.test_count, Some(25));
        assert_eq!(summary.estimated_remaining_tests, Some(5));
    }

    #[test]
    fn test_no_reports() {
        let dir = TempDir::new().unwrap();
        let manager = ReportManager::new(dir.path());
        assert!(track(&manager, "auth-fo", DEFAULT_TARGET_PERCENT).unwrap().is_none());
    }
}

//! Report lifecycle: paired writes, retention, and lookup.
//!
//! Reports are grouped by `(module, tool)` within a report type directory.
//! Cleanup keeps the newest `keep` pairs of each group and never removes a
//! pair whose embedded timestamp is less than [`SAFETY_WINDOW_MINUTES`] old,
//! so one tool's cleanup cannot delete a report another tool is still
//! relying on.

use super::context::{ReportContext, ReportType};
use super::filename::{base_name, classify_path, ReportFile, JSON_EXT, MARKDOWN_EXT};
use super::markdown::extract_json_block;
use crate::errors::{AnalyzerError, Result};
use chrono::{Duration, Local, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const SAFETY_WINDOW_MINUTES: i64 = 60;

/// Result of one paired write.
#[derive(Debug, Clone, Serialize)]
pub struct WrittenReport {
    pub context: ReportContext,
    pub markdown_path: PathBuf,
    pub json_path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupSummary {
    /// Files removed (or that would be removed in a dry run)
    pub deleted: Vec<PathBuf>,
    /// Pairs past the retention count kept because they are too recent
    pub protected: Vec<PathBuf>,
}

impl CleanupSummary {
    pub fn merge(&mut self, other: CleanupSummary) {
        self.deleted.extend(other.deleted);
        self.protected.extend(other.protected);
    }
}

#[derive(Debug, Clone)]
pub struct ReportManager {
    root: PathBuf,
    clock: fn() -> NaiveDateTime,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl ReportManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            clock: local_now,
        }
    }

    /// Replace the clock used for report timestamps and the safety window.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn directory(&self, report_type: ReportType) -> PathBuf {
        self.root.join(report_type.directory())
    }

    pub fn start_report(
        &self,
        module_name: &str,
        report_type: ReportType,
        tool_name: &str,
    ) -> ReportContext {
        ReportContext::at(module_name, report_type, tool_name, (self.clock)())
    }

    /// Write the `.md`/`.json` pair, then apply retention for the context's group.
    pub fn write_report(
        &self,
        context: &ReportContext,
        markdown: &str,
        data: &Value,
        keep: usize,
    ) -> Result<WrittenReport> {
        let directory = self.directory(context.report_type);
        fs::create_dir_all(&directory)
            .map_err(|e| AnalyzerError::file_system(&directory, e))?;

        let base = base_name(context);
        let markdown_path = directory.join(format!("{base}.{MARKDOWN_EXT}"));
        let json_path = directory.join(format!("{base}.{JSON_EXT}"));
        let json = serde_json::to_string_pretty(data)?;

        write_pair(&markdown_path, markdown, &json_path, &json)?;
        tracing::info!(path = %markdown_path.display(), "report written");

        if let Err(e) = self.cleanup_reports(&context.module_name, context.report_type, keep, false)
        {
            tracing::warn!("Report cleanup failed: {}", e);
        }

        Ok(WrittenReport {
            context: context.clone(),
            markdown_path,
            json_path,
        })
    }

    /// Every parsable report pair of a type, newest first.
    pub fn list_reports(&self, report_type: ReportType) -> Result<Vec<ReportFile>> {
        let directory = self.directory(report_type);
        let entries = match fs::read_dir(&directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AnalyzerError::file_system(&directory, e)),
        };

        let mut pairs: BTreeMap<String, ReportFile> = BTreeMap::new();
        for entry in entries {
            let path = entry?.path();
            let Some((name, ext)) = classify_path(&path) else {
                continue;
            };
            if name.report_type != report_type {
                continue;
            }
            let file = pairs.entry(name.stem()).or_insert_with(|| ReportFile {
                name,
                directory: directory.clone(),
                has_markdown: false,
                has_json: false,
            });
            if ext == MARKDOWN_EXT {
                file.has_markdown = true;
            } else {
                file.has_json = true;
            }
        }

        let mut files: Vec<ReportFile> = pairs.into_values().collect();
        files.sort_by(|a, b| {
            b.name
                .timestamp
                .cmp(&a.name.timestamp)
                .then_with(|| a.name.stem().cmp(&b.name.stem()))
        });
        Ok(files)
    }

    /// Keep the newest `keep` pairs per `(module, tool)` for one module.
    pub fn cleanup_reports(
        &self,
        module_name: &str,
        report_type: ReportType,
        keep: usize,
        dry_run: bool,
    ) -> Result<CleanupSummary> {
        let reports = self
            .list_reports(report_type)?
            .into_iter()
            .filter(|r| r.name.module_name == module_name)
            .collect();
        self.cleanup_groups(reports, keep, dry_run)
    }

    /// Retention across every module of a type.
    pub fn cleanup_all(
        &self,
        report_type: ReportType,
        keep: usize,
        dry_run: bool,
    ) -> Result<CleanupSummary> {
        let reports = self.list_reports(report_type)?;
        self.cleanup_groups(reports, keep, dry_run)
    }

    fn cleanup_groups(
        &self,
        reports: Vec<ReportFile>,
        keep: usize,
        dry_run: bool,
    ) -> Result<CleanupSummary> {
        let now = (self.clock)();
        let mut groups: BTreeMap<(String, String), Vec<ReportFile>> = BTreeMap::new();
        for report in reports {
            let key = (report.name.module_name.clone(), report.name.tool_name.clone());
            groups.entry(key).or_default().push(report);
        }

        let mut summary = CleanupSummary::default();
        for (_, group) in groups {
            // list_reports already sorted newest first
            summary.merge(self.prune_group(&group, keep, now, dry_run)?);
        }
        Ok(summary)
    }

    fn prune_group(
        &self,
        group: &[ReportFile],
        keep: usize,
        now: NaiveDateTime,
        dry_run: bool,
    ) -> Result<CleanupSummary> {
        let mut summary = CleanupSummary::default();
        let window = Duration::minutes(SAFETY_WINDOW_MINUTES);

        for report in group.iter().skip(keep) {
            if now.signed_duration_since(report.name.timestamp) < window {
                summary.protected.push(report.markdown_path());
                continue;
            }
            let paths = report.existing_paths();
            if !dry_run {
                delete_pair(&paths)?;
                tracing::debug!(report = %report.name.stem(), "old report removed");
            }
            summary.deleted.extend(paths);
        }
        Ok(summary)
    }

    /// Markdown path of the newest report for a module, optionally narrowed to one tool.
    pub fn find_latest_report(
        &self,
        module_name: &str,
        report_type: ReportType,
        tool_name: Option<&str>,
    ) -> Result<Option<PathBuf>> {
        Ok(self
            .list_reports(report_type)?
            .into_iter()
            .find(|r| r.has_markdown && r.matches(module_name, tool_name))
            .map(|r| r.markdown_path()))
    }
}

/// Read a report's Markdown and parse its fenced JSON block.
pub fn extract_json_from_report(path: &Path) -> Option<Value> {
    let contents = fs::read_to_string(path)
        .map_err(|e| tracing::debug!("Cannot read report {}: {}", path.display(), e))
        .ok()?;
    extract_json_block(&contents)
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

/// Both files land or neither does: write temps, then rename into place.
fn write_pair(markdown_path: &Path, markdown: &str, json_path: &Path, json: &str) -> Result<()> {
    let md_tmp = temp_path(markdown_path);
    let json_tmp = temp_path(json_path);

    let staged = fs::write(&md_tmp, markdown)
        .and_then(|_| fs::write(&json_tmp, json))
        .and_then(|_| fs::rename(&json_tmp, json_path));
    if let Err(e) = staged {
        let _ = fs::remove_file(&md_tmp);
        let _ = fs::remove_file(&json_tmp);
        return Err(AnalyzerError::file_system(json_path, e));
    }

    if let Err(e) = fs::rename(&md_tmp, markdown_path) {
        let _ = fs::remove_file(&md_tmp);
        let _ = fs::remove_file(json_path);
        return Err(AnalyzerError::file_system(markdown_path, e));
    }
    Ok(())
}

/// Move every file aside first so a failure leaves the pair intact.
fn delete_pair(paths: &[PathBuf]) -> Result<()> {
    let mut moved: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(paths.len());
    for path in paths {
        let aside = path.with_extension(format!(
            "{}.deleting",
            path.extension().and_then(|e| e.to_str()).unwrap_or("")
        ));
        if let Err(e) = fs::rename(path, &aside) {
            for (original, aside) in moved.iter().rev() {
                let _ = fs::rename(aside, original);
            }
            return Err(AnalyzerError::file_system(path, e));
        }
        moved.push((path.clone(), aside));
    }
    for (_, aside) in moved {
        if let Err(e) = fs::remove_file(&aside) {
            tracing::warn!("Failed to remove {}: {}", aside.display(), e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use tempfile::TempDir;

    fn fixed_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 18)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn write_at(manager: &ReportManager, hours_ago: i64, minutes_ago: i64) -> WrittenReport {
        let stamp = fixed_now() - Duration::hours(hours_ago) - Duration::minutes(minutes_ago);
        let context = ReportContext::at("auth-fo", ReportType::Coverage, "analyze_coverage", stamp);
        // keep everything while seeding
        manager
            .write_report(&context, "# seeded\n", &json!({"seed": true}), usize::MAX)
            .unwrap()
    }

    #[test]
    fn test_write_creates_pair() {
        let dir = TempDir::new().unwrap();
        let manager = ReportManager::new(dir.path()).with_clock(fixed_now);
        let context = manager.start_report("auth-fo", ReportType::Tests, "analyze_tests");

        let written = manager
            .write_report(&context, "# Tests\n", &json!({"ok": true}), 1)
            .unwrap();

        assert!(written.markdown_path.ends_with(
            "reliability/auth-fo_analyze_tests_tests@20261018-1200.md"
        ));
        assert!(written.markdown_path.exists());
        assert!(written.json_path.exists());
        let leftovers: Vec<_> = fs::read_dir(dir.path().join("reliability"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_keep_one_removes_old_pair() {
        let dir = TempDir::new().unwrap();
        let manager = ReportManager::new(dir.path()).with_clock(fixed_now);
        let old = write_at(&manager, 3, 0);
        let new = write_at(&manager, 0, 0);

        let summary = manager
            .cleanup_reports("auth-fo", ReportType::Coverage, 1, false)
            .unwrap();

        assert_eq!(summary.deleted.len(), 2);
        assert!(!old.markdown_path.exists());
        assert!(!old.json_path.exists());
        assert!(new.markdown_path.exists());
        assert_eq!(manager.list_reports(ReportType::Coverage).unwrap().len(), 1);
    }

    #[test]
    fn test_recent_reports_survive_cleanup() {
        let dir = TempDir::new().unwrap();
        let manager = ReportManager::new(dir.path()).with_clock(fixed_now);
        let older = write_at(&manager, 0, 20);
        write_at(&manager, 0, 0);

        let summary = manager
            .cleanup_reports("auth-fo", ReportType::Coverage, 1, false)
            .unwrap();

        assert!(summary.deleted.is_empty());
        assert_eq!(summary.protected, vec![older.markdown_path.clone()]);
        assert!(older.markdown_path.exists());
    }

    #[test]
    fn test_dry_run_deletes_nothing() {
        let dir = TempDir::new().unwrap();
        let manager = ReportManager::new(dir.path()).with_clock(fixed_now);
        let old = write_at(&manager, 5, 0);
        write_at(&manager, 0, 0);

        let summary = manager.cleanup_all(ReportType::Coverage, 1, true).unwrap();
        assert_eq!(summary.deleted.len(), 2);
        assert!(old.markdown_path.exists());
    }

    #[test]
    fn test_groups_are_independent_per_tool_and_module() {
        let dir = TempDir::new().unwrap();
        let manager = ReportManager::new(dir.path()).with_clock(fixed_now);
        let stamp = fixed_now() - Duration::hours(4);
        for (module, tool) in [("auth-fo", "analyze_coverage"), ("auth-fo", "legacy"), ("pay-fo", "analyze_coverage")] {
            let context = ReportContext::at(module, ReportType::Coverage, tool, stamp);
            manager.write_report(&context, "# x\n", &json!({}), usize::MAX).unwrap();
        }

        let summary = manager.cleanup_all(ReportType::Coverage, 1, false).unwrap();
        assert!(summary.deleted.is_empty());
        assert_eq!(manager.list_reports(ReportType::Coverage).unwrap().len(), 3);
    }

    #[test]
    fn test_find_latest_and_extract_json() {
        let dir = TempDir::new().unwrap();
        let manager = ReportManager::new(dir.path()).with_clock(fixed_now);
        write_at(&manager, 2, 0);
        let newest = fixed_now() - Duration::minutes(1);
        let context = ReportContext::at("auth-fo", ReportType::Coverage, "analyze_coverage", newest);
        let mut md = String::from("# Coverage\n");
        crate::reports::markdown::append_json_section(&mut md, &json!({"overall_percent": 88.5}));
        manager
            .write_report(&context, &md, &json!({"overall_percent": 88.5}), usize::MAX)
            .unwrap();

        let latest = manager
            .find_latest_report("auth-fo", ReportType::Coverage, Some("analyze_coverage"))
            .unwrap()
            .unwrap();
        assert!(latest.to_string_lossy().contains("@20261018-1159"));
        assert_eq!(
            extract_json_from_report(&latest),
            Some(json!({"overall_percent": 88.5}))
        );

        assert!(manager
            .find_latest_report("auth-fo", ReportType::Coverage, Some("other"))
            .unwrap()
            .is_none());
        assert!(manager
            .find_latest_report("auth-fo", ReportType::Suite, None)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_foreign_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        let manager = ReportManager::new(dir.path()).with_clock(fixed_now);
        fs::create_dir_all(dir.path().join("quality")).unwrap();
        fs::write(dir.path().join("quality/notes.md"), "hi").unwrap();
        assert!(manager.list_reports(ReportType::Coverage).unwrap().is_empty());
    }
}

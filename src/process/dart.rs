use super::CommandSpec;
use std::path::{Path, PathBuf};

/// Scratch directory (relative to the project root) for raw coverage; wiped before each run
pub const COVERAGE_DIR: &str = ".dart_tool/test_analyzer/coverage";
pub const LCOV_FILE: &str = "lcov.info";
const PACKAGE_CONFIG: &str = ".dart_tool/package_config.json";

/// Builds `dart` command lines for one project.
#[derive(Debug, Clone)]
pub struct DartTool {
    executable: PathBuf,
    project_root: PathBuf,
}

impl DartTool {
    pub fn new(executable: impl Into<PathBuf>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            project_root: project_root.into(),
        }
    }

    /// Use the configured executable, else whatever `dart` is on `PATH`.
    pub fn locate(configured: Option<PathBuf>, project_root: impl Into<PathBuf>) -> Self {
        let executable = configured
            .or_else(|| which::which("dart").ok())
            .unwrap_or_else(|| PathBuf::from("dart"));
        Self::new(executable, project_root)
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new(&self.executable, &self.project_root)
    }

    /// `dart test --coverage=coverage <test_path>`
    pub fn test_with_coverage(&self, test_path: &str, coverage_dir: &str) -> CommandSpec {
        self.command()
            .arg("test")
            .arg(format!("--coverage={coverage_dir}"))
            .arg(test_path)
    }

    /// Convert raw VM coverage into LCOV restricted to `source_path`.
    pub fn format_coverage(&self, coverage_dir: &str, source_path: &str) -> CommandSpec {
        self.command().args([
            "pub".to_string(),
            "global".to_string(),
            "run".to_string(),
            "coverage:format_coverage".to_string(),
            "--lcov".to_string(),
            format!("--in={coverage_dir}"),
            format!("--out={coverage_dir}/{LCOV_FILE}"),
            format!("--report-on={source_path}"),
            format!("--packages={PACKAGE_CONFIG}"),
        ])
    }

    /// `dart test --reporter json`; `workers` of `None` forces a single worker.
    pub fn test_json(&self, test_path: &str, workers: Option<usize>) -> CommandSpec {
        let concurrency = workers.unwrap_or(1).max(1);
        self.command()
            .args(["test", "--reporter", "json"])
            .arg(format!("--concurrency={concurrency}"))
            .arg(test_path)
    }

    pub fn lcov_path(&self, coverage_dir: &str) -> PathBuf {
        self.project_root.join(coverage_dir).join(LCOV_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage_commands() {
        let dart = DartTool::new("dart", "/proj");
        assert_eq!(
            dart.test_with_coverage("test/auth", "coverage").display(),
            "dart test --coverage=coverage test/auth"
        );
        let format = dart.format_coverage("coverage", "lib/src/auth");
        assert!(format.args.contains(&"--report-on=lib/src/auth".to_string()));
        assert!(format.args.contains(&"--out=coverage/lcov.info".to_string()));
        assert_eq!(format.working_dir, PathBuf::from("/proj"));
        assert_eq!(
            dart.lcov_path(COVERAGE_DIR),
            PathBuf::from("/proj/.dart_tool/test_analyzer/coverage/lcov.info")
        );
    }

    #[test]
    fn test_json_reporter_command() {
        let dart = DartTool::new("dart", ".");
        assert_eq!(
            dart.test_json("test/auth", None).display(),
            "dart test --reporter json --concurrency=1 test/auth"
        );
        assert!(dart
            .test_json("test", Some(4))
            .args
            .contains(&"--concurrency=4".to_string()));
    }

    #[test]
    fn test_locate_prefers_configured() {
        let dart = DartTool::locate(Some(PathBuf::from("/opt/dart/bin/dart")), ".");
        assert_eq!(dart.command().program, PathBuf::from("/opt/dart/bin/dart"));
    }
}

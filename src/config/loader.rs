use std::fs;
use std::path::Path;

use super::AnalyzerConfig;
use crate::errors::{AnalyzerError, Result};

pub const CONFIG_FILE_NAME: &str = ".test-analyzer.toml";

/// Pure function to parse config from a TOML string
pub fn parse_config(contents: &str) -> Result<AnalyzerConfig> {
    toml::from_str::<AnalyzerConfig>(contents)
        .map_err(|e| AnalyzerError::Config(format!("Failed to parse {CONFIG_FILE_NAME}: {e}")))
}

/// Load `.test-analyzer.toml` from the project root if it exists.
///
/// A missing file yields defaults silently; an unreadable or malformed file
/// yields defaults with a warning.
pub fn load_config(project_root: &Path) -> AnalyzerConfig {
    let config_path = project_root.join(CONFIG_FILE_NAME);
    let contents = match fs::read_to_string(&config_path) {
        Ok(contents) => contents,
        Err(e) => {
            handle_read_error(&config_path, &e);
            return AnalyzerConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(config) => {
            tracing::debug!("Loaded config from {}", config_path.display());
            config
        }
        Err(e) => {
            tracing::warn!(path = %config_path.display(), "{}; using defaults", e);
            AnalyzerConfig::default()
        }
    }
}

/// Handle file read errors with appropriate logging
fn handle_read_error(config_path: &Path, error: &std::io::Error) {
    // Only log actual errors, not "file not found"
    if error.kind() != std::io::ErrorKind::NotFound {
        tracing::warn!(
            "Failed to read config file {}: {}",
            config_path.display(),
            error
        );
    }
}

/// Default config written by `init`
pub const DEFAULT_CONFIG: &str = r#"# test-analyzer configuration

[coverage]
# Runs below this percentage fail with exit code 1
minimum = 80.0
# Runs below this percentage are flagged as a warning
warning = 90.0
# Fail when coverage drops below the saved baseline
fail_on_decrease = false
# baseline = "tests_reports/baseline/coverage.json"

[tests]
runs = 3
slow_threshold_secs = 1.0
# workers = 4

[process]
# dart_executable = "/usr/local/bin/dart"
timeout_secs = 600

[reports]
root = "tests_reports"
keep = 1
"#;

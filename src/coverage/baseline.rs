//! Saved coverage snapshots used to detect regressions.

use crate::errors::{AnalyzerError, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub module: String,
    pub coverage_percent: f64,
    pub total_lines: usize,
    pub hit_lines: usize,
    pub saved_at: DateTime<Local>,
}

impl Baseline {
    /// `Ok(None)` when no snapshot has been saved yet.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No baseline at {}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(AnalyzerError::file_system(path, e)),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| AnalyzerError::parse(path.display().to_string(), e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AnalyzerError::file_system(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| AnalyzerError::file_system(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/baseline.json");
        let baseline = Baseline {
            module: "auth-fo".into(),
            coverage_percent: 82.5,
            total_lines: 200,
            hit_lines: 165,
            saved_at: Local::now(),
        };

        baseline.save(&path).unwrap();
        assert_eq!(Baseline::load(&path).unwrap(), Some(baseline));
    }

    #[test]
    fn test_missing_and_corrupt_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("baseline.json");
        assert_eq!(Baseline::load(&path).unwrap(), None);

        fs::write(&path, "{\"module\": 3}").unwrap();
        assert!(matches!(
            Baseline::load(&path),
            Err(AnalyzerError::Parse { .. })
        ));
    }
}

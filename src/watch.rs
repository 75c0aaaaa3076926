//! `--watch`: re-run an analyzer whenever files under its paths change.
//!
//! Polls modification times rather than subscribing to filesystem events.

use crate::errors::Result;
use crate::pipeline::Outcome;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};
use walkdir::WalkDir;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

/// Modification time of every file under the watched paths.
pub type Snapshot = BTreeMap<PathBuf, SystemTime>;

pub fn snapshot(paths: &[PathBuf]) -> Snapshot {
    let mut files = Snapshot::new();
    for root in paths {
        for entry in WalkDir::new(root).follow_links(true).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            // Files can disappear between listing and stat
            if let Some(modified) = entry.metadata().ok().and_then(|m| m.modified().ok()) {
                files.insert(entry.into_path(), modified);
            }
        }
    }
    files
}

pub struct Watcher {
    paths: Vec<PathBuf>,
    interval: Duration,
    last: Snapshot,
}

impl Watcher {
    pub fn new(paths: Vec<PathBuf>, interval: Duration) -> Self {
        let last = snapshot(&paths);
        Self {
            paths,
            interval,
            last,
        }
    }

    /// Take a fresh snapshot; true when any file was added, removed or touched.
    pub fn poll(&mut self) -> bool {
        let current = snapshot(&self.paths);
        if current == self.last {
            return false;
        }
        self.last = current;
        true
    }

    /// Block until the next change.
    pub fn wait_for_change(&mut self) {
        loop {
            thread::sleep(self.interval);
            if self.poll() {
                return;
            }
        }
    }
}

/// Run once, then again after every change. Only the first run's error is
/// returned; later failures are logged and watching continues.
pub fn watch<F>(paths: &[&Path], interval: Duration, mut run: F) -> Result<()>
where
    F: FnMut() -> Result<Outcome>,
{
    let mut watcher = Watcher::new(paths.iter().map(|p| p.to_path_buf()).collect(), interval);
    let first = run()?;
    tracing::info!(exit_code = first.exit_code, "watching for changes");
    loop {
        watcher.wait_for_change();
        eprintln!("Change detected, re-running analysis...");
        match run() {
            Ok(outcome) => tracing::info!(exit_code = outcome.exit_code, "re-run finished"),
            Err(e) => tracing::error!("re-run failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_poll_detects_new_and_removed_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a_test.dart"), "void main() {}").unwrap();
        let mut watcher = Watcher::new(vec![dir.path().to_path_buf()], Duration::from_millis(10));
        assert!(!watcher.poll());

        fs::write(dir.path().join("b_test.dart"), "void main() {}").unwrap();
        assert!(watcher.poll());
        assert!(!watcher.poll());

        fs::remove_file(dir.path().join("a_test.dart")).unwrap();
        assert!(watcher.poll());
    }

    #[test]
    fn test_snapshot_skips_missing_roots() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/a.dart"), "").unwrap();
        let files = snapshot(&[dir.path().join("lib"), dir.path().join("missing")]);
        assert_eq!(files.len(), 1);
    }
}

//! Test ↔ source path inference.
//!
//! Dart projects mirror `lib/` under `test/`: `lib/src/auth/login.dart` is
//! tested by `test/auth/login_test.dart`. Given either side the resolver
//! infers the other, preferring `lib/src/<rest>` over `lib/<rest>` when the
//! former exists.

use super::normalize_path;
use crate::errors::{AnalyzerError, Result};
use std::path::{Path, PathBuf};

/// Which side of the mirror an input path lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSide {
    Test,
    Source,
}

impl PathSide {
    pub fn of(path: &str) -> Option<Self> {
        let normalized = normalize_path(path);
        if normalized == "test" || normalized.starts_with("test/") {
            Some(PathSide::Test)
        } else if normalized == "lib" || normalized.starts_with("lib/") {
            Some(PathSide::Source)
        } else {
            None
        }
    }
}

/// A validated test/source pair, both relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub test_path: String,
    pub source_path: String,
    /// Side the user pointed at
    pub input_side: PathSide,
}

impl ResolvedPaths {
    /// The path the user actually asked about, used for module naming.
    pub fn primary(&self) -> &str {
        match self.input_side {
            PathSide::Test => &self.test_path,
            PathSide::Source => &self.source_path,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn exists(&self, relative: &str) -> bool {
        self.root.join(relative).exists()
    }

    /// Make an input path root-relative and `/`-separated.
    pub fn relativize(&self, path: &str) -> String {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            let canonical = self.root.canonicalize().ok();
            let roots = std::iter::once(self.root.as_path()).chain(canonical.as_deref());
            for root in roots {
                if let Ok(stripped) = candidate.strip_prefix(root) {
                    return normalize_path(&stripped.to_string_lossy());
                }
            }
        }
        normalize_path(path)
    }

    /// `test/auth/login_test.dart` → `lib/src/auth/login.dart` or `lib/auth/login.dart`.
    ///
    /// `lib/src/...` wins only when it exists under the project root.
    pub fn infer_source_path(&self, test_path: &str) -> Option<String> {
        let normalized = self.relativize(test_path);
        if normalized == "test" {
            return Some("lib".to_string());
        }
        let rest = normalized.strip_prefix("test/")?;
        let rest = match rest.strip_suffix("_test.dart") {
            Some(stem) => format!("{stem}.dart"),
            None => rest.to_string(),
        };

        let preferred = format!("lib/src/{rest}");
        if self.exists(&preferred) {
            Some(preferred)
        } else {
            Some(format!("lib/{rest}"))
        }
    }

    /// `lib/src/auth/login.dart` → `test/auth/login_test.dart`.
    pub fn infer_test_path(&self, source_path: &str) -> Option<String> {
        let normalized = self.relativize(source_path);
        if normalized == "lib" || normalized == "lib/src" {
            return Some("test".to_string());
        }
        let rest = normalized
            .strip_prefix("lib/src/")
            .or_else(|| normalized.strip_prefix("lib/"))?;

        let rest = match rest.strip_suffix(".dart") {
            Some(stem) if !stem.ends_with("_test") => format!("{stem}_test.dart"),
            _ => rest.to_string(),
        };
        Some(format!("test/{rest}"))
    }

    /// Categorize `input`, infer the missing side unless overridden, and
    /// check that both sides exist.
    pub fn resolve_paths(
        &self,
        input: &str,
        explicit_test: Option<&str>,
        explicit_source: Option<&str>,
    ) -> Result<ResolvedPaths> {
        let normalized = self.relativize(input);
        let side = PathSide::of(&normalized);

        let (test_path, source_path, input_side) = match side {
            Some(PathSide::Test) => {
                let source = match explicit_source {
                    Some(explicit) => Some(self.relativize(explicit)),
                    None => self.infer_source_path(&normalized),
                };
                let test = explicit_test
                    .map(|p| self.relativize(p))
                    .unwrap_or_else(|| normalized.clone());
                (Some(test), source, PathSide::Test)
            }
            Some(PathSide::Source) => {
                let test = match explicit_test {
                    Some(explicit) => Some(self.relativize(explicit)),
                    None => self.infer_test_path(&normalized),
                };
                let source = explicit_source
                    .map(|p| self.relativize(p))
                    .unwrap_or_else(|| normalized.clone());
                (test, Some(source), PathSide::Source)
            }
            None => match (explicit_test, explicit_source) {
                (Some(test), Some(source)) => (
                    Some(self.relativize(test)),
                    Some(self.relativize(source)),
                    PathSide::Test,
                ),
                _ => {
                    return Err(AnalyzerError::path_resolution(
                        input,
                        "path is neither under test/ nor lib/; pass --test-path and --source-path",
                    ))
                }
            },
        };

        let test_path = test_path.ok_or_else(|| {
            AnalyzerError::path_resolution(input, "could not infer the test path")
        })?;
        let source_path = source_path.ok_or_else(|| {
            AnalyzerError::path_resolution(input, "could not infer the source path")
        })?;

        for (label, path) in [("test", &test_path), ("source", &source_path)] {
            if !self.exists(path) {
                return Err(AnalyzerError::path_resolution(
                    input,
                    format!("{label} path '{path}' does not exist"),
                ));
            }
        }

        tracing::debug!(test = %test_path, source = %source_path, "resolved paths");

        Ok(ResolvedPaths {
            test_path,
            source_path,
            input_side,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project(dirs: &[&str], files: &[&str]) -> TempDir {
        let root = TempDir::new().unwrap();
        for dir in dirs {
            fs::create_dir_all(root.path().join(dir)).unwrap();
        }
        for file in files {
            let path = root.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "// dart").unwrap();
        }
        root
    }

    #[test]
    fn test_lib_src_wins_when_present() {
        let root = project(&["test/auth", "lib/src/auth"], &[]);
        let resolver = PathResolver::new(root.path());

        let resolved = resolver.resolve_paths("test/auth/", None, None).unwrap();
        assert_eq!(resolved.source_path, "lib/src/auth");
        assert_eq!(resolved.test_path, "test/auth");
        assert_eq!(resolved.input_side, PathSide::Test);
    }

    #[test]
    fn test_falls_back_to_lib_when_src_missing() {
        let root = project(&["test/auth", "lib/auth"], &[]);
        let resolver = PathResolver::new(root.path());

        let resolved = resolver.resolve_paths("test/auth", None, None).unwrap();
        assert_eq!(resolved.source_path, "lib/auth");
    }

    #[test]
    fn test_file_inputs_swap_test_suffix() {
        let root = project(&[], &["test/auth/login_test.dart", "lib/auth/login.dart"]);
        let resolver = PathResolver::new(root.path());

        assert_eq!(
            resolver.infer_source_path("test/auth/login_test.dart"),
            Some("lib/auth/login.dart".to_string())
        );
        assert_eq!(
            resolver.infer_test_path("lib/src/auth/login.dart"),
            Some("test/auth/login_test.dart".to_string())
        );

        let resolved = resolver
            .resolve_paths("lib\\auth\\login.dart", None, None)
            .unwrap();
        assert_eq!(resolved.test_path, "test/auth/login_test.dart");
        assert_eq!(resolved.primary(), "lib/auth/login.dart");
    }

    #[test]
    fn test_roots_map_to_each_other() {
        let resolver = PathResolver::new(".");
        assert_eq!(resolver.infer_source_path("test/"), Some("lib".to_string()));
        assert_eq!(resolver.infer_test_path("lib/"), Some("test".to_string()));
    }

    #[test]
    fn test_missing_counterpart_is_a_resolution_error() {
        let root = project(&["test/payments"], &[]);
        let resolver = PathResolver::new(root.path());

        let err = resolver.resolve_paths("test/payments", None, None).unwrap_err();
        assert!(matches!(err, AnalyzerError::PathResolution { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_unrecognized_side_needs_both_overrides() {
        let root = project(&["integration", "lib/core"], &[]);
        let resolver = PathResolver::new(root.path());

        assert!(resolver.resolve_paths("integration", None, None).is_err());
        let resolved = resolver
            .resolve_paths("integration", Some("integration"), Some("lib/core"))
            .unwrap();
        assert_eq!(resolved.source_path, "lib/core");
    }

    #[test]
    fn test_explicit_override_skips_inference() {
        let root = project(&["test/auth", "lib/features/auth"], &[]);
        let resolver = PathResolver::new(root.path());

        let resolved = resolver
            .resolve_paths("test/auth", None, Some("lib/features/auth/"))
            .unwrap();
        assert_eq!(resolved.source_path, "lib/features/auth");
    }
}

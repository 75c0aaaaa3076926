//! `dart test --reporter json` event stream.
//!
//! One JSON object per line. Only the events needed to rebuild per-test
//! results are modelled; everything else lands in [`ReporterEvent::Other`].
//! Lines that are not JSON (compiler chatter, `print` output leaking from
//! isolates) are skipped with a warning.

use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ReporterEvent {
    Suite {
        suite: SuiteInfo,
    },
    TestStart {
        test: TestInfo,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        #[serde(rename = "testID")]
        test_id: u64,
        error: String,
        #[serde(default)]
        stack_trace: String,
        #[serde(default)]
        is_failure: bool,
    },
    #[serde(rename_all = "camelCase")]
    TestDone {
        #[serde(rename = "testID")]
        test_id: u64,
        result: String,
        #[serde(default)]
        skipped: bool,
        #[serde(default)]
        hidden: bool,
        time: u64,
    },
    Done {
        success: Option<bool>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SuiteInfo {
    pub id: u64,
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestInfo {
    pub id: u64,
    pub name: String,
    #[serde(rename = "suiteID")]
    pub suite_id: u64,
    /// Reporter time (ms since the run started) when the test began
    #[serde(skip)]
    pub started_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TestError {
    pub message: String,
    pub stack_trace: String,
    /// `false` for uncaught exceptions, `true` for failed expectations
    pub is_failure: bool,
}

/// One test's result within a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    /// Stable across runs: `<suite path>::<test name>`
    pub key: String,
    pub name: String,
    pub suite: Option<String>,
    pub outcome: TestOutcome,
    pub duration_ms: u64,
    pub errors: Vec<TestError>,
}

/// Everything recovered from one reporter transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRun {
    pub results: Vec<TestResult>,
    /// `done.success`, absent when the stream was cut short
    pub success: Option<bool>,
    pub warnings: Vec<String>,
}

/// Timestamps live on the envelope, not on the variants that need them.
#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    time: u64,
}

#[derive(Default)]
struct StreamState {
    suites: HashMap<u64, String>,
    running: HashMap<u64, TestInfo>,
    errors: HashMap<u64, Vec<TestError>>,
    run: ParsedRun,
}

impl StreamState {
    fn apply(&mut self, event: ReporterEvent, time: u64) {
        match event {
            ReporterEvent::Suite { suite } => {
                if let Some(path) = suite.path {
                    self.suites.insert(suite.id, crate::paths::normalize_path(&path));
                }
            }
            ReporterEvent::TestStart { mut test } => {
                test.started_at = time;
                self.running.insert(test.id, test);
            }
            ReporterEvent::Error {
                test_id,
                error,
                stack_trace,
                is_failure,
            } => self.errors.entry(test_id).or_default().push(TestError {
                message: error,
                stack_trace,
                is_failure,
            }),
            ReporterEvent::TestDone {
                test_id,
                result,
                skipped,
                hidden,
                time,
            } => self.finish(test_id, &result, skipped, hidden, time),
            ReporterEvent::Done { success } => self.run.success = success,
            ReporterEvent::Other => {}
        }
    }

    fn finish(&mut self, test_id: u64, result: &str, skipped: bool, hidden: bool, time: u64) {
        let errors = self.errors.remove(&test_id).unwrap_or_default();
        let Some(test) = self.running.remove(&test_id) else {
            self.run
                .warnings
                .push(format!("testDone for unknown test id {test_id}"));
            return;
        };
        // Synthetic "loading" tests; their errors are load failures of the suite
        if hidden && errors.is_empty() {
            return;
        }

        let outcome = if skipped {
            TestOutcome::Skipped
        } else if result == "success" && errors.is_empty() {
            TestOutcome::Passed
        } else {
            TestOutcome::Failed
        };
        let suite = self.suites.get(&test.suite_id).cloned();
        let key = match &suite {
            Some(path) => format!("{path}::{}", test.name),
            None => test.name.clone(),
        };
        self.run.results.push(TestResult {
            key,
            name: test.name,
            suite,
            outcome,
            duration_ms: time.saturating_sub(test.started_at),
            errors,
        });
    }
}

/// Parse a complete reporter transcript.
pub fn parse_events(output: &str) -> ParsedRun {
    let mut state = StreamState::default();

    for (index, raw) in output.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let parsed = serde_json::from_str::<ReporterEvent>(line).and_then(|event| {
            serde_json::from_str::<Envelope>(line).map(|envelope| (event, envelope.time))
        });
        match parsed {
            Ok((event, time)) => state.apply(event, time),
            Err(e) => {
                tracing::debug!(line = index + 1, "skipping reporter line: {}", e);
                state
                    .run
                    .warnings
                    .push(format!("line {}: not a reporter event ({e})", index + 1));
            }
        }
    }

    for (_, test) in state.running.drain() {
        state
            .run
            .warnings
            .push(format!("test '{}' started but never finished", test.name));
    }
    state.run
}

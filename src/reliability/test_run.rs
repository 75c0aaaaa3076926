//! Per-test results aggregated across repeated runs.

use super::events::{TestError, TestOutcome, TestResult};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub passed: bool,
    pub duration_ms: u64,
}

/// One test across every run. Skipped executions are not recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestRun {
    pub test_id: String,
    pub name: String,
    pub suite: Option<String>,
    pub results: Vec<RunResult>,
    /// Errors from every failing execution, in run order
    pub errors: Vec<TestError>,
}

impl TestRun {
    pub fn new(test_id: impl Into<String>, name: impl Into<String>, suite: Option<String>) -> Self {
        Self {
            test_id: test_id.into(),
            name: name.into(),
            suite,
            results: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn record(&mut self, passed: bool, duration_ms: u64) {
        self.results.push(RunResult {
            passed,
            duration_ms,
        });
    }

    pub fn passes(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn failures(&self) -> usize {
        self.results.len() - self.passes()
    }

    /// `passes / total`, 0 when the test never ran.
    pub fn pass_rate(&self) -> f64 {
        if self.results.is_empty() {
            0.0
        } else {
            self.passes() as f64 / self.results.len() as f64
        }
    }

    /// Neither always passing nor always failing.
    pub fn is_flaky(&self) -> bool {
        let rate = self.pass_rate();
        rate > 0.0 && rate < 1.0
    }

    pub fn is_consistently_failing(&self) -> bool {
        !self.results.is_empty() && self.passes() == 0
    }

    pub fn average_duration_ms(&self) -> f64 {
        if self.results.is_empty() {
            0.0
        } else {
            self.results.iter().map(|r| r.duration_ms as f64).sum::<f64>()
                / self.results.len() as f64
        }
    }

    pub fn is_slow(&self, threshold_secs: f64) -> bool {
        self.average_duration_ms() > threshold_secs * 1000.0
    }
}

/// Accumulates parsed runs into [`TestRun`]s keyed by stable test id.
#[derive(Debug, Clone, Default)]
pub struct RunAggregator {
    tests: BTreeMap<String, TestRun>,
    skipped: BTreeMap<String, usize>,
    runs: usize,
}

impl RunAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_run(&mut self, results: Vec<TestResult>) {
        self.runs += 1;
        for result in results {
            if result.outcome == TestOutcome::Skipped {
                *self.skipped.entry(result.key).or_default() += 1;
                continue;
            }
            let run = self
                .tests
                .entry(result.key.clone())
                .or_insert_with(|| TestRun::new(&result.key, &result.name, result.suite.clone()));
            let passed = result.outcome == TestOutcome::Passed;
            run.record(passed, result.duration_ms);
            if !passed {
                run.errors.extend(result.errors);
            }
        }
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn skipped_tests(&self) -> usize {
        self.skipped.len()
    }

    pub fn into_tests(self) -> Vec<TestRun> {
        self.tests.into_values().collect()
    }
}

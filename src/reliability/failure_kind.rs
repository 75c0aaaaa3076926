//! Heuristic failure categories.
//!
//! Patterns are checked in declaration order against the error message
//! followed by the stack trace; the first match wins. Assertion failures
//! are checked before timeouts, so an `expect` that fails inside a timed
//! out future is still reported as an assertion.

use super::events::TestError;
use crate::reports::markdown::summarize;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Assertion,
    NullError,
    Timeout,
    Io,
    TypeMismatch,
    StateError,
    RangeError,
    FormatError,
    WidgetNotFound,
    Compilation,
    Unknown,
}

static PATTERNS: Lazy<Vec<(FailureKind, Regex)>> = Lazy::new(|| {
    [
        (
            FailureKind::Assertion,
            r"(?m)^\s*Expected:|TestFailure|Failed assertion|AssertionError",
        ),
        (
            FailureKind::NullError,
            r"Null check operator used on a null value|NoSuchMethodError.*null|Null(?:Pointer)?Error|was called on null",
        ),
        (
            FailureKind::Timeout,
            r"TimeoutException|Test timed out|timed out after",
        ),
        (
            FailureKind::Io,
            r"FileSystemException|SocketException|HttpException|OS Error|No such file or directory",
        ),
        (
            FailureKind::TypeMismatch,
            r"is not a subtype of|type '.+' is not|TypeError|CastError",
        ),
        (FailureKind::StateError, r"Bad state:|StateError"),
        (FailureKind::RangeError, r"RangeError|Index out of range|not in inclusive range"),
        (FailureKind::FormatError, r"FormatException|Invalid radix|Unexpected character"),
        (
            FailureKind::WidgetNotFound,
            r#"Found 0 widgets|No element|zero widgets with"#,
        ),
        (
            FailureKind::Compilation,
            r"Compilation failed|Error: .+ isn't defined|Failed to load .+:.*Error",
        ),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(pattern).unwrap()))
    .collect()
});

impl FailureKind {
    pub fn classify(message: &str, stack_trace: &str) -> Self {
        [message, stack_trace]
            .into_iter()
            .find_map(|text| {
                PATTERNS
                    .iter()
                    .find(|(_, regex)| regex.is_match(text))
                    .map(|(kind, _)| *kind)
            })
            .unwrap_or(FailureKind::Unknown)
    }

    pub fn label(self) -> &'static str {
        match self {
            FailureKind::Assertion => "assertion failure",
            FailureKind::NullError => "null error",
            FailureKind::Timeout => "timeout",
            FailureKind::Io => "I/O error",
            FailureKind::TypeMismatch => "type mismatch",
            FailureKind::StateError => "state error",
            FailureKind::RangeError => "range error",
            FailureKind::FormatError => "format error",
            FailureKind::WidgetNotFound => "widget not found",
            FailureKind::Compilation => "compilation error",
            FailureKind::Unknown => "unknown",
        }
    }

    pub fn suggestion(self) -> &'static str {
        match self {
            FailureKind::Assertion => {
                "Compare the expected and actual values; update the expectation or fix the logic under test"
            }
            FailureKind::NullError => {
                "Check initialization order and mock setup; a value used with `!` is null"
            }
            FailureKind::Timeout => {
                "Await every future, stub slow dependencies, or raise the test timeout"
            }
            FailureKind::Io => "Replace real file or network access with fakes or temporary fixtures",
            FailureKind::TypeMismatch => {
                "Check generic types and mock return values; a value has the wrong runtime type"
            }
            FailureKind::StateError => {
                "An object was used in the wrong state; check setUp/tearDown and stream lifecycles"
            }
            FailureKind::RangeError => "Check collection lengths and index arithmetic",
            FailureKind::FormatError => "Validate the parsed input; the test data is malformed",
            FailureKind::WidgetNotFound => {
                "Pump the widget tree (`pumpAndSettle`) and verify the finder's key or text"
            }
            FailureKind::Compilation => "Fix the compile errors reported for the test file first",
            FailureKind::Unknown => "Inspect the stack trace to locate the failing call",
        }
    }
}

/// Longest message kept in checklists and tables
const MESSAGE_CHARS: usize = 160;

/// A failing execution with its category and suggested fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedFailure {
    pub test_id: String,
    pub name: String,
    pub suite: Option<String>,
    pub kind: FailureKind,
    pub message: String,
    pub stack_trace: String,
    pub suggestion: String,
}

impl ClassifiedFailure {
    pub fn new(test_id: &str, name: &str, suite: Option<&str>, error: &TestError) -> Self {
        let kind = FailureKind::classify(&error.message, &error.stack_trace);
        Self {
            test_id: test_id.to_string(),
            name: name.to_string(),
            suite: suite.map(str::to_string),
            kind,
            message: error.message.trim_end().to_string(),
            stack_trace: error.stack_trace.trim_end().to_string(),
            suggestion: kind.suggestion().to_string(),
        }
    }

    /// First line of the message, shortened for tables.
    pub fn headline(&self) -> String {
        summarize(&self.message, MESSAGE_CHARS)
    }

    pub fn checklist_item(&self) -> String {
        let location = self.suite.as_deref().unwrap_or("unknown suite");
        format!(
            "- [ ] **{}** (`{}`): {}. {}",
            self.name,
            location,
            self.kind.label(),
            self.suggestion
        )
    }
}

//! Whole-suite health: both analyzers, one combined report.

pub mod health;
pub mod orchestrator;
pub mod report;

pub use health::{assess, health_score, HealthAssessment, HealthMetrics, HealthStatus};
pub use orchestrator::{SuiteOptions, SuiteOrchestrator, TOOL_NAME};
pub use report::{StepResult, SuiteReport};

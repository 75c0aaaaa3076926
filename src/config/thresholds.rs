use crate::errors::{AnalyzerError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MINIMUM_COVERAGE: f64 = 80.0;
pub const DEFAULT_WARNING_COVERAGE: f64 = 90.0;

/// Coverage gates applied to one analyzer run.
///
/// Invariant: `0 <= minimum <= warning <= 100`, enforced by [`CoverageThresholds::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageThresholds {
    minimum: f64,
    warning: f64,
    fail_on_decrease: bool,
}

impl Default for CoverageThresholds {
    fn default() -> Self {
        Self {
            minimum: DEFAULT_MINIMUM_COVERAGE,
            warning: DEFAULT_WARNING_COVERAGE,
            fail_on_decrease: false,
        }
    }
}

/// Where a coverage figure lands relative to the thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ThresholdStatus {
    /// At or above the warning level
    Passed,
    /// Between minimum and warning
    Warning,
    /// Below the minimum
    BelowMinimum,
    /// Above minimum but lower than the baseline with `fail_on_decrease`
    Decreased { baseline: f64 },
}

impl ThresholdStatus {
    pub fn is_violation(self) -> bool {
        matches!(
            self,
            ThresholdStatus::BelowMinimum | ThresholdStatus::Decreased { .. }
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            ThresholdStatus::Passed => "passed",
            ThresholdStatus::Warning => "warning",
            ThresholdStatus::BelowMinimum => "below minimum",
            ThresholdStatus::Decreased { .. } => "decreased",
        }
    }
}

impl CoverageThresholds {
    pub fn new(minimum: f64, warning: f64, fail_on_decrease: bool) -> Result<Self> {
        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        if !in_range(minimum) || !in_range(warning) {
            return Err(AnalyzerError::InvalidArgument(format!(
                "coverage thresholds must be between 0 and 100 (minimum {minimum}, warning {warning})"
            )));
        }
        if minimum > warning {
            return Err(AnalyzerError::InvalidArgument(format!(
                "minimum coverage {minimum} exceeds warning level {warning}"
            )));
        }
        Ok(Self {
            minimum,
            warning,
            fail_on_decrease,
        })
    }

    pub fn minimum(&self) -> f64 {
        self.minimum
    }

    pub fn warning(&self) -> f64 {
        self.warning
    }

    pub fn fail_on_decrease(&self) -> bool {
        self.fail_on_decrease
    }

    /// `false` below the minimum, or below the baseline when `fail_on_decrease` is set.
    pub fn validate(&self, current: f64, baseline: Option<f64>) -> bool {
        !self.evaluate(current, baseline).is_violation()
    }

    pub fn evaluate(&self, current: f64, baseline: Option<f64>) -> ThresholdStatus {
        if current < self.minimum {
            return ThresholdStatus::BelowMinimum;
        }
        if let Some(baseline) = baseline.filter(|_| self.fail_on_decrease) {
            if current < baseline {
                return ThresholdStatus::Decreased { baseline };
            }
        }
        if current < self.warning {
            ThresholdStatus::Warning
        } else {
            ThresholdStatus::Passed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_defaults() {
        let thresholds = CoverageThresholds::default();
        assert_eq!(thresholds.minimum(), 80.0);
        assert_eq!(thresholds.warning(), 90.0);
        assert!(!thresholds.fail_on_decrease());
    }

    #[test]
    fn test_rejects_inverted_or_out_of_range() {
        assert!(CoverageThresholds::new(95.0, 90.0, false).is_err());
        assert!(CoverageThresholds::new(-1.0, 90.0, false).is_err());
        assert!(CoverageThresholds::new(80.0, 100.5, false).is_err());
        assert!(CoverageThresholds::new(0.0, 100.0, true).is_ok());
    }

    #[test]
    fn test_evaluate_levels() {
        let thresholds = CoverageThresholds::new(80.0, 90.0, false).unwrap();
        assert_eq!(thresholds.evaluate(75.0, None), ThresholdStatus::BelowMinimum);
        assert_eq!(thresholds.evaluate(85.0, None), ThresholdStatus::Warning);
        assert_eq!(thresholds.evaluate(90.0, None), ThresholdStatus::Passed);
        // decrease ignored without the flag
        assert_eq!(thresholds.evaluate(85.0, Some(88.0)), ThresholdStatus::Warning);
    }

    #[test]
    fn test_decrease_fails_only_with_flag() {
        let thresholds = CoverageThresholds::new(80.0, 90.0, true).unwrap();
        assert_eq!(
            thresholds.evaluate(92.0, Some(93.5)),
            ThresholdStatus::Decreased { baseline: 93.5 }
        );
        assert!(thresholds.validate(93.5, Some(93.5)));
        assert!(thresholds.validate(92.0, None));
    }

    proptest! {
        #[test]
        fn prop_below_minimum_always_fails(
            minimum in 0.0f64..=100.0,
            below in 0.0f64..1.0,
            baseline in proptest::option::of(0.0f64..=100.0),
            fail_on_decrease in any::<bool>(),
        ) {
            let thresholds = CoverageThresholds::new(minimum, 100.0, fail_on_decrease).unwrap();
            let current = minimum * below;
            prop_assume!(current < minimum);
            prop_assert!(!thresholds.validate(current, baseline));
        }

        #[test]
        fn prop_decrease_fails_even_above_minimum(
            current in 50.0f64..100.0,
            gap in 0.01f64..10.0,
        ) {
            let thresholds = CoverageThresholds::new(50.0, 90.0, true).unwrap();
            prop_assert!(!thresholds.validate(current, Some(current + gap)));
        }
    }
}

//! Health score for a module from whichever metrics are available.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl HealthStatus {
    pub fn label(self) -> &'static str {
        match self {
            HealthStatus::Excellent => "excellent",
            HealthStatus::Good => "good",
            HealthStatus::Fair => "fair",
            HealthStatus::Poor => "poor",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            HealthStatus::Excellent => "🟢",
            HealthStatus::Good => "🔵",
            HealthStatus::Fair => "🟡",
            HealthStatus::Poor => "🔴",
        }
    }
}

/// Lower bounds for excellent, good and fair, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tiers {
    pub excellent: f64,
    pub good: f64,
    pub fair: f64,
}

pub const OVERALL_TIERS: Tiers = Tiers {
    excellent: 90.0,
    good: 75.0,
    fair: 60.0,
};
pub const COVERAGE_TIERS: Tiers = Tiers {
    excellent: 80.0,
    good: 60.0,
    fair: 40.0,
};
pub const PASS_RATE_TIERS: Tiers = Tiers {
    excellent: 95.0,
    good: 85.0,
    fair: 70.0,
};
pub const STABILITY_TIERS: Tiers = PASS_RATE_TIERS;

impl Tiers {
    pub fn classify(&self, value: f64) -> HealthStatus {
        if value >= self.excellent {
            HealthStatus::Excellent
        } else if value >= self.good {
            HealthStatus::Good
        } else if value >= self.fair {
            HealthStatus::Fair
        } else {
            HealthStatus::Poor
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricHealth {
    pub value: f64,
    pub status: HealthStatus,
}

/// Inputs, each in percent; `None` when the producing step failed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HealthMetrics {
    pub coverage_percent: Option<f64>,
    pub pass_rate: Option<f64>,
    pub stability_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthAssessment {
    pub score: f64,
    pub status: HealthStatus,
    pub metrics_available: usize,
    pub coverage: Option<MetricHealth>,
    pub pass_rate: Option<MetricHealth>,
    pub stability: Option<MetricHealth>,
}

/// Mean of the available metrics, 0 when there are none.
pub fn health_score(metrics: &HealthMetrics) -> f64 {
    let values: Vec<f64> = [
        metrics.coverage_percent,
        metrics.pass_rate,
        metrics.stability_percent,
    ]
    .into_iter()
    .flatten()
    .collect();
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

pub fn assess(metrics: &HealthMetrics) -> HealthAssessment {
    let score = health_score(metrics);
    let metric = |value: Option<f64>, tiers: Tiers| {
        value.map(|value| MetricHealth {
            value,
            status: tiers.classify(value),
        })
    };
    HealthAssessment {
        score,
        status: OVERALL_TIERS.classify(score),
        metrics_available: [
            metrics.coverage_percent,
            metrics.pass_rate,
            metrics.stability_percent,
        ]
        .iter()
        .flatten()
        .count(),
        coverage: metric(metrics.coverage_percent, COVERAGE_TIERS),
        pass_rate: metric(metrics.pass_rate, PASS_RATE_TIERS),
        stability: metric(metrics.stability_percent, STABILITY_TIERS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_missing_metrics_are_ignored() {
        let metrics = HealthMetrics {
            coverage_percent: Some(70.0),
            pass_rate: None,
            stability_percent: Some(90.0),
        };
        assert_eq!(health_score(&metrics), 80.0);
        assert_eq!(health_score(&HealthMetrics::default()), 0.0);
    }

    #[test]
    fn test_metric_specific_tiers() {
        let assessment = assess(&HealthMetrics {
            coverage_percent: Some(80.0),
            pass_rate: Some(90.0),
            stability_percent: Some(69.9),
        });
        assert_eq!(assessment.coverage.unwrap().status, HealthStatus::Excellent);
        assert_eq!(assessment.pass_rate.unwrap().status, HealthStatus::Good);
        assert_eq!(assessment.stability.unwrap().status, HealthStatus::Poor);
        // (80 + 90 + 69.9) / 3 = 79.97
        assert_eq!(assessment.status, HealthStatus::Good);
        assert_eq!(assessment.metrics_available, 3);
    }

    #[test]
    fn test_overall_tier_boundaries() {
        assert_eq!(OVERALL_TIERS.classify(90.0), HealthStatus::Excellent);
        assert_eq!(OVERALL_TIERS.classify(75.0), HealthStatus::Good);
        assert_eq!(OVERALL_TIERS.classify(60.0), HealthStatus::Fair);
        assert_eq!(OVERALL_TIERS.classify(59.99), HealthStatus::Poor);
    }

    proptest! {
        #[test]
        fn prop_score_within_metric_bounds(
            coverage in proptest::option::of(0.0f64..=100.0),
            pass_rate in proptest::option::of(0.0f64..=100.0),
            stability in proptest::option::of(0.0f64..=100.0),
        ) {
            let metrics = HealthMetrics { coverage_percent: coverage, pass_rate, stability_percent: stability };
            let score = health_score(&metrics);
            let present: Vec<f64> = [coverage, pass_rate, stability].into_iter().flatten().collect();
            if present.is_empty() {
                prop_assert_eq!(score, 0.0);
            } else {
                let min = present.iter().cloned().fold(f64::INFINITY, f64::min);
                let max = present.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                prop_assert!(score >= min - 1e-9 && score <= max + 1e-9);
            }
        }
    }
}

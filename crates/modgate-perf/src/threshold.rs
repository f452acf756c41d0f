//! Performance thresholds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Metric a threshold applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    CpuPercent,
    MemoryPercent,
    ResponseTimeMs,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::CpuPercent, Metric::MemoryPercent, Metric::ResponseTimeMs];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::CpuPercent => "CPU usage",
            Metric::MemoryPercent => "Memory usage",
            Metric::ResponseTimeMs => "Response time",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::CpuPercent | Metric::MemoryPercent => "%",
            Metric::ResponseTimeMs => "ms",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::CpuPercent => write!(f, "cpu_percent"),
            Metric::MemoryPercent => write!(f, "memory_percent"),
            Metric::ResponseTimeMs => write!(f, "response_time_ms"),
        }
    }
}

/// Where a value falls against a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdOutcome {
    Pass,
    Warning,
    Fail,
}

/// Upper bounds for one metric: above `warning_value` warns, above
/// `max_value` fails.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceThreshold {
    pub metric: Metric,
    pub max_value: f64,
    pub warning_value: f64,
}

impl PerformanceThreshold {
    pub fn new(metric: Metric, max_value: f64, warning_value: f64) -> Self {
        Self {
            metric,
            max_value,
            warning_value,
        }
    }

    pub fn outcome(&self, value: f64) -> ThresholdOutcome {
        if value > self.max_value {
            ThresholdOutcome::Fail
        } else if value > self.warning_value {
            ThresholdOutcome::Warning
        } else {
            ThresholdOutcome::Pass
        }
    }

    /// Evaluate `value`, appending at most one message to `issues` or `warnings`.
    pub fn evaluate(&self, value: f64, issues: &mut Vec<String>, warnings: &mut Vec<String>) -> ThresholdEvaluation {
        let unit = self.metric.unit();
        let outcome = self.outcome(value);
        match outcome {
            ThresholdOutcome::Fail => issues.push(format!(
                "{} {:.1}{} exceeds maximum {:.1}{}",
                self.metric.label(),
                value,
                unit,
                self.max_value,
                unit
            )),
            ThresholdOutcome::Warning => warnings.push(format!(
                "{} {:.1}{} above warning level {:.1}{}",
                self.metric.label(),
                value,
                unit,
                self.warning_value,
                unit
            )),
            ThresholdOutcome::Pass => {}
        }

        ThresholdEvaluation {
            metric: self.metric,
            value,
            max_value: self.max_value,
            warning_value: self.warning_value,
            outcome,
        }
    }
}

/// Recorded result of one threshold check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEvaluation {
    pub metric: Metric,
    pub value: f64,
    pub max_value: f64,
    pub warning_value: f64,
    pub outcome: ThresholdOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(value: f64) -> (ThresholdOutcome, Vec<String>, Vec<String>) {
        let threshold = PerformanceThreshold::new(Metric::CpuPercent, 70.0, 50.0);
        let (mut issues, mut warnings) = (Vec::new(), Vec::new());
        let eval = threshold.evaluate(value, &mut issues, &mut warnings);
        (eval.outcome, issues, warnings)
    }

    #[test]
    fn above_max_is_one_issue_naming_both_values() {
        let (outcome, issues, warnings) = check(82.5);
        assert_eq!(outcome, ThresholdOutcome::Fail);
        assert_eq!(issues, vec!["CPU usage 82.5% exceeds maximum 70.0%".to_string()]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn between_warning_and_max_is_one_warning() {
        for value in [50.1, 70.0] {
            let (outcome, issues, warnings) = check(value);
            assert_eq!(outcome, ThresholdOutcome::Warning);
            assert!(issues.is_empty());
            assert_eq!(warnings.len(), 1);
        }
    }

    #[test]
    fn at_or_below_warning_appends_nothing() {
        for value in [0.0, 49.9, 50.0] {
            let (outcome, issues, warnings) = check(value);
            assert_eq!(outcome, ThresholdOutcome::Pass);
            assert!(issues.is_empty() && warnings.is_empty());
        }
    }
}

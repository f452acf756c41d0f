//! The fixed four-test load suite.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::load::LoadProfile;
use crate::threshold::{Metric, PerformanceThreshold};

/// Kind of load test. Declaration order is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTestKind {
    Baseline,
    Load,
    Stress,
    Spike,
}

impl PerformanceTestKind {
    pub const ORDER: [PerformanceTestKind; 4] = [
        PerformanceTestKind::Baseline,
        PerformanceTestKind::Load,
        PerformanceTestKind::Stress,
        PerformanceTestKind::Spike,
    ];

    /// Load shape before the max-users cap is applied.
    pub fn profile(&self, request_rate: f64) -> LoadProfile {
        let (initial_users, target_users, ramp_up_s, hold_s, ramp_down_s) = match self {
            PerformanceTestKind::Baseline => (1, 1, 5, 30, 5),
            PerformanceTestKind::Load => (1, 10, 10, 60, 10),
            PerformanceTestKind::Stress => (10, 50, 20, 60, 20),
            PerformanceTestKind::Spike => (1, 100, 2, 30, 5),
        };
        LoadProfile {
            initial_users,
            target_users,
            ramp_up_ms: ramp_up_s * 1000,
            hold_ms: hold_s * 1000,
            ramp_down_ms: ramp_down_s * 1000,
            request_rate,
        }
    }

    /// CPU, memory and response-time limits as `(max, warning)` pairs.
    pub fn thresholds(&self) -> Vec<PerformanceThreshold> {
        let [(cpu_max, cpu_warn), (mem_max, mem_warn), (resp_max, resp_warn)] = match self {
            PerformanceTestKind::Baseline => [(50.0, 30.0), (60.0, 40.0), (500.0, 200.0)],
            PerformanceTestKind::Load => [(70.0, 50.0), (70.0, 50.0), (1000.0, 500.0)],
            PerformanceTestKind::Stress => [(90.0, 75.0), (85.0, 70.0), (3000.0, 1500.0)],
            PerformanceTestKind::Spike => [(85.0, 70.0), (80.0, 65.0), (2000.0, 1000.0)],
        };
        vec![
            PerformanceThreshold::new(Metric::CpuPercent, cpu_max, cpu_warn),
            PerformanceThreshold::new(Metric::MemoryPercent, mem_max, mem_warn),
            PerformanceThreshold::new(Metric::ResponseTimeMs, resp_max, resp_warn),
        ]
    }
}

impl fmt::Display for PerformanceTestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerformanceTestKind::Baseline => write!(f, "baseline"),
            PerformanceTestKind::Load => write!(f, "load"),
            PerformanceTestKind::Stress => write!(f, "stress"),
            PerformanceTestKind::Spike => write!(f, "spike"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_targets_grow_through_the_suite() {
        let targets: Vec<u32> = PerformanceTestKind::ORDER
            .iter()
            .map(|k| k.profile(1.0).target_users)
            .collect();
        assert_eq!(targets, vec![1, 10, 50, 100]);
    }

    #[test]
    fn stress_relaxes_max_thresholds() {
        let max_of = |kind: PerformanceTestKind, metric: Metric| {
            kind.thresholds()
                .into_iter()
                .find(|t| t.metric == metric)
                .unwrap()
                .max_value
        };
        for metric in Metric::ALL {
            assert!(max_of(PerformanceTestKind::Stress, metric) > max_of(PerformanceTestKind::Load, metric));
            assert!(max_of(PerformanceTestKind::Load, metric) > max_of(PerformanceTestKind::Baseline, metric));
        }
    }

    #[test]
    fn spike_ramps_fastest() {
        let spike = PerformanceTestKind::Spike.profile(1.0);
        for kind in [PerformanceTestKind::Load, PerformanceTestKind::Stress] {
            assert!(spike.ramp_up_ms < kind.profile(1.0).ramp_up_ms);
        }
    }
}

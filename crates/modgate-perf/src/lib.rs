//! # modgate-perf
//!
//! Load and performance testing for gateway modules.
//!
//! The suite is fixed: baseline (1 user), load (10), stress (50) and spike
//! (fast ramp to 100), always run one at a time in that order so that no
//! two tests compete for the host. Each test walks its [`LoadProfile`]
//! through a pluggable [`LoadDriver`] while a [`modgate_monitor::SystemMonitor`]
//! samples the host, then checks the summary against per-test thresholds.

pub mod case;
pub mod config;
pub mod error;
pub mod load;
pub mod report;
pub mod suite;
pub mod target;
pub mod tester;
pub mod threshold;

pub use case::{LoadStats, PerformanceStatus, PerformanceSummary, PerformanceTest};
pub use config::PerformanceConfig;
pub use error::{PerfError, PerfResult};
pub use load::{LoadDriver, LoadPhase, LoadProfile, LoadRequest, LoadStep, SyntheticLoadDriver};
pub use report::{BaselineComparison, PerformanceReport, PerformanceVerdict, SCALABILITY_CPU_DELTA};
pub use suite::PerformanceTestKind;
pub use target::{HttpTargetProbe, TargetProbe};
pub use tester::{walk_profile, ModulePerformanceTester};
pub use threshold::{Metric, PerformanceThreshold, ThresholdEvaluation, ThresholdOutcome};

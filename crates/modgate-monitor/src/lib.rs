//! # modgate-monitor
//!
//! Host resource sampling for load tests. A [`ResourceSampler`] returns
//! instantaneous CPU, memory and cumulative I/O counters; [`SystemMonitor`]
//! samples it periodically from one cancellable background task and turns
//! the readings into a history of deltas against a captured baseline.

pub mod error;
pub mod monitor;
pub mod sampler;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use error::{MonitorError, MonitorResult};
pub use monitor::{MetricsPoint, ResourceSummary, SystemMonitor};
pub use sampler::{ProcfsSampler, ResourceSampler, ResourceSnapshot};

//! Background resource sampler.
//!
//! [`SystemMonitor`] captures a baseline snapshot, then samples on a fixed
//! interval from a spawned task. Points are streamed over a channel; on
//! [`SystemMonitor::stop`] the task is aborted and the channel drained, so
//! the history is owned by exactly one side at a time.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::error::{MonitorError, MonitorResult};
use crate::sampler::{ResourceSampler, ResourceSnapshot};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One point of the metrics history. I/O figures are deltas against the
/// baseline captured when the monitor started.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsPoint {
    pub timestamp: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_mb: f64,
    pub disk_read_mb: f64,
    pub disk_write_mb: f64,
    pub net_sent_mb: f64,
    pub net_recv_mb: f64,
}

impl MetricsPoint {
    pub fn from_snapshots(current: &ResourceSnapshot, baseline: &ResourceSnapshot, elapsed: Duration) -> Self {
        let delta_mb = |now: u64, base: u64| now.saturating_sub(base) as f64 / BYTES_PER_MB;
        Self {
            timestamp: Utc::now(),
            elapsed_ms: elapsed.as_millis() as u64,
            cpu_percent: current.cpu_percent,
            memory_percent: current.memory_percent,
            memory_mb: current.memory_mb,
            disk_read_mb: delta_mb(current.disk_read_bytes, baseline.disk_read_bytes),
            disk_write_mb: delta_mb(current.disk_write_bytes, baseline.disk_write_bytes),
            net_sent_mb: delta_mb(current.net_sent_bytes, baseline.net_sent_bytes),
            net_recv_mb: delta_mb(current.net_recv_bytes, baseline.net_recv_bytes),
        }
    }
}

/// Mean and peak resource usage over a metrics history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub samples: usize,
    pub avg_cpu_percent: f64,
    pub peak_cpu_percent: f64,
    pub avg_memory_percent: f64,
    pub peak_memory_percent: f64,
    pub avg_memory_mb: f64,
    pub peak_memory_mb: f64,
    pub disk_read_mb: f64,
    pub disk_write_mb: f64,
    pub net_sent_mb: f64,
    pub net_recv_mb: f64,
}

impl ResourceSummary {
    pub fn from_points(points: &[MetricsPoint]) -> Self {
        if points.is_empty() {
            return Self::default();
        }

        let n = points.len() as f64;
        let mean = |f: fn(&MetricsPoint) -> f64| points.iter().map(f).sum::<f64>() / n;
        let peak = |f: fn(&MetricsPoint) -> f64| points.iter().map(f).fold(0.0, f64::max);

        Self {
            samples: points.len(),
            avg_cpu_percent: mean(|p| p.cpu_percent),
            peak_cpu_percent: peak(|p| p.cpu_percent),
            avg_memory_percent: mean(|p| p.memory_percent),
            peak_memory_percent: peak(|p| p.memory_percent),
            avg_memory_mb: mean(|p| p.memory_mb),
            peak_memory_mb: peak(|p| p.memory_mb),
            // Counters only grow, so the largest delta is the total for the run.
            disk_read_mb: peak(|p| p.disk_read_mb),
            disk_write_mb: peak(|p| p.disk_write_mb),
            net_sent_mb: peak(|p| p.net_sent_mb),
            net_recv_mb: peak(|p| p.net_recv_mb),
        }
    }
}

struct RunningSampler {
    handle: JoinHandle<()>,
    points: mpsc::UnboundedReceiver<MetricsPoint>,
}

/// Periodic resource sampler running as one background task.
pub struct SystemMonitor {
    sampler: Arc<dyn ResourceSampler>,
    interval: Duration,
    running: Option<RunningSampler>,
}

impl SystemMonitor {
    pub fn new(sampler: Arc<dyn ResourceSampler>, interval: Duration) -> Self {
        Self {
            sampler,
            interval: interval.max(Duration::from_millis(1)),
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Capture the baseline and spawn the sampling task.
    pub fn start(&mut self) -> MonitorResult<()> {
        if self.running.is_some() {
            return Err(MonitorError::AlreadyRunning);
        }

        let baseline = self.sampler.sample()?;
        let sampler = self.sampler.clone();
        let period = self.interval;
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                // Samplers read procfs synchronously.
                let reader = sampler.clone();
                match tokio::task::spawn_blocking(move || reader.sample()).await {
                    Ok(Ok(snapshot)) => {
                        let point = MetricsPoint::from_snapshots(&snapshot, &baseline, started.elapsed());
                        if tx.send(point).is_err() {
                            break;
                        }
                    }
                    Ok(Err(e)) => warn!(sampler = sampler.name(), error = %e, "Resource sample failed"),
                    Err(e) => warn!(sampler = sampler.name(), error = %e, "Resource sample task failed"),
                }
            }
        });

        debug!(interval_ms = period.as_millis() as u64, "System monitor started");
        self.running = Some(RunningSampler { handle, points: rx });
        Ok(())
    }

    /// Cancel the sampling task and return the collected history.
    pub fn stop(&mut self) -> Vec<MetricsPoint> {
        let Some(mut running) = self.running.take() else {
            return Vec::new();
        };

        running.handle.abort();
        running.points.close();

        let mut history = Vec::new();
        while let Ok(point) = running.points.try_recv() {
            history.push(point);
        }

        debug!(samples = history.len(), "System monitor stopped");
        history
    }
}

impl Drop for SystemMonitor {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedSampler;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn snapshot(cpu: f64, disk_read: u64) -> ResourceSnapshot {
        ResourceSnapshot {
            cpu_percent: cpu,
            memory_percent: 40.0,
            memory_mb: 512.0,
            disk_read_bytes: disk_read,
            ..Default::default()
        }
    }

    #[test]
    fn summary_takes_mean_and_peak() {
        let base = snapshot(0.0, 0);
        let points: Vec<MetricsPoint> = [(10.0, 0), (30.0, 1024 * 1024), (20.0, 2 * 1024 * 1024)]
            .iter()
            .map(|(cpu, disk)| MetricsPoint::from_snapshots(&snapshot(*cpu, *disk), &base, Duration::ZERO))
            .collect();

        let summary = ResourceSummary::from_points(&points);

        assert_eq!(summary.samples, 3);
        assert!((summary.avg_cpu_percent - 20.0).abs() < 1e-9);
        assert_eq!(summary.peak_cpu_percent, 30.0);
        assert_eq!(summary.avg_memory_percent, 40.0);
        assert!((summary.disk_read_mb - 2.0).abs() < 1e-9);
    }

    #[test]
    fn empty_history_summarizes_to_zero() {
        assert_eq!(ResourceSummary::from_points(&[]), ResourceSummary::default());
    }

    #[tokio::test(start_paused = true)]
    async fn collects_points_until_stopped() {
        let sampler = Arc::new(ScriptedSampler::constant(snapshot(25.0, 0)));
        let mut monitor = SystemMonitor::new(sampler, Duration::from_millis(100));

        monitor.start().unwrap();
        assert!(monitor.is_running());
        tokio::time::sleep(Duration::from_millis(350)).await;
        let history = monitor.stop();

        assert!(!monitor.is_running());
        assert!(history.len() >= 3, "got {} points", history.len());
        assert!(history.iter().all(|p| p.cpu_percent == 25.0));

        // Nothing more arrives once stopped.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(monitor.stop().is_empty());
    }

    #[tokio::test]
    async fn double_start_is_rejected() {
        let sampler = Arc::new(ScriptedSampler::constant(snapshot(1.0, 0)));
        let mut monitor = SystemMonitor::new(sampler, Duration::from_millis(50));

        monitor.start().unwrap();
        assert!(matches!(monitor.start(), Err(MonitorError::AlreadyRunning)));
        monitor.stop();
    }

    /// Panics on its first periodic read, then behaves.
    struct PanicsOnce(AtomicUsize);

    impl ResourceSampler for PanicsOnce {
        fn sample(&self) -> MonitorResult<ResourceSnapshot> {
            if self.0.fetch_add(1, Ordering::SeqCst) == 1 {
                panic!("procfs read crashed");
            }
            Ok(snapshot(10.0, 0))
        }

        fn name(&self) -> &str {
            "panics-once"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn crashed_sample_does_not_stop_the_monitor() {
        let sampler = Arc::new(PanicsOnce(AtomicUsize::new(0)));
        let mut monitor = SystemMonitor::new(sampler.clone(), Duration::from_millis(10));

        monitor.start().unwrap();
        tokio::time::sleep(Duration::from_millis(35)).await;
        let history = monitor.stop();

        assert!(history.len() >= 2, "got {} points", history.len());
        assert!(history.iter().all(|p| p.cpu_percent == 10.0));
        assert!(sampler.0.load(Ordering::SeqCst) >= 4);
    }

    #[tokio::test(start_paused = true)]
    async fn io_deltas_are_relative_to_baseline() {
        let mb = 1024 * 1024;
        let sampler = Arc::new(ScriptedSampler::new(vec![
            snapshot(5.0, 10 * mb),
            snapshot(5.0, 12 * mb),
            snapshot(5.0, 15 * mb),
        ]));
        let mut monitor = SystemMonitor::new(sampler, Duration::from_millis(10));

        monitor.start().unwrap();
        tokio::time::sleep(Duration::from_millis(15)).await;
        let history = monitor.stop();

        assert_eq!(history.len(), 2);
        assert!((history[0].disk_read_mb - 2.0).abs() < 1e-9);
        assert!((history[1].disk_read_mb - 5.0).abs() < 1e-9);
    }
}

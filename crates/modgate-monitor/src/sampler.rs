//! Instantaneous host resource samples.
//!
//! [`ProcfsSampler`] reads the Linux `/proc` filesystem. The procfs root is
//! configurable so the parser can be pointed at fixture files.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, MonitorResult};

/// One reading of host resources. Disk and network figures are cumulative
/// counters since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_mb: f64,
    pub disk_read_bytes: u64,
    pub disk_write_bytes: u64,
    pub net_sent_bytes: u64,
    pub net_recv_bytes: u64,
}

/// Source of resource snapshots.
pub trait ResourceSampler: Send + Sync {
    fn sample(&self) -> MonitorResult<ResourceSnapshot>;

    fn name(&self) -> &str {
        "sampler"
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct CpuTimes {
    idle: u64,
    total: u64,
}

/// Sampler backed by `/proc`.
pub struct ProcfsSampler {
    root: PathBuf,
    last_cpu: Mutex<Option<CpuTimes>>,
}

impl ProcfsSampler {
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            last_cpu: Mutex::new(None),
        }
    }

    fn read(&self, relative: &str) -> MonitorResult<String> {
        let path = self.root.join(relative);
        std::fs::read_to_string(&path).map_err(|source| MonitorError::Read {
            source_path: path.display().to_string(),
            source,
        })
    }

    fn cpu_percent(&self) -> MonitorResult<f64> {
        let stat = self.read("stat")?;
        let times = parse_cpu_times(&stat).ok_or_else(|| MonitorError::Parse {
            source_path: self.root.join("stat").display().to_string(),
            reason: "missing aggregate cpu line".into(),
        })?;

        let mut last = self.last_cpu.lock();
        let (idle, total) = match *last {
            Some(prev) if times.total > prev.total => {
                (times.idle.saturating_sub(prev.idle), times.total - prev.total)
            }
            _ => (times.idle, times.total),
        };
        *last = Some(times);

        if total == 0 {
            return Ok(0.0);
        }
        Ok((1.0 - idle as f64 / total as f64) * 100.0)
    }

    fn memory(&self) -> MonitorResult<(f64, f64)> {
        let meminfo = self.read("meminfo")?;
        let field = |prefix: &str| -> Option<u64> {
            meminfo
                .lines()
                .find(|l| l.starts_with(prefix))
                .and_then(|l| l.split_whitespace().nth(1))
                .and_then(|v| v.parse().ok())
        };

        let total_kb = field("MemTotal:").ok_or_else(|| MonitorError::Parse {
            source_path: self.root.join("meminfo").display().to_string(),
            reason: "missing MemTotal".into(),
        })?;
        let available_kb = field("MemAvailable:")
            .or_else(|| field("MemFree:"))
            .unwrap_or(0);

        let used_kb = total_kb.saturating_sub(available_kb);
        let percent = if total_kb == 0 {
            0.0
        } else {
            used_kb as f64 / total_kb as f64 * 100.0
        };
        Ok((percent, used_kb as f64 / 1024.0))
    }
}

impl Default for ProcfsSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSampler for ProcfsSampler {
    fn sample(&self) -> MonitorResult<ResourceSnapshot> {
        if !cfg!(target_os = "linux") && self.root == Path::new("/proc") {
            return Err(MonitorError::Unsupported(std::env::consts::OS.to_string()));
        }

        let cpu_percent = self.cpu_percent()?;
        let (memory_percent, memory_mb) = self.memory()?;
        // Disk and network counters are best effort: containers often hide them.
        let (disk_read_bytes, disk_write_bytes) = self
            .read("diskstats")
            .map(|s| parse_diskstats(&s))
            .unwrap_or_default();
        let (net_recv_bytes, net_sent_bytes) = self
            .read("net/dev")
            .map(|s| parse_net_dev(&s))
            .unwrap_or_default();

        Ok(ResourceSnapshot {
            cpu_percent,
            memory_percent,
            memory_mb,
            disk_read_bytes,
            disk_write_bytes,
            net_sent_bytes,
            net_recv_bytes,
        })
    }

    fn name(&self) -> &str {
        "procfs"
    }
}

fn parse_cpu_times(stat: &str) -> Option<CpuTimes> {
    let line = stat.lines().find(|l| l.starts_with("cpu "))?;
    let values: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|v| v.parse().ok())
        .collect();
    if values.len() < 4 {
        return None;
    }

    // user nice system idle iowait irq softirq steal
    let idle = values[3] + values.get(4).copied().unwrap_or(0);
    let total = values.iter().take(8).sum();
    Some(CpuTimes { idle, total })
}

/// Sum sectors read/written over whole devices, skipping partitions and
/// virtual devices. Returns bytes.
fn parse_diskstats(diskstats: &str) -> (u64, u64) {
    let rows: Vec<(String, u64, u64)> = diskstats
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 10 {
                return None;
            }
            let name = fields[2].to_string();
            let sectors_read = fields[5].parse().ok()?;
            let sectors_written = fields[9].parse().ok()?;
            Some((name, sectors_read, sectors_written))
        })
        .filter(|(name, _, _)| !name.starts_with("loop") && !name.starts_with("ram"))
        .collect();

    let is_partition = |name: &str| {
        rows.iter()
            .any(|(other, _, _)| other.len() < name.len() && name.starts_with(other.as_str()))
    };

    rows.iter()
        .filter(|(name, _, _)| !is_partition(name))
        .fold((0, 0), |(read, written), (_, r, w)| {
            (read + r * 512, written + w * 512)
        })
}

/// Sum received/transmitted bytes over non-loopback interfaces.
fn parse_net_dev(net_dev: &str) -> (u64, u64) {
    net_dev
        .lines()
        .skip(2)
        .filter_map(|line| {
            let (iface, counters) = line.split_once(':')?;
            if iface.trim() == "lo" {
                return None;
            }
            let fields: Vec<u64> = counters
                .split_whitespace()
                .filter_map(|v| v.parse().ok())
                .collect();
            Some((*fields.first()?, *fields.get(8)?))
        })
        .fold((0, 0), |(recv, sent), (r, s)| (recv + r, sent + s))
}

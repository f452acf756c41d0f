//! Deterministic samplers for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::MonitorResult;
use crate::sampler::{ResourceSampler, ResourceSnapshot};

/// Replays a fixed list of snapshots, repeating the last one forever.
pub struct ScriptedSampler {
    script: Vec<ResourceSnapshot>,
    cursor: AtomicUsize,
}

impl ScriptedSampler {
    pub fn new(script: Vec<ResourceSnapshot>) -> Self {
        assert!(!script.is_empty(), "scripted sampler needs at least one snapshot");
        Self {
            script,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn constant(snapshot: ResourceSnapshot) -> Self {
        Self::new(vec![snapshot])
    }

    /// Number of samples taken so far.
    pub fn calls(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

impl ResourceSampler for ScriptedSampler {
    fn sample(&self) -> MonitorResult<ResourceSnapshot> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        Ok(self.script[index.min(self.script.len() - 1)])
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

//! Compatibility test records.
//!
//! A [`CompatibilityTest`] moves `pending -> running -> terminal` exactly once.
//! The status field is private so the only way to change it is through
//! [`CompatibilityTest::start`], [`CompatibilityTest::finish`] and
//! [`CompatibilityTest::force_error`].

use std::fmt;

use chrono::{DateTime, Utc};
use modgate_types::{DatabaseKind, PlatformDescriptor, Version};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CompatError, CompatResult};

/// Verdict of a single compatibility test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompatibilityStatus {
    Pending,
    Running,
    Compatible,
    Incompatible,
    Partial,
    Unknown,
    Error,
}

impl CompatibilityStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CompatibilityStatus::Pending | CompatibilityStatus::Running)
    }

    /// Whether this verdict says anything definite about the combination.
    pub fn is_definitive(&self) -> bool {
        matches!(
            self,
            CompatibilityStatus::Compatible | CompatibilityStatus::Incompatible | CompatibilityStatus::Partial
        )
    }
}

impl fmt::Display for CompatibilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompatibilityStatus::Pending => "pending",
            CompatibilityStatus::Running => "running",
            CompatibilityStatus::Compatible => "compatible",
            CompatibilityStatus::Incompatible => "incompatible",
            CompatibilityStatus::Partial => "partial",
            CompatibilityStatus::Unknown => "unknown",
            CompatibilityStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// What a compatibility test exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    /// Module against the runtime on the detected host platform.
    Basic,
    /// Module against the published container image.
    Docker,
    /// Module against one database backend.
    Database,
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestKind::Basic => write!(f, "basic"),
            TestKind::Docker => write!(f, "docker"),
            TestKind::Database => write!(f, "database"),
        }
    }
}

/// One cell of the compatibility matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityTest {
    pub id: Uuid,
    pub kind: TestKind,
    pub version: Version,
    pub platform: PlatformDescriptor,
    pub database: Option<DatabaseKind>,
    status: CompatibilityStatus,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub result_data: serde_json::Map<String, serde_json::Value>,
    pub execution_time_ms: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl CompatibilityTest {
    pub fn new(kind: TestKind, version: Version, platform: PlatformDescriptor) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            version,
            platform,
            database: None,
            status: CompatibilityStatus::Pending,
            issues: Vec::new(),
            warnings: Vec::new(),
            result_data: serde_json::Map::new(),
            execution_time_ms: 0,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn basic(version: Version, platform: PlatformDescriptor) -> Self {
        Self::new(TestKind::Basic, version, platform)
    }

    pub fn docker(version: Version, platform: PlatformDescriptor) -> Self {
        Self::new(TestKind::Docker, version, platform)
    }

    pub fn database(version: Version, platform: PlatformDescriptor, database: DatabaseKind) -> Self {
        let mut test = Self::new(TestKind::Database, version, platform);
        test.database = Some(database);
        test
    }

    pub fn status(&self) -> CompatibilityStatus {
        self.status
    }

    /// Matrix key: `{version}_{platform}` with `_{database}` for database tests.
    pub fn key(&self) -> String {
        match self.database {
            Some(db) => format!("{}_{}_{}", self.version, self.platform.key(), db),
            None => format!("{}_{}", self.version, self.platform.key()),
        }
    }

    pub fn start(&mut self) -> CompatResult<()> {
        if self.status != CompatibilityStatus::Pending {
            return Err(CompatError::InvalidTransition {
                from: self.status,
                to: CompatibilityStatus::Running,
            });
        }
        self.status = CompatibilityStatus::Running;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn finish(&mut self, status: CompatibilityStatus) -> CompatResult<()> {
        if self.status != CompatibilityStatus::Running || !status.is_terminal() {
            return Err(CompatError::InvalidTransition { from: self.status, to: status });
        }
        self.status = status;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Drive the test to `error` from whatever non-terminal state it is in.
    /// A test that already reached a verdict keeps it.
    pub fn force_error(&mut self, message: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.issues.push(message.into());
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        self.status = CompatibilityStatus::Error;
        self.completed_at = Some(Utc::now());
    }
}

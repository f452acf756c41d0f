//! Database backend probes.
//!
//! Each backend is one [`DatabaseProbe`] picked once by [`DatabaseKind`].
//! The built-in probes return fixed verdicts; a connecting implementation
//! can be swapped in through [`DatabaseProbeFactory`] without touching the
//! tester.

use std::collections::BTreeMap;

use async_trait::async_trait;
use modgate_types::DatabaseKind;
use serde::{Deserialize, Serialize};

use crate::case::CompatibilityStatus;
use crate::error::{CompatError, CompatResult};

/// Statement every probe runs once connected.
pub const VALIDATION_STATEMENT: &str = "SELECT 1";

/// Verdict returned by a probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub status: CompatibilityStatus,
    pub warnings: Vec<String>,
    pub details: BTreeMap<String, String>,
}

impl ProbeOutcome {
    pub fn new(status: CompatibilityStatus) -> Self {
        Self {
            status,
            warnings: Vec::new(),
            details: BTreeMap::new(),
        }
    }

    pub fn warn(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Connect / execute / close against one database backend.
#[async_trait]
pub trait DatabaseProbe: Send {
    fn kind(&self) -> DatabaseKind;

    async fn connect(&mut self) -> CompatResult<()>;

    async fn execute(&mut self, statement: &str) -> CompatResult<ProbeOutcome>;

    async fn close(&mut self) -> CompatResult<()>;
}

/// Creates a fresh probe per database test.
pub trait DatabaseProbeFactory: Send + Sync {
    fn create(&self, kind: DatabaseKind) -> Box<dyn DatabaseProbe>;
}

/// Factory for the built-in fixed-verdict probes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticProbeFactory;

impl DatabaseProbeFactory for StaticProbeFactory {
    fn create(&self, kind: DatabaseKind) -> Box<dyn DatabaseProbe> {
        match kind {
            DatabaseKind::Mysql => Box::new(StaticDatabaseProbe::new(kind, "mysql-connector-j", mysql_verdict)),
            DatabaseKind::Postgresql => Box::new(StaticDatabaseProbe::new(kind, "pgjdbc", postgresql_verdict)),
            DatabaseKind::Mssql => Box::new(StaticDatabaseProbe::new(kind, "mssql-jdbc", mssql_verdict)),
            DatabaseKind::Oracle => Box::new(StaticDatabaseProbe::new(kind, "ojdbc", oracle_verdict)),
        }
    }
}

fn mysql_verdict() -> ProbeOutcome {
    ProbeOutcome::new(CompatibilityStatus::Compatible)
}

fn postgresql_verdict() -> ProbeOutcome {
    ProbeOutcome::new(CompatibilityStatus::Compatible)
}

fn mssql_verdict() -> ProbeOutcome {
    ProbeOutcome::new(CompatibilityStatus::Partial)
        .warn("SQL Server history partitioning and store-and-forward quarantine are limited with this module")
}

fn oracle_verdict() -> ProbeOutcome {
    ProbeOutcome::new(CompatibilityStatus::Unknown)
        .warn("Oracle support has not been verified; test against a staging database before deploying")
}

/// Fixed-verdict probe that still honours the connection lifecycle.
pub struct StaticDatabaseProbe {
    kind: DatabaseKind,
    driver: &'static str,
    verdict: fn() -> ProbeOutcome,
    connected: bool,
}

impl StaticDatabaseProbe {
    pub fn new(kind: DatabaseKind, driver: &'static str, verdict: fn() -> ProbeOutcome) -> Self {
        Self {
            kind,
            driver,
            verdict,
            connected: false,
        }
    }
}

#[async_trait]
impl DatabaseProbe for StaticDatabaseProbe {
    fn kind(&self) -> DatabaseKind {
        self.kind
    }

    async fn connect(&mut self) -> CompatResult<()> {
        self.connected = true;
        Ok(())
    }

    async fn execute(&mut self, statement: &str) -> CompatResult<ProbeOutcome> {
        if !self.connected {
            return Err(CompatError::Probe {
                database: self.kind,
                reason: "connection not open".to_string(),
            });
        }
        Ok((self.verdict)()
            .detail("driver", self.driver)
            .detail("statement", statement))
    }

    async fn close(&mut self) -> CompatResult<()> {
        self.connected = false;
        Ok(())
    }
}

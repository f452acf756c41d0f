//! # modgate-compat
//!
//! Builds a version x platform x database compatibility matrix for a module
//! package and runs it with bounded parallelism.
//!
//! - One `basic` test per target version on the detected host platform
//! - One `docker` test per version when a container engine answers
//! - One `database` test per backend for the newest version
//!
//! Tests run concurrently under a semaphore; each ends in exactly one
//! terminal verdict, and the verdicts reduce to an overall status through
//! [`overall_status`].

pub mod case;
pub mod config;
pub mod database;
pub mod environment;
pub mod error;
pub mod matrix;
pub mod report;
pub mod rules;
pub mod tester;

pub use case::{CompatibilityStatus, CompatibilityTest, TestKind};
pub use config::CompatibilityConfig;
pub use database::{DatabaseProbe, DatabaseProbeFactory, ProbeOutcome, StaticDatabaseProbe, StaticProbeFactory};
pub use environment::{parse_java_major, EnvironmentProbe, HostEnvironment, StaticEnvironment};
pub use error::{CompatError, CompatResult};
pub use matrix::{overall_status, CompatibilityMatrix};
pub use report::CompatibilityReport;
pub use rules::{evaluate_basic, evaluate_docker, Verdict};
pub use tester::{CompatibilityTester, ConcurrencyGauge};

//! # modgate-types
//!
//! Value types shared by the modgate testing components:
//!
//! - [`Version`]: gateway runtime versions, ordered by release triple
//! - [`PlatformDescriptor`] and [`DatabaseKind`]: compatibility-matrix keys
//! - [`classify_error`]: turns raw execution errors into actionable text
//! - [`export_report`]: the JSON report sink every report goes through

pub mod classify;
pub mod export;
pub mod platform;
pub mod version;

pub use classify::{classify_error, ErrorCategory};
pub use export::{export_report, ExportError, ExportResult};
pub use platform::{Architecture, DatabaseKind, OsFamily, PlatformDescriptor, PlatformKind};
pub use version::{Edition, Version, VersionParseError};

/// File extension of gateway module packages.
pub const MODULE_EXTENSION: &str = "modl";

//! Per-test decision rules.

use modgate_types::{Architecture, OsFamily, PlatformDescriptor, Version};

use crate::case::CompatibilityStatus;

/// Oldest runtime major version modules are built against.
pub const MIN_RUNTIME_MAJOR: u32 = 8;

/// Oldest Java runtime without a warning.
pub const MIN_JAVA_MAJOR: u32 = 11;

/// Outcome of applying a rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub status: CompatibilityStatus,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

impl Verdict {
    fn new(status: CompatibilityStatus) -> Self {
        Self {
            status,
            issues: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Module on a runtime version, on the given host platform.
///
/// Platform and Java heuristics only add warnings.
pub fn evaluate_basic(version: &Version, platform: &PlatformDescriptor) -> Verdict {
    let mut verdict = if version.major < MIN_RUNTIME_MAJOR {
        let mut v = Verdict::new(CompatibilityStatus::Incompatible);
        v.issues.push(format!(
            "Module requires runtime >= {}.0; {} is not supported",
            MIN_RUNTIME_MAJOR, version
        ));
        v
    } else if version.minor < 1 {
        let mut v = Verdict::new(CompatibilityStatus::Partial);
        v.warnings.push(format!(
            "Runtime {} offers limited functionality for this module; 8.1 or newer is recommended",
            version.line()
        ));
        v
    } else {
        Verdict::new(CompatibilityStatus::Compatible)
    };

    verdict.warnings.extend(platform_warnings(platform));
    verdict
}

/// Module on the published container image of a runtime version.
///
/// The version verdict belongs to the basic test alone, so a runtime below
/// the supported minimum leaves the container run `unknown` with a warning.
pub fn evaluate_docker(version: &Version) -> Verdict {
    if version.major >= MIN_RUNTIME_MAJOR {
        Verdict::new(CompatibilityStatus::Compatible)
    } else {
        let mut v = Verdict::new(CompatibilityStatus::Unknown);
        v.warnings.push(format!(
            "Container run not evaluated: runtime {} is below the supported minimum {}.0",
            version, MIN_RUNTIME_MAJOR
        ));
        v
    }
}

pub fn platform_warnings(platform: &PlatformDescriptor) -> Vec<String> {
    let mut warnings = Vec::new();

    if platform.os == OsFamily::Windows && platform.architecture.is_32_bit() {
        warnings.push("32-bit Windows limits the gateway heap; a 64-bit host is recommended".to_string());
    }
    if platform.os == OsFamily::Linux && platform.architecture.is_arm() {
        warnings.push(format!(
            "ARM Linux ({}) is supported for edge installs only; verify native libraries",
            platform.architecture
        ));
    }
    if platform.architecture == Architecture::X86 && platform.os != OsFamily::Windows {
        warnings.push("32-bit x86 hosts are not a tested target".to_string());
    }
    if let Some(java) = platform.runtime_version.filter(|j| *j < MIN_JAVA_MAJOR) {
        warnings.push(format!(
            "Java {} detected; Java {} or newer is recommended",
            java, MIN_JAVA_MAJOR
        ));
    }

    warnings
}

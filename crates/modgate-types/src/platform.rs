//! Platform and database descriptors used as compatibility-matrix keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Whether a platform is a bare operating system or a container image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Os,
    Container,
}

/// Operating system family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Windows,
    Linux,
    Macos,
    Other(String),
}

impl OsFamily {
    /// Family of the host this binary was built for.
    pub fn host() -> Self {
        Self::from(std::env::consts::OS)
    }
}

impl From<&str> for OsFamily {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "windows" => OsFamily::Windows,
            "linux" => OsFamily::Linux,
            "macos" | "darwin" => OsFamily::Macos,
            other => OsFamily::Other(other.to_string()),
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsFamily::Windows => write!(f, "windows"),
            OsFamily::Linux => write!(f, "linux"),
            OsFamily::Macos => write!(f, "macos"),
            OsFamily::Other(name) => write!(f, "{}", name),
        }
    }
}

/// CPU architecture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    X86,
    X86_64,
    Arm,
    Aarch64,
    Other(String),
}

impl Architecture {
    pub fn host() -> Self {
        Self::from(std::env::consts::ARCH)
    }

    pub fn is_32_bit(&self) -> bool {
        matches!(self, Architecture::X86 | Architecture::Arm)
    }

    pub fn is_arm(&self) -> bool {
        matches!(self, Architecture::Arm | Architecture::Aarch64)
    }
}

impl From<&str> for Architecture {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "x86" | "i386" | "i686" => Architecture::X86,
            "x86_64" | "amd64" => Architecture::X86_64,
            "arm" | "armv7" | "armv7l" => Architecture::Arm,
            "aarch64" | "arm64" => Architecture::Aarch64,
            other => Architecture::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::X86 => write!(f, "x86"),
            Architecture::X86_64 => write!(f, "x86_64"),
            Architecture::Arm => write!(f, "arm"),
            Architecture::Aarch64 => write!(f, "aarch64"),
            Architecture::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Description of a platform a module is tested on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformDescriptor {
    pub kind: PlatformKind,
    pub os: OsFamily,
    pub os_version: String,
    pub architecture: Architecture,
    /// Major version of the Java runtime, when one was detected.
    pub runtime_version: Option<u32>,
    /// Container image reference for container platforms.
    pub image: Option<String>,
}

impl PlatformDescriptor {
    pub fn os(os: OsFamily, os_version: impl Into<String>, architecture: Architecture) -> Self {
        Self {
            kind: PlatformKind::Os,
            os,
            os_version: os_version.into(),
            architecture,
            runtime_version: None,
            image: None,
        }
    }

    /// Synthetic descriptor for a container image of the gateway runtime.
    pub fn container(image: impl Into<String>, architecture: Architecture) -> Self {
        Self {
            kind: PlatformKind::Container,
            os: OsFamily::Linux,
            os_version: "container".to_string(),
            architecture,
            runtime_version: None,
            image: Some(image.into()),
        }
    }

    pub fn with_runtime(mut self, runtime_version: u32) -> Self {
        self.runtime_version = Some(runtime_version);
        self
    }

    /// Stable matrix key, e.g. `linux-x86_64` or `container-linux-x86_64`.
    pub fn key(&self) -> String {
        match self.kind {
            PlatformKind::Os => format!("{}-{}", self.os, self.architecture),
            PlatformKind::Container => format!("container-{}-{}", self.os, self.architecture),
        }
    }
}

impl fmt::Display for PlatformDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Database backends the gateway can store history and tags in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Mysql,
    Postgresql,
    Mssql,
    Oracle,
}

impl DatabaseKind {
    pub const ALL: [DatabaseKind; 4] = [
        DatabaseKind::Mysql,
        DatabaseKind::Postgresql,
        DatabaseKind::Mssql,
        DatabaseKind::Oracle,
    ];
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseKind::Mysql => write!(f, "mysql"),
            DatabaseKind::Postgresql => write!(f, "postgresql"),
            DatabaseKind::Mssql => write!(f, "mssql"),
            DatabaseKind::Oracle => write!(f, "oracle"),
        }
    }
}

impl FromStr for DatabaseKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" => Ok(DatabaseKind::Mysql),
            "postgresql" | "postgres" => Ok(DatabaseKind::Postgresql),
            "mssql" | "sqlserver" => Ok(DatabaseKind::Mssql),
            "oracle" => Ok(DatabaseKind::Oracle),
            other => Err(format!("unknown database kind: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_keys_are_stable() {
        let os = PlatformDescriptor::os(OsFamily::Linux, "6.1", Architecture::X86_64);
        assert_eq!(os.key(), "linux-x86_64");

        let container = PlatformDescriptor::container("inductiveautomation/ignition:8.1.15", Architecture::Aarch64);
        assert_eq!(container.key(), "container-linux-aarch64");
    }

    #[test]
    fn architecture_aliases() {
        assert_eq!(Architecture::from("amd64"), Architecture::X86_64);
        assert_eq!(Architecture::from("i686"), Architecture::X86);
        assert!(Architecture::from("armv7l").is_32_bit());
        assert!(Architecture::from("arm64").is_arm());
    }

    #[test]
    fn database_kind_parses_aliases() {
        assert_eq!("postgres".parse::<DatabaseKind>(), Ok(DatabaseKind::Postgresql));
        assert_eq!("SQLServer".parse::<DatabaseKind>(), Ok(DatabaseKind::Mssql));
        assert!("db2".parse::<DatabaseKind>().is_err());
    }
}

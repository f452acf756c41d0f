//! Gateway runtime versions.
//!
//! Versions are written `major.minor.patch[.bBUILD][-edition]`, e.g.
//! `8.1.15`, `8.1.25.b2023012410` or `8.1.33-edge`. Ordering only looks at
//! the numeric release triple; build numbers and editions never reorder
//! two releases.
//!
//! The triple is parsed by [`semver`]. The build and edition suffixes are
//! split off first: semver has no fourth component, and it would read
//! `-edge` as a pre-release that sorts before the plain release.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Edition of the gateway runtime a version belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edition {
    #[default]
    Standard,
    Edge,
    Maker,
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edition::Standard => write!(f, "standard"),
            Edition::Edge => write!(f, "edge"),
            Edition::Maker => write!(f, "maker"),
        }
    }
}

impl FromStr for Edition {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Edition::Standard),
            "edge" => Ok(Edition::Edge),
            "maker" => Ok(Edition::Maker),
            other => Err(VersionParseError::UnknownEdition(other.to_string())),
        }
    }
}

/// Error returned when a version string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionParseError {
    #[error("empty version string")]
    Empty,

    #[error("expected major.minor.patch, got '{0}'")]
    MissingComponent(String),

    #[error("invalid numeric component '{component}' in '{input}'")]
    InvalidNumber { input: String, component: String },

    #[error("invalid release '{input}': {reason}")]
    InvalidRelease { input: String, reason: String },

    #[error("invalid build suffix '{0}' (expected b<digits>)")]
    InvalidBuild(String),

    #[error("unknown edition '{0}'")]
    UnknownEdition(String),
}

/// A gateway runtime version.
#[derive(Debug, Clone, Copy, Eq)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub build: Option<u64>,
    pub edition: Edition,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            build: None,
            edition: Edition::Standard,
        }
    }

    pub fn with_build(mut self, build: u64) -> Self {
        self.build = Some(build);
        self
    }

    pub fn with_edition(mut self, edition: Edition) -> Self {
        self.edition = edition;
        self
    }

    /// The `major.minor` release line, e.g. `8.1`.
    pub fn line(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }

    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        input.parse()
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl std::hash::Hash for Version {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (self.major, self.minor, self.patch).hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(VersionParseError::Empty);
        }

        let (numbers, edition) = match input.split_once('-') {
            Some((numbers, edition)) => (numbers, edition.parse::<Edition>()?),
            None => (input, Edition::Standard),
        };

        let parts: Vec<&str> = numbers.split('.').collect();
        if parts.len() < 3 || parts.len() > 4 {
            return Err(VersionParseError::MissingComponent(input.to_string()));
        }

        let release = semver::Version::parse(&parts[..3].join(".")).map_err(|e| VersionParseError::InvalidRelease {
            input: input.to_string(),
            reason: e.to_string(),
        })?;
        let number = |component: u64| -> Result<u32, VersionParseError> {
            u32::try_from(component).map_err(|_| VersionParseError::InvalidNumber {
                input: input.to_string(),
                component: component.to_string(),
            })
        };

        let build = match parts.get(3) {
            Some(raw) => {
                let digits = raw
                    .strip_prefix('b')
                    .ok_or_else(|| VersionParseError::InvalidBuild(raw.to_string()))?;
                Some(
                    digits
                        .parse::<u64>()
                        .map_err(|_| VersionParseError::InvalidBuild(raw.to_string()))?,
                )
            }
            None => None,
        };

        Ok(Self {
            major: number(release.major)?,
            minor: number(release.minor)?,
            patch: number(release.patch)?,
            build,
            edition,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(build) = self.build {
            write!(f, ".b{}", build)?;
        }
        if self.edition != Edition::Standard {
            write!(f, "-{}", self.edition)?;
        }
        Ok(())
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

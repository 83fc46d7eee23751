//! Interpreter version tags and the supported version window.

use std::fmt;
use std::str::FromStr;

use crate::error::{BytecodeError, Result};

/// A `major.minor` interpreter version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct RuntimeVersion {
    pub major: u8,
    pub minor: u8,
}

impl RuntimeVersion {
    /// The last release without inline cache entries.
    pub const PY_3_10: RuntimeVersion = RuntimeVersion::new(3, 10);

    /// The first release with inline cache entries.
    pub const PY_3_11: RuntimeVersion = RuntimeVersion::new(3, 11);

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Error returned when a version string is not `major.minor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionParseError(String);

impl fmt::Display for VersionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid interpreter version '{}'", self.0)
    }
}

impl std::error::Error for VersionParseError {}

impl FromStr for RuntimeVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (major, minor) = trimmed
            .split_once('.')
            .ok_or_else(|| VersionParseError(s.to_string()))?;
        let major = major
            .parse()
            .map_err(|_| VersionParseError(s.to_string()))?;
        let minor = minor
            .parse()
            .map_err(|_| VersionParseError(s.to_string()))?;
        Ok(Self::new(major, minor))
    }
}

impl TryFrom<String> for RuntimeVersion {
    type Error = VersionParseError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RuntimeVersion> for String {
    fn from(value: RuntimeVersion) -> Self {
        value.to_string()
    }
}

/// An inclusive range of interpreter versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VersionWindow {
    pub min: RuntimeVersion,
    pub max: RuntimeVersion,
}

impl VersionWindow {
    /// Versions whose bytecode dialects are understood by the extractor.
    pub const SUPPORTED: VersionWindow = VersionWindow {
        min: RuntimeVersion::PY_3_10,
        max: RuntimeVersion::PY_3_11,
    };

    pub const fn new(min: RuntimeVersion, max: RuntimeVersion) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, version: RuntimeVersion) -> bool {
        self.min <= version && version <= self.max
    }

    /// Fails with [`BytecodeError::UnsupportedVersion`] if `version` is outside the window.
    pub fn check(&self, version: RuntimeVersion) -> Result<()> {
        if self.contains(version) {
            Ok(())
        } else {
            Err(BytecodeError::UnsupportedVersion {
                found: version,
                window: *self,
            })
        }
    }
}

impl Default for VersionWindow {
    fn default() -> Self {
        Self::SUPPORTED
    }
}

impl fmt::Display for VersionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} through {}", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let v: RuntimeVersion = "3.11".parse().unwrap();
        assert_eq!(v, RuntimeVersion::PY_3_11);
        assert_eq!(v.to_string(), "3.11");
        assert!("3".parse::<RuntimeVersion>().is_err());
        assert!("three.eleven".parse::<RuntimeVersion>().is_err());
    }

    #[test]
    fn test_ordering_is_numeric() {
        assert!(RuntimeVersion::new(3, 9) < RuntimeVersion::PY_3_10);
        assert!(RuntimeVersion::PY_3_10 < RuntimeVersion::PY_3_11);
    }

    #[test]
    fn test_window_check() {
        let window = VersionWindow::SUPPORTED;
        assert!(window.check(RuntimeVersion::PY_3_10).is_ok());
        assert!(window.check(RuntimeVersion::PY_3_11).is_ok());

        let err = window.check(RuntimeVersion::new(3, 12)).unwrap_err();
        assert!(matches!(err, BytecodeError::UnsupportedVersion { .. }));
        assert!(err.to_string().contains("3.10 through 3.11"));
    }
}

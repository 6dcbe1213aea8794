// src/version/mod.rs

//! Interpreter version handling
//!
//! Interpreter versions appear in three shapes inside a staged tree:
//! dotted in directory names (`python3.11`), bare major in version-agnostic
//! directories (`python3`), and compact in extension ABI tags (`cpython-311`).
//! All three parse into the same [`Version`].

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An interpreter version: major plus optional minor component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: Option<u32>,
}

impl Version {
    /// Create a fully specified `major.minor` version
    pub const fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor: Some(minor),
        }
    }

    /// Create a major-only version (e.g. the `3` in `python3`)
    pub const fn major_only(major: u32) -> Self {
        Self { major, minor: None }
    }

    /// Parse a dotted version string
    ///
    /// Accepts `"3"` and `"3.11"`. Anything after the minor component
    /// (a micro release, for instance) is rejected.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let mut parts = s.split('.');
        let major = parts
            .next()
            .filter(|p| !p.is_empty())
            .and_then(|p| p.parse::<u32>().ok())
            .ok_or_else(|| Error::InvalidVersion(s.to_string()))?;
        let minor = match parts.next() {
            Some(p) => Some(
                p.parse::<u32>()
                    .map_err(|_| Error::InvalidVersion(s.to_string()))?,
            ),
            None => None,
        };
        if parts.next().is_some() {
            return Err(Error::InvalidVersion(s.to_string()));
        }
        Ok(Self { major, minor })
    }

    /// Parse the compact form used inside ABI tags
    ///
    /// The first digit is the major version, the rest is the minor:
    /// `"311"` → 3.11, `"38"` → 3.8.
    pub fn from_abi_digits(digits: &str) -> Result<Self> {
        if digits.len() < 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidVersion(digits.to_string()));
        }
        let (major, minor) = digits.split_at(1);
        let major = major
            .parse::<u32>()
            .map_err(|_| Error::InvalidVersion(digits.to_string()))?;
        let minor = minor
            .parse::<u32>()
            .map_err(|_| Error::InvalidVersion(digits.to_string()))?;
        Ok(Self::new(major, minor))
    }

    /// Compact digits as they appear in ABI tags (`3.11` → `"311"`)
    pub fn abi_digits(&self) -> String {
        match self.minor {
            Some(minor) => format!("{}{}", self.major, minor),
            None => self.major.to_string(),
        }
    }

    /// True when both major and minor are known
    pub fn is_complete(&self) -> bool {
        self.minor.is_some()
    }

    /// Compare against a `major.minor` pair, treating a missing minor as 0
    pub fn at_least(&self, major: u32, minor: u32) -> bool {
        (self.major, self.minor.unwrap_or(0)) >= (major, minor)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.minor {
            Some(minor) => write!(f, "{}.{}", self.major, minor),
            None => write!(f, "{}", self.major),
        }
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Parse a comma-separated version list such as `"3.11,3.12"`
pub fn parse_version_list(s: &str) -> Result<Vec<Version>> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(Version::parse)
        .collect()
}

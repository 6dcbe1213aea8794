// src/interpreter/extension.rs

//! Binary extension file names
//!
//! Extension modules are named `name[.tag][_d].so` where the optional tag is
//! one of:
//! - a stable ABI marker: `foo.abi3.so`
//! - a SOABI with optional multiarch triplet: `foo.cpython-311-x86_64-linux-gnu.so`
//! - a bare multiarch triplet: `foo.x86_64-linux-gnu.so`
//!
//! Any other dotted segment belongs to the module name.
//!
//! Tagging every extension lets builds for several interpreter versions share
//! one directory without overwriting each other.

use super::Implementation;
use crate::version::Version;
use regex::Regex;
use std::sync::LazyLock;

static STABLE_ABI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^abi\d+$").expect("valid regex"));

static MULTIARCH_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9_]+-(?:linux|kfreebsd|hurd)-gnu[a-z0-9_]*$").expect("valid regex")
});

static SOABI_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<soabi>(?:cpython|pypy)-?(?P<ver>\d{2,})[a-z]*(?:-pp\d+)?)(?:-(?P<multiarch>.+))?$",
    )
    .expect("valid regex")
});

/// A parsed extension file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionName {
    /// Module name (the stem without its ABI tag)
    pub name: String,
    /// Stable ABI marker such as `abi3`
    pub stable_abi: Option<String>,
    /// SOABI such as `cpython-311`
    pub soabi: Option<String>,
    /// Interpreter version recovered from the SOABI
    pub version: Option<Version>,
    /// Multiarch triplet
    pub multiarch: Option<String>,
    /// `_d` debug marker present
    pub debug: bool,
}

impl ExtensionName {
    /// Parse a file name; `None` if it is not a `.so` extension
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(".so")?;
        let (stem, debug) = match stem.strip_suffix("_d") {
            Some(stem) => (stem, true),
            None => (stem, false),
        };

        let mut info = Self {
            name: String::new(),
            stable_abi: None,
            soabi: None,
            version: None,
            multiarch: None,
            debug,
        };

        info.name = stem.to_string();
        if let Some((name, tag)) = stem.rsplit_once('.') {
            if STABLE_ABI.is_match(tag) {
                info.name = name.to_string();
                info.stable_abi = Some(tag.to_string());
            } else if let Some(caps) = SOABI_TAG.captures(tag) {
                info.name = name.to_string();
                info.soabi = caps.name("soabi").map(|m| m.as_str().to_string());
                info.version = caps
                    .name("ver")
                    .and_then(|m| Version::from_abi_digits(m.as_str()).ok());
                info.multiarch = caps.name("multiarch").map(|m| m.as_str().to_string());
            } else if MULTIARCH_TAG.is_match(tag) {
                info.name = name.to_string();
                info.multiarch = Some(tag.to_string());
            }
        }

        if info.name.is_empty() {
            return None;
        }
        Some(info)
    }

    /// True if the name carries any ABI information at all
    pub fn is_tagged(&self) -> bool {
        self.stable_abi.is_some() || self.soabi.is_some() || self.multiarch.is_some()
    }
}

/// ABI and architecture tag derived from the active interpreter context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionTag {
    pub implementation: Implementation,
    /// SOABI string for the target version
    pub abi: String,
    /// Host multiarch triplet
    pub multiarch: String,
    pub debug: bool,
    pub version: Version,
}

impl ExtensionTag {
    /// Compute the canonical file name for a parsed extension
    ///
    /// Returns `None` when the file must keep its name: stable ABI
    /// extensions, debug-marked files in a non-debug context, names already
    /// fully tagged, and names tagged for a different SOABI.
    pub fn canonical_name(&self, info: &ExtensionName) -> Option<String> {
        if info.stable_abi.is_some() {
            return None;
        }
        if info.debug && !self.debug {
            return None;
        }
        if info.soabi.is_some() && info.multiarch.is_some() {
            return None;
        }
        if let Some(soabi) = &info.soabi
            && *soabi != self.abi
        {
            return None;
        }

        let soabi = info.soabi.as_deref().unwrap_or(&self.abi);
        let multiarch = info.multiarch.as_deref().unwrap_or(&self.multiarch);

        let mut result = info.name.clone();
        if result.ends_with("module") && result != "module" && self.version.at_least(3, 3) {
            result.truncate(result.len() - "module".len());
        }

        result.push('.');
        result.push_str(soabi);
        if !multiarch.is_empty() && self.version.at_least(3, 3) && !soabi.contains(multiarch) {
            result.push('-');
            result.push_str(multiarch);
        }
        result.push_str(".so");
        Some(result)
    }
}

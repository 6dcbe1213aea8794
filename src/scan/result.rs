// src/scan/result.rs

//! Scan statistics

use crate::interpreter::ShebangRecord;
use crate::version::Version;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// What one scope of a package tree contains
///
/// Sets are ordered so two scans of the same tree serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScanStats {
    /// egg-info `requires.txt` files
    pub requires: BTreeSet<PathBuf>,
    /// dist-info `METADATA` files
    pub dist_info: BTreeSet<PathBuf>,
    /// egg-info `PKG-INFO` files and distutils `.egg-info` files
    pub egg_info: BTreeSet<PathBuf>,
    /// egg-info `namespace_packages.txt` files
    pub namespace_packages: BTreeSet<PathBuf>,
    /// Versions of public site directories seen
    pub public_versions: BTreeSet<Version>,
    /// Versions recovered from binary extensions
    pub ext_versions: BTreeSet<Version>,
    /// Binary extensions with no recoverable version
    pub ext_no_version: BTreeSet<PathBuf>,
    pub shebangs: BTreeSet<ShebangRecord>,
    /// Sources were found that need byte-compilation
    pub compile: bool,
}

impl ScanStats {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Result of one scanner pass over a package tree
///
/// Top-level statistics cover everything outside private directories; each
/// private root gets its own record since it is compiled and depended on
/// independently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    #[serde(flatten)]
    pub stats: ScanStats,
    #[serde(rename = "private-dirs")]
    pub private_dirs: BTreeMap<PathBuf, ScanStats>,
}

impl ScanResult {
    /// Statistics bucket for `scope` (`None` is the top level)
    pub fn bucket_mut(&mut self, scope: Option<&Path>) -> &mut ScanStats {
        match scope {
            Some(root) => self.private_dirs.entry(root.to_path_buf()).or_default(),
            None => &mut self.stats,
        }
    }

    /// Read-only counterpart of [`Self::bucket_mut`]
    pub fn bucket(&self, scope: Option<&Path>) -> Option<&ScanStats> {
        match scope {
            Some(root) => self.private_dirs.get(root),
            None => Some(&self.stats),
        }
    }
}

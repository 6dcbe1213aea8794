// src/metadata/mod.rs

//! Distribution metadata merging
//!
//! When two interpreter-version builds of the same distribution are folded
//! together, their metadata directories collide. Three kinds of member file
//! can be merged instead of reported as conflicts:
//!
//! - **Tag lists** (`*.dist-info/WHEEL`): headers kept, `Tag:` lines unioned and sorted
//! - **Manifests** (`*.dist-info/RECORD`): lines unioned, file rewritten sorted
//! - **Line lists** (`*.egg-info/requires.txt` and friends): missing lines appended
//!
//! Every merge rewrites the destination file whole. Malformed content is a
//! structural error and is returned, never skipped.

mod egg;
mod lines;
mod record;
mod wheel;

pub use egg::clean_egg_name;
pub use lines::{merge_lines, missing_lines, read_lines, write_lines};
pub use record::{
    fix_manifest_checksum, merge_manifest, read_manifest, remove_manifest_entries,
    ManifestEntry, MANIFEST_FILE, TAG_LIST_FILE,
};
pub use wheel::{merge_tag_list, TagList};

use crate::error::Result;
use std::path::Path;

/// Egg-info members merged as plain line lists
const LINE_LIST_FILES: &[&str] = &[
    "requires.txt",
    "top_level.txt",
    "namespace_packages.txt",
    "SOURCES.txt",
    "dependency_links.txt",
];

/// Name prefixes of license files shipped inside dist-info directories
const LICENSE_PREFIXES: &[&str] = &["LICENSE", "LICENCE", "COPYING", "AUTHORS", "NOTICE"];

/// Kind of mergeable metadata member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataFile {
    TagList,
    Manifest,
    LineList,
}

impl MetadataFile {
    /// Detect the merge kind of `path` from its name and parent directory
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let parent = path.parent()?.file_name()?.to_str()?;

        if parent.ends_with(".dist-info") {
            match name {
                TAG_LIST_FILE => Some(Self::TagList),
                MANIFEST_FILE => Some(Self::Manifest),
                _ => None,
            }
        } else if parent.ends_with(".egg-info") && LINE_LIST_FILES.contains(&name) {
            Some(Self::LineList)
        } else {
            None
        }
    }

    /// Merge `src` into `dst` with the driver for this kind
    pub fn merge(self, src: &Path, dst: &Path) -> Result<()> {
        match self {
            Self::TagList => merge_tag_list(src, dst),
            Self::Manifest => merge_manifest(src, dst),
            Self::LineList => merge_lines(src, dst),
        }
    }
}

/// Check if a dist-info member is a license file
pub fn is_license_file(name: &str) -> bool {
    LICENSE_PREFIXES.iter().any(|p| name.starts_with(p))
}

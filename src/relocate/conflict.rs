// src/relocate/conflict.rs

//! Collision bookkeeping for relocation

use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Files never diffed, whatever their content
const BINARY_SUFFIXES: &[&str] = &[".so", ".a"];

/// How a same-path collision between source and destination was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    /// Contents matched; the source copy was deleted
    IdenticalContentRemoved,
    /// The source extension got a version-tagged name and no longer collides
    RenamedByVersion,
    /// Metadata was merged into the destination; the source copy was deleted
    MetadataMerged,
    /// Divergent extensions with the same tag; destination kept, source deleted
    DestinationPreferred,
    /// Nothing could be done; both files left in place
    Unresolved,
}

impl Resolution {
    /// True when both sides are still on disk afterwards
    pub fn needs_attention(&self) -> bool {
        matches!(self, Self::Unresolved)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdenticalContentRemoved => write!(f, "identical content removed"),
            Self::RenamedByVersion => write!(f, "renamed by version"),
            Self::MetadataMerged => write!(f, "metadata merged"),
            Self::DestinationPreferred => write!(f, "destination preferred"),
            Self::Unresolved => write!(f, "unresolved"),
        }
    }
}

/// One collision met while folding a source subtree into the destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeConflict {
    /// Path relative to both subtree roots
    pub relative_path: PathBuf,
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    pub resolution: Resolution,
    /// Unified diff (destination to source), for unresolved text files in verbose mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl MergeConflict {
    pub fn new(
        relative_path: impl Into<PathBuf>,
        source_path: impl Into<PathBuf>,
        dest_path: impl Into<PathBuf>,
        resolution: Resolution,
    ) -> Self {
        Self {
            relative_path: relative_path.into(),
            source_path: source_path.into(),
            dest_path: dest_path.into(),
            resolution,
            diff: None,
        }
    }

    /// Attach a diff of the two files, if both are text
    pub fn with_diff(mut self) -> Self {
        self.diff = text_diff(&self.dest_path, &self.source_path);
        self
    }

    /// Emit the conflict on the log channel
    pub fn log(&self) {
        match self.resolution {
            Resolution::Unresolved => {
                warn!(
                    "Conflict at {}: {} differs from {}, both kept",
                    self.relative_path.display(),
                    self.source_path.display(),
                    self.dest_path.display()
                );
                if let Some(diff) = &self.diff {
                    warn!("{}", diff);
                }
            }
            Resolution::DestinationPreferred => warn!(
                "Divergent builds of {}: keeping {}, removing {}",
                self.relative_path.display(),
                self.dest_path.display(),
                self.source_path.display()
            ),
            _ => info!("{}: {}", self.relative_path.display(), self.resolution),
        }
    }
}

impl fmt::Display for MergeConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {} -> {}",
            self.relative_path.display(),
            self.resolution,
            self.source_path.display(),
            self.dest_path.display()
        )
    }
}

/// Unified diff from `old` to `new`, or `None` for binaries and non-UTF-8 files
fn text_diff(old: &Path, new: &Path) -> Option<String> {
    let name = new.file_name()?.to_string_lossy();
    if BINARY_SUFFIXES.iter().any(|s| name.ends_with(s)) {
        return None;
    }
    let old_text = fs::read_to_string(old).ok()?;
    let new_text = fs::read_to_string(new).ok()?;
    Some(diffy::create_patch(&old_text, &new_text).to_string())
}

/// Everything a relocation pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelocationReport {
    /// Destination paths of entries moved without any collision
    pub moved: Vec<PathBuf>,
    /// Source paths deleted because the destination already held the same content
    pub removed_identical: Vec<PathBuf>,
    /// Destination metadata files that absorbed a source copy
    pub merged: Vec<PathBuf>,
    /// Every collision, with its resolution
    pub conflicts: Vec<MergeConflict>,
}

impl RelocationReport {
    /// Record and log a collision
    pub fn record(&mut self, conflict: MergeConflict) {
        conflict.log();
        match conflict.resolution {
            Resolution::IdenticalContentRemoved => {
                self.removed_identical.push(conflict.source_path.clone())
            }
            Resolution::MetadataMerged => self.merged.push(conflict.dest_path.clone()),
            _ => {}
        }
        self.conflicts.push(conflict);
    }

    /// Collisions left for manual inspection
    pub fn unresolved(&self) -> impl Iterator<Item = &MergeConflict> {
        self.conflicts
            .iter()
            .filter(|c| c.resolution.needs_attention())
    }

    pub fn is_clean(&self) -> bool {
        self.unresolved().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_diff_for_text_files() {
        let temp = TempDir::new().unwrap();
        let dst = temp.path().join("dst/conf.py");
        let src = temp.path().join("src/conf.py");
        fs::create_dir_all(dst.parent().unwrap()).unwrap();
        fs::create_dir_all(src.parent().unwrap()).unwrap();
        fs::write(&dst, "A = 1\n").unwrap();
        fs::write(&src, "A = 2\n").unwrap();

        let conflict = MergeConflict::new("conf.py", &src, &dst, Resolution::Unresolved).with_diff();
        let diff = conflict.diff.unwrap();
        assert!(diff.contains("-A = 1"));
        assert!(diff.contains("+A = 2"));
    }

    #[test]
    fn test_no_diff_for_binaries() {
        let temp = TempDir::new().unwrap();
        let dst = temp.path().join("a.so");
        let src = temp.path().join("b.so");
        fs::write(&dst, "x").unwrap();
        fs::write(&src, "y").unwrap();

        let conflict = MergeConflict::new("a.so", &src, &dst, Resolution::Unresolved).with_diff();
        assert!(conflict.diff.is_none());
    }

    #[test]
    fn test_report_buckets() {
        let mut report = RelocationReport::default();
        report.record(MergeConflict::new(
            "x",
            "/s/x",
            "/d/x",
            Resolution::IdenticalContentRemoved,
        ));
        report.record(MergeConflict::new("y/RECORD", "/s/y/RECORD", "/d/y/RECORD", Resolution::MetadataMerged));
        assert!(report.is_clean());
        report.record(MergeConflict::new("z", "/s/z", "/d/z", Resolution::Unresolved));

        assert_eq!(report.removed_identical, vec![PathBuf::from("/s/x")]);
        assert_eq!(report.merged, vec![PathBuf::from("/d/y/RECORD")]);
        assert_eq!(report.unresolved().count(), 1);
        assert!(!report.is_clean());
    }
}

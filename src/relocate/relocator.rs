// src/relocate/relocator.rs

//! Folding version-specific site directories into the shared one

use super::conflict::{MergeConflict, RelocationReport, Resolution};
use crate::classify::PathClassifier;
use crate::config::Options;
use crate::error::Result;
use crate::filesystem::{
    files_identical, lexists, prune_empty_ancestors, remove_file_logged, remove_if_empty,
    same_symlink_target, sorted_entries, ExtensionRenamer,
};
use crate::interpreter::{ExtensionName, Interpreter};
use crate::metadata::{fix_manifest_checksum, MetadataFile, MANIFEST_FILE, TAG_LIST_FILE};
use crate::version::Version;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Roots and version of one fold operation
struct Fold<'p> {
    src_root: &'p Path,
    pub_version: Option<Version>,
}

/// Moves files from version-specific locations into the shared site directory
pub struct Relocator<'a> {
    interpreter: &'a Interpreter,
    classifier: &'a PathClassifier,
    rename_ext: bool,
    verbose: bool,
}

impl<'a> Relocator<'a> {
    pub fn new(interpreter: &'a Interpreter, classifier: &'a PathClassifier) -> Self {
        Self {
            interpreter,
            classifier,
            rename_ext: true,
            verbose: false,
        }
    }

    pub fn from_options(
        interpreter: &'a Interpreter,
        classifier: &'a PathClassifier,
        options: &Options,
    ) -> Self {
        Self::new(interpreter, classifier)
            .with_ext_rename(!options.no_ext_rename)
            .with_verbose(options.verbose)
    }

    pub fn with_ext_rename(mut self, enabled: bool) -> Self {
        self.rename_ext = enabled;
        self
    }

    /// Attach diffs to unresolved conflicts
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Fold the site directories of every version in `versions`
    ///
    /// Both the regular and the debug-symbol locations are handled. Each
    /// source root that ends up empty is removed along with any ancestors
    /// emptied by that, up to the package root.
    pub fn relocate(&self, versions: &[Version]) -> Result<RelocationReport> {
        let root = self.classifier.root();
        let mut report = RelocationReport::default();

        for &version in versions {
            for debug_symbols in [false, true] {
                let dst = self.interpreter.sitedir(root, debug_symbols);
                for src in self.interpreter.old_sitedirs(root, version, debug_symbols) {
                    if !src.is_dir() || src == dst {
                        continue;
                    }
                    info!("Moving files from {} to {}", src.display(), dst.display());
                    self.share_files_into(&src, &dst, &mut report)?;
                    prune_empty_ancestors(&src, root);
                }
            }
        }

        info!(
            "Relocation done: {} moved, {} identical removed, {} merged, {} unresolved",
            report.moved.len(),
            report.removed_identical.len(),
            report.merged.len(),
            report.unresolved().count()
        );
        Ok(report)
    }

    /// Move as much of `src` into `dst` as possible
    pub fn share_files(&self, src: &Path, dst: &Path) -> Result<RelocationReport> {
        let mut report = RelocationReport::default();
        self.share_files_into(src, dst, &mut report)?;
        Ok(report)
    }

    fn share_files_into(
        &self,
        src: &Path,
        dst: &Path,
        report: &mut RelocationReport,
    ) -> Result<()> {
        let fold = Fold {
            src_root: src,
            pub_version: self
                .classifier
                .classify(src)
                .public_version()
                .filter(Version::is_complete),
        };
        self.fold_dir(&fold, src, dst, report)
    }

    fn fold_dir(
        &self,
        fold: &Fold<'_>,
        src_dir: &Path,
        dst_dir: &Path,
        report: &mut RelocationReport,
    ) -> Result<()> {
        let snapshot = match sorted_entries(src_dir) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Cannot list {}: {}", src_dir.display(), e);
                return Ok(());
            }
        };

        let mut tag_list_merged = false;
        for name in &snapshot.files {
            let mut src = src_dir.join(name);
            if !lexists(&src) {
                debug!("{} already handled", src.display());
                continue;
            }

            let name_str = name.to_string_lossy();
            let original_dst = dst_dir.join(name);
            if self.rename_ext && name_str.rsplit('.').next() == Some("so") {
                src = ExtensionRenamer::new(self.interpreter, self.classifier)
                    .rename(&src, fold.pub_version)
                    .path()
                    .to_path_buf();
                if src.file_name() != Some(name.as_os_str()) && lexists(&original_dst) {
                    report.record(MergeConflict::new(
                        relative(fold, &src_dir.join(name)),
                        &src,
                        &original_dst,
                        Resolution::RenamedByVersion,
                    ));
                }
            }

            let Some(file_name) = src.file_name() else {
                continue;
            };
            let dst = dst_dir.join(file_name);
            if !lexists(&dst) {
                move_entry(&src, &dst, report);
                continue;
            }

            let resolution = self.resolve(&src, &dst)?;
            if resolution == Resolution::MetadataMerged && file_name == TAG_LIST_FILE {
                tag_list_merged = true;
            }
            let mut conflict = MergeConflict::new(relative(fold, &src), &src, &dst, resolution);
            if resolution == Resolution::Unresolved && self.verbose {
                conflict = conflict.with_diff();
            }
            report.record(conflict);
        }

        if tag_list_merged && dst_dir.join(MANIFEST_FILE).is_file() {
            fix_manifest_checksum(dst_dir)?;
        }

        for name in &snapshot.dirs {
            let src = src_dir.join(name);
            let dst = dst_dir.join(name);
            let dst_is_dir = dst
                .symlink_metadata()
                .is_ok_and(|m| m.file_type().is_dir());

            if lexists(&dst) && !dst_is_dir {
                report.record(MergeConflict::new(
                    relative(fold, &src),
                    &src,
                    &dst,
                    Resolution::Unresolved,
                ));
                continue;
            }
            self.fold_dir(fold, &src, &dst, report)?;
        }

        remove_if_empty(src_dir);
        Ok(())
    }

    /// Settle a collision between two non-directory entries
    fn resolve(&self, src: &Path, dst: &Path) -> Result<Resolution> {
        let src_link = src.is_symlink();
        let dst_link = dst.is_symlink();

        if src_link || dst_link {
            let same = src_link && dst_link && same_symlink_target(src, dst).unwrap_or(false);
            if same {
                remove_file_logged(src);
                return Ok(Resolution::IdenticalContentRemoved);
            }
            return Ok(Resolution::Unresolved);
        }

        match files_identical(src, dst) {
            Ok(true) => {
                remove_file_logged(src);
                return Ok(Resolution::IdenticalContentRemoved);
            }
            Ok(false) => {}
            Err(e) => {
                warn!("Cannot compare {} with {}: {}", src.display(), dst.display(), e);
                return Ok(Resolution::Unresolved);
            }
        }

        if let Some(kind) = MetadataFile::detect(dst) {
            kind.merge(src, dst)?;
            remove_file_logged(src);
            return Ok(Resolution::MetadataMerged);
        }

        let tagged = dst
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(ExtensionName::parse)
            .is_some_and(|info| info.version.is_some());
        if tagged {
            remove_file_logged(src);
            return Ok(Resolution::DestinationPreferred);
        }

        Ok(Resolution::Unresolved)
    }
}

/// Move `src` to `dst`, creating the destination directory if needed
fn move_entry(src: &Path, dst: &Path, report: &mut RelocationReport) {
    if let Some(parent) = dst.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Cannot create {}: {}", parent.display(), e);
        return;
    }
    match fs::rename(src, dst) {
        Ok(()) => {
            debug!("Moved {} to {}", src.display(), dst.display());
            report.moved.push(dst.to_path_buf());
        }
        Err(e) => warn!("Cannot move {} to {}: {}", src.display(), dst.display(), e),
    }
}

fn relative(fold: &Fold<'_>, path: &Path) -> PathBuf {
    path.strip_prefix(fold.src_root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

// src/filesystem/rename.rs

//! Extension renaming
//!
//! Gives binary extensions their canonical ABI-tagged names in place. Renames
//! never overwrite: if the canonical name is already taken the file keeps its
//! old name and the collision is left for the merge step to report.

use super::prune::{lexists, remove_file_logged};
use crate::classify::PathClassifier;
use crate::interpreter::Interpreter;
use crate::version::Version;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Symlink chains longer than this are treated as loops
const MAX_LINK_DEPTH: usize = 40;

/// What happened to an extension file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    /// Name already canonical, not renameable, or the rename failed
    Unchanged(PathBuf),
    /// File now lives at `to`
    Renamed { from: PathBuf, to: PathBuf },
    /// Canonical name `wanted` already exists; file kept at `path`
    Collision { path: PathBuf, wanted: PathBuf },
}

impl RenameOutcome {
    /// Where the file is now
    pub fn path(&self) -> &Path {
        match self {
            Self::Unchanged(path) => path,
            Self::Renamed { to, .. } => to,
            Self::Collision { path, .. } => path,
        }
    }
}

/// Renames extension files to their canonical tagged names
pub struct ExtensionRenamer<'a> {
    interpreter: &'a Interpreter,
    classifier: &'a PathClassifier,
}

impl<'a> ExtensionRenamer<'a> {
    pub fn new(interpreter: &'a Interpreter, classifier: &'a PathClassifier) -> Self {
        Self {
            interpreter,
            classifier,
        }
    }

    /// Rename `file` in place
    ///
    /// `pub_version` is the version of the enclosing public directory, if the
    /// file lives in a versioned one. Filesystem failures are logged and
    /// reported as [`RenameOutcome::Unchanged`].
    pub fn rename(&self, file: &Path, pub_version: Option<Version>) -> RenameOutcome {
        if pub_version.is_some()
            && is_symlink(file)
            && let Err(e) = self.collapse_symlink(file)
        {
            warn!("Cannot collapse symlink {}: {}", file.display(), e);
        }

        if self.classifier.is_platform_lib(file) {
            debug!("Skipping platform library {}", file.display());
            return RenameOutcome::Unchanged(file.to_path_buf());
        }

        let (Some(dir), Some(name)) = (file.parent(), file.file_name().and_then(|n| n.to_str()))
        else {
            return RenameOutcome::Unchanged(file.to_path_buf());
        };

        let Some(new_name) = self.interpreter.check_extname(name, pub_version) else {
            return RenameOutcome::Unchanged(file.to_path_buf());
        };

        let new_path = dir.join(&new_name);
        if lexists(&new_path) {
            warn!(
                "Destination file exists, cannot rename {} to {}",
                file.display(),
                new_name
            );
            return RenameOutcome::Collision {
                path: file.to_path_buf(),
                wanted: new_path,
            };
        }

        if let Err(e) = fs::rename(file, &new_path) {
            warn!("Cannot rename {} to {}: {}", file.display(), new_name, e);
            return RenameOutcome::Unchanged(file.to_path_buf());
        }
        info!("Renamed {} to {}", file.display(), new_name);

        if let Err(e) = retarget_symlinks(dir, name, &new_name) {
            warn!("Cannot update symlinks to {} in {}: {}", name, dir.display(), e);
        }

        RenameOutcome::Renamed {
            from: file.to_path_buf(),
            to: new_path,
        }
    }

    /// Replace a `foo.so -> foo.so.1` style chain with the real file
    ///
    /// Absolute link targets are resolved inside the package root. The chain
    /// is collapsed only when it ends at an existing file whose name carries
    /// a `.so.` suffix, in the link's own directory or its parent, and not in
    /// a platform library directory. Then every link in the chain is removed
    /// and the target is moved to the link's name. Anything else is left
    /// untouched.
    fn collapse_symlink(&self, link: &Path) -> io::Result<()> {
        let root = self.classifier.root();
        let Some(link_dir) = link.parent() else {
            return Ok(());
        };

        let mut chain = Vec::new();
        let mut current = link.to_path_buf();
        while is_symlink(&current) {
            if chain.len() >= MAX_LINK_DEPTH {
                return Err(io::Error::other("symlink chain too long"));
            }
            let dest = fs::read_link(&current)?;
            let next = match dest.strip_prefix("/") {
                Ok(inside) => root.join(inside),
                Err(_) => current.parent().unwrap_or(root).join(&dest),
            };
            chain.push(current);
            current = normalize(&next);
            if !current.starts_with(root) {
                debug!("{} points outside {}", link.display(), root.display());
                return Ok(());
            }
        }

        let versioned = current
            .file_name()
            .is_some_and(|n| n.to_string_lossy().contains(".so."));
        let nearby = current
            .parent()
            .is_some_and(|p| p == link_dir || Some(p) == link_dir.parent());
        if !current.is_file() || !versioned || !nearby || self.classifier.is_platform_lib(&current)
        {
            return Ok(());
        }

        for l in &chain {
            info!("Removing symlink {}", l.display());
            remove_file_logged(l);
        }
        info!("Renaming {} to {}", current.display(), link.display());
        fs::rename(&current, link)
    }
}

/// Resolve `.` and `..` components without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata()
        .is_ok_and(|m| m.file_type().is_symlink())
}

/// Point symlinks in `dir` that target `old_name` at `new_name` instead
fn retarget_symlinks(dir: &Path, old_name: &str, new_name: &str) -> io::Result<usize> {
    let mut updated = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_symlink() {
            continue;
        }
        let link = entry.path();
        let target = fs::read_link(&link)?;
        if target != Path::new(old_name) && target != Path::new(".").join(old_name) {
            continue;
        }

        #[cfg(unix)]
        {
            fs::remove_file(&link)?;
            std::os::unix::fs::symlink(new_name, &link)?;
        }
        debug!("Retargeted {} -> {}", link.display(), new_name);
        updated += 1;
    }
    Ok(updated)
}

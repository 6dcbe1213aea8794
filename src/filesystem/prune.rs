// src/filesystem/prune.rs

//! Directory snapshots and best-effort removal
//!
//! Mutating a directory while iterating it invalidates the iterator, so every
//! walk first materializes a sorted [`DirSnapshot`] and then applies changes.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

/// Sorted listing of one directory, split into subdirectories and the rest
///
/// Symlinks are listed as files even when they point at directories; the
/// walk never follows them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DirSnapshot {
    pub dirs: Vec<OsString>,
    pub files: Vec<OsString>,
}

impl DirSnapshot {
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty() && self.files.is_empty()
    }
}

/// Snapshot `dir` with entries in byte order
///
/// Byte order puts `foo.so` before `foo.so.1`, which the extension renamer
/// relies on.
pub fn sorted_entries(dir: &Path) -> io::Result<DirSnapshot> {
    let mut snapshot = DirSnapshot::default();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            snapshot.dirs.push(entry.file_name());
        } else {
            snapshot.files.push(entry.file_name());
        }
    }
    snapshot.dirs.sort();
    snapshot.files.sort();
    Ok(snapshot)
}

/// True if `path` exists, without following a final symlink
pub fn lexists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Remove a single file or symlink, logging failures
pub fn remove_file_logged(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed {}", path.display());
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Already removed: {}", path.display());
            false
        }
        Err(e) => {
            warn!("Cannot remove {}: {}", path.display(), e);
            false
        }
    }
}

/// Remove a directory tree, logging failures
pub fn remove_tree_logged(path: &Path) -> bool {
    match fs::remove_dir_all(path) {
        Ok(()) => {
            info!("Removed directory tree {}", path.display());
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Cannot remove directory tree {}: {}", path.display(), e);
            false
        }
    }
}

/// Remove `dir` if it is empty
///
/// Returns true if removed. A non-empty, missing or busy directory is left
/// alone and reported at debug level only.
pub fn remove_if_empty(dir: &Path) -> bool {
    match fs::remove_dir(dir) {
        Ok(()) => {
            debug!("Removed empty directory {}", dir.display());
            true
        }
        Err(e) if e.kind() == io::ErrorKind::DirectoryNotEmpty => false,
        Err(e) => {
            debug!("Keeping directory {}: {}", dir.display(), e);
            false
        }
    }
}

/// Remove `start` and then each parent while empty, stopping below `stop`
///
/// `stop` itself is never removed, and nothing outside `stop` is touched.
pub fn prune_empty_ancestors(start: &Path, stop: &Path) -> usize {
    let mut removed = 0;
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir == stop || !dir.starts_with(stop) {
            break;
        }
        if !dir.is_dir() {
            current = dir.parent();
            continue;
        }
        if !remove_if_empty(dir) {
            break;
        }
        removed += 1;
        current = dir.parent();
    }
    removed
}

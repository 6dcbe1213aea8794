// src/filesystem/mod.rs

//! Filesystem operations on staged package trees
//!
//! This module provides:
//! - Streaming content comparison for merge decisions
//! - Extension renaming with symlink bookkeeping
//! - Best-effort removal helpers that log instead of failing
//!
//! Everything here mutates a live tree in place. Helpers that remove or
//! rename report failure through logging and their return value; the walk
//! that called them keeps going.

mod compare;
mod prune;
mod rename;

pub use compare::{files_identical, same_symlink_target};
pub use prune::{
    lexists, prune_empty_ancestors, remove_file_logged, remove_if_empty, remove_tree_logged,
    sorted_entries, DirSnapshot,
};
pub use rename::{ExtensionRenamer, RenameOutcome};

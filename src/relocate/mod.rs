// src/relocate/mod.rs

//! Cross-version tree merging
//!
//! Each interpreter version's build installs into its own site directory.
//! The [`Relocator`] folds those into the shared one, entry by entry:
//!
//! | Source vs destination | Outcome |
//! |-----------------------|---------|
//! | absent at destination | moved |
//! | directory on both sides | recursed into |
//! | symlinks to the same target | source removed |
//! | byte-identical files | source removed |
//! | mergeable metadata member | merged, source removed |
//! | divergent extension with the same version tag | destination kept, source removed |
//! | anything else | both kept, reported as unresolved |
//!
//! Extensions in the source are given version-tagged names before any
//! comparison, so builds for different versions stop colliding.

mod conflict;
mod relocator;

pub use conflict::{MergeConflict, RelocationReport, Resolution};
pub use relocator::Relocator;

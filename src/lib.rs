// src/lib.rs

//! Sitefold
//!
//! Normalizes staged installation trees of Python distribution packages and
//! folds the output of several per-interpreter-version builds into one tree.
//!
//! # Architecture
//!
//! - [`classify`]: path-shape rules giving every directory a role
//! - [`interpreter`]: immutable interpreter context, extension naming, shebangs
//! - [`filesystem`]: snapshot listing, streaming comparison, extension renames
//! - [`scan`]: one depth-first normalization pass, producing a [`ScanResult`]
//! - [`metadata`]: dist-info/egg-info merging with deterministic output
//! - [`relocate`]: cross-version folding into the shared site directory
//!
//! The caller owns the package tree exclusively while a pass runs. Per-file
//! filesystem failures are logged and skipped; malformed metadata aborts the
//! pass with an [`Error`].

pub mod classify;
pub mod config;
mod error;
pub mod filesystem;
pub mod hash;
pub mod interpreter;
pub mod metadata;
pub mod relocate;
pub mod scan;
pub mod version;

pub use classify::{DirRole, PathClassifier};
pub use config::Options;
pub use error::{Error, Result};
pub use interpreter::{Implementation, Interpreter, ShebangRecord, ShebangRewriter};
pub use relocate::{MergeConflict, RelocationReport, Relocator, Resolution};
pub use scan::{ScanResult, ScanStats, Scanner};
pub use version::{parse_version_list, Version};

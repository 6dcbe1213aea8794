// src/scan/mod.rs

//! Staged tree scanning
//!
//! The [`Scanner`] makes one depth-first pass over a package tree and, per
//! directory role:
//!
//! - **Public** site directories: records versions, strips test suites and
//!   byte-compiled files, renames binary extensions to tagged names
//! - **Private** directories: same file handling, statistics kept per root
//! - **Bin** directories: collects interpreter shebangs
//! - **Metadata** directories: normalizes names, drops license copies,
//!   indexes requirement files
//!
//! Everything learned is collected into a [`ScanResult`].

mod result;
mod scanner;

pub use result::{ScanResult, ScanStats};
pub use scanner::Scanner;

// tests/common/mod.rs

//! Shared helpers for integration tests: staged package trees in temp dirs.

#![allow(dead_code)]

use sitefold::{Implementation, Interpreter, PathClassifier, Version};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

pub const ARCH: &str = "x86_64-linux-gnu";
pub const PACKAGE: &str = "python3-foo";

/// A staged package tree under a temporary directory
///
/// Keep the value alive for as long as the tree is used.
pub struct Staging {
    _temp: TempDir,
    pub root: PathBuf,
}

impl Staging {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join(PACKAGE);
        fs::create_dir(&root).unwrap();
        Self { _temp: temp, root }
    }

    /// Write `content` to `rel`, creating parent directories
    pub fn touch(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn mkdir(&self, rel: &str) -> PathBuf {
        let path = self.root.join(rel);
        fs::create_dir_all(&path).unwrap();
        path
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root.join(rel)).unwrap()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.root.join(rel).symlink_metadata().is_ok()
    }

    pub fn interpreter(&self) -> Interpreter {
        Interpreter::new(Implementation::CPython3, ARCH)
            .with_default_version(Some(Version::new(3, 12)))
    }

    pub fn classifier(&self) -> PathClassifier {
        PathClassifier::new(&self.root, "foo", Implementation::CPython3)
    }

    /// Every entry below the root, keyed by relative path
    ///
    /// Files map to their content, directories to `<dir>`, symlinks to
    /// `-> target`.
    pub fn listing(&self) -> BTreeMap<String, String> {
        WalkDir::new(&self.root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .map(|entry| {
                let entry = entry.unwrap();
                let rel = entry
                    .path()
                    .strip_prefix(&self.root)
                    .unwrap()
                    .to_string_lossy()
                    .into_owned();
                let kind = entry.file_type();
                let value = if kind.is_symlink() {
                    format!("-> {}", fs::read_link(entry.path()).unwrap().display())
                } else if kind.is_dir() {
                    "<dir>".to_string()
                } else {
                    String::from_utf8_lossy(&fs::read(entry.path()).unwrap()).into_owned()
                };
                (rel, value)
            })
            .collect()
    }

    /// Files only, relative to `dir`
    pub fn files_under(&self, dir: &str) -> Vec<String> {
        let base = self.root.join(dir);
        if !base.exists() {
            return Vec::new();
        }
        WalkDir::new(&base)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| !e.file_type().is_dir())
            .map(|e| rel_to(&base, e.path()))
            .collect()
    }
}

fn rel_to(base: &Path, path: &Path) -> String {
    path.strip_prefix(base).unwrap().to_string_lossy().into_owned()
}

// src/config.rs

//! Run options
//!
//! Options come from an optional TOML file and are then overridden by
//! command-line flags. Every key is optional:
//!
//! ```toml
//! no_ext_rename = false
//! no_shebang_rewrite = false
//! debug = false
//! verbose = true
//! ignore = ["**/_build", "usr/share/doc/**"]
//! private_dirs = ["usr/lib/{package}", "opt/{package}"]
//! multiarch = "x86_64-linux-gnu"
//! default_version = "3.12"
//! implementation = "cpython3"
//! ```

use crate::classify::PathClassifier;
use crate::error::{Error, Result};
use crate::interpreter::{Implementation, Interpreter};
use crate::version::Version;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Options for scanning and relocating one package tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Leave binary extension names alone
    pub no_ext_rename: bool,
    /// Do not hand scripts to the shebang rewriter
    pub no_shebang_rewrite: bool,
    /// Treat the package as a debug build
    pub debug: bool,
    /// Print diffs for unresolved merge conflicts
    pub verbose: bool,
    /// Glob patterns for directories the scanner skips, relative to the package root
    pub ignore: Vec<String>,
    /// Replacement private-directory templates (`{package}` is substituted)
    pub private_dirs: Option<Vec<String>>,
    /// Host multiarch triplet
    pub multiarch: Option<String>,
    /// Version for files whose location carries none
    pub default_version: Option<Version>,
    pub implementation: Implementation,
}

impl Options {
    /// Load options from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Interpreter context described by these options
    pub fn interpreter(&self) -> Interpreter {
        let multiarch = Interpreter::resolve_multiarch(self.multiarch.as_deref());
        Interpreter::new(self.implementation, multiarch)
            .with_default_version(self.default_version)
            .with_debug(self.debug)
    }

    /// Use the highest of `versions` when no default version is set
    pub fn fill_default_version(&mut self, versions: &[Version]) {
        if self.default_version.is_none() {
            self.default_version = versions.iter().max().copied();
        }
    }

    /// Classifier for the package staged at `root`
    pub fn classifier(&self, root: impl Into<PathBuf>, package: &str) -> PathClassifier {
        match &self.private_dirs {
            Some(templates) => PathClassifier::with_private_dirs(
                root,
                package,
                self.implementation,
                templates.as_slice(),
            ),
            None => PathClassifier::new(root, package, self.implementation),
        }
    }

    /// Compile the ignore patterns
    pub fn ignore_patterns(&self) -> Result<Vec<glob::Pattern>> {
        self.ignore
            .iter()
            .map(|pattern| {
                glob::Pattern::new(pattern).map_err(|source| Error::IgnorePattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_partial_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sitefold.toml");
        fs::write(
            &path,
            "no_ext_rename = true\ndefault_version = \"3.12\"\nimplementation = \"pypy3\"\n",
        )
        .unwrap();

        let options = Options::load(&path).unwrap();
        assert!(options.no_ext_rename);
        assert!(!options.verbose);
        assert_eq!(options.default_version, Some(Version::new(3, 12)));
        assert_eq!(options.implementation, Implementation::PyPy3);
        assert!(options.ignore.is_empty());
    }

    #[test]
    fn test_load_rejects_unknown_keys() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        fs::write(&path, "no_such_option = 1\n").unwrap();
        assert!(matches!(Options::load(&path), Err(Error::Config { .. })));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            Options::load(&temp.path().join("absent.toml")),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_interpreter_from_options() {
        let options = Options {
            multiarch: Some("riscv64-linux-gnu".to_string()),
            debug: true,
            default_version: Some(Version::new(3, 11)),
            ..Default::default()
        };
        let interp = options.interpreter();
        assert_eq!(interp.multiarch, "riscv64-linux-gnu");
        assert!(interp.debug);
        assert_eq!(interp.default_version, Some(Version::new(3, 11)));
    }

    #[test]
    fn test_default_version_from_versions() {
        let mut options = Options::default();
        options.fill_default_version(&[Version::new(3, 12), Version::new(3, 11)]);
        assert_eq!(options.default_version, Some(Version::new(3, 12)));

        // an explicit default is never replaced
        let mut options = Options {
            default_version: Some(Version::new(3, 11)),
            ..Default::default()
        };
        options.fill_default_version(&[Version::new(3, 13)]);
        assert_eq!(options.default_version, Some(Version::new(3, 11)));

        let mut options = Options::default();
        options.fill_default_version(&[]);
        assert_eq!(options.default_version, None);
    }

    #[test]
    fn test_custom_private_dirs() {
        let options = Options {
            private_dirs: Some(vec!["opt/{package}".to_string()]),
            ..Default::default()
        };
        let classifier = options.classifier("/pkg", "foo");
        assert_eq!(
            classifier.private_root(Path::new("/pkg/opt/foo/lib")),
            Some(PathBuf::from("/pkg/opt/foo"))
        );
    }

    #[test]
    fn test_bad_ignore_pattern() {
        let options = Options {
            ignore: vec!["a/***".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            options.ignore_patterns(),
            Err(Error::IgnorePattern { .. })
        ));
    }
}

// src/classify/classifier.rs

//! Directory role classification based on path shape
//!
//! Roles are never stored: they are recomputed from the path wherever they
//! are needed, so a rename or move can never leave a stale classification
//! behind. Order of checks matters - more specific rules come first.

use crate::interpreter::Implementation;
use crate::version::Version;
use regex::Regex;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

/// Private library locations, `{package}` is replaced by the package name
pub const DEFAULT_PRIVATE_DIRS: &[&str] = &[
    "usr/lib/{package}",
    "usr/lib/games/{package}",
    "usr/share/{package}",
    "usr/share/games/{package}",
];

/// Suffixes of directories searched for executables
const BIN_SUFFIXES: &[&str] = &["/bin", "/sbin", "/usr/games"];

/// Bin directories deeper than this below the package root are ignored
const MAX_BIN_DEPTH: usize = 4;

static PLATFORM_LIB_DIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/(?:usr/)?lib/[a-z0-9_]+-(?:linux|kfreebsd|hurd)-gnu[a-z0-9_]*(?:/|$)")
        .expect("valid regex")
});

/// Role of a directory inside a staged package tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirRole {
    /// Public site-library location, versioned or version-agnostic
    Public { version: Option<Version> },
    /// Inside an application-private library directory rooted at `root`
    Private { root: PathBuf },
    /// Executable search-path directory
    Bin,
    /// `*.dist-info` metadata directory
    DistInfo,
    /// `*.egg-info` metadata directory
    EggInfo,
    /// Anything else
    Ordinary,
}

impl DirRole {
    pub fn is_public(&self) -> bool {
        matches!(self, Self::Public { .. })
    }

    pub fn is_metadata(&self) -> bool {
        matches!(self, Self::DistInfo | Self::EggInfo)
    }

    /// Version carried by a public directory path, if any
    pub fn public_version(&self) -> Option<Version> {
        match self {
            Self::Public { version } => *version,
            _ => None,
        }
    }
}

impl fmt::Display for DirRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public { version: Some(v) } => write!(f, "public({})", v),
            Self::Public { version: None } => write!(f, "public"),
            Self::Private { root } => write!(f, "private({})", root.display()),
            Self::Bin => write!(f, "bin"),
            Self::DistInfo => write!(f, "dist-info"),
            Self::EggInfo => write!(f, "egg-info"),
            Self::Ordinary => write!(f, "ordinary"),
        }
    }
}

/// Classifies directories of one package tree
#[derive(Debug, Clone)]
pub struct PathClassifier {
    /// Package staging root (e.g. `debian/python3-foo`)
    root: PathBuf,
    implementation: Implementation,
    /// Package-relative private prefixes, without leading slash
    private_dirs: Vec<String>,
}

impl PathClassifier {
    /// Create a classifier with the default private-directory templates
    pub fn new(root: impl Into<PathBuf>, package: &str, implementation: Implementation) -> Self {
        Self::with_private_dirs(root, package, implementation, DEFAULT_PRIVATE_DIRS)
    }

    /// Create a classifier with custom private-directory templates
    pub fn with_private_dirs<S: AsRef<str>>(
        root: impl Into<PathBuf>,
        package: &str,
        implementation: Implementation,
        templates: &[S],
    ) -> Self {
        let private_dirs = templates
            .iter()
            .map(|t| {
                t.as_ref()
                    .replace("{package}", package)
                    .trim_matches('/')
                    .to_string()
            })
            .filter(|t| !t.is_empty())
            .collect();

        Self {
            root: root.into(),
            implementation,
            private_dirs,
        }
    }

    /// Package staging root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path relative to the package root, as an installed path (`/usr/...`)
    ///
    /// Returns `None` for paths outside the package root.
    pub fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let mut out = String::new();
        for component in rel.components() {
            match component {
                Component::Normal(c) => {
                    out.push('/');
                    out.push_str(&c.to_string_lossy());
                }
                Component::CurDir => {}
                _ => return None,
            }
        }
        if out.is_empty() {
            out.push('/');
        }
        Some(out)
    }

    /// Classify a directory
    pub fn classify(&self, path: &Path) -> DirRole {
        let Some(rel) = self.relative(path) else {
            return DirRole::Ordinary;
        };

        // 1. Private library directories
        if let Some(root) = self.private_root_rel(&rel) {
            return DirRole::Private { root };
        }

        // 2. Public site directories
        if let Some(version) = self.implementation.parse_public_dir(&rel) {
            return DirRole::Public { version };
        }

        // 3. Executable search path
        if Self::is_bin_dir(&rel) {
            return DirRole::Bin;
        }

        // 4. Distribution metadata
        if let Some(role) = Self::metadata_role_of(&rel) {
            return role;
        }

        DirRole::Ordinary
    }

    /// Private root containing `path`, if any
    pub fn private_root(&self, path: &Path) -> Option<PathBuf> {
        let rel = self.relative(path)?;
        self.private_root_rel(&rel)
    }

    fn private_root_rel(&self, rel: &str) -> Option<PathBuf> {
        let rel = rel.trim_start_matches('/');
        self.private_dirs
            .iter()
            .find(|prefix| {
                rel == prefix.as_str()
                    || rel
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .map(|prefix| self.root.join(prefix))
    }

    /// Metadata role of a directory regardless of its location role
    ///
    /// Metadata directories live inside public or private locations, so
    /// [`Self::classify`] reports the location; this reports the directory
    /// kind itself.
    pub fn metadata_role(&self, path: &Path) -> Option<DirRole> {
        let name = path.file_name()?.to_string_lossy();
        Self::metadata_role_of(&name)
    }

    fn metadata_role_of(name: &str) -> Option<DirRole> {
        if name.ends_with(".dist-info") {
            Some(DirRole::DistInfo)
        } else if name.ends_with(".egg-info") {
            Some(DirRole::EggInfo)
        } else {
            None
        }
    }

    /// Check if a package-relative directory is on the executable search path
    pub fn is_bin_dir(rel: &str) -> bool {
        let depth = rel.split('/').filter(|s| !s.is_empty()).count();
        if depth > MAX_BIN_DEPTH {
            return false;
        }
        BIN_SUFFIXES.iter().any(|s| rel.ends_with(s))
    }

    /// Check if a file lives in a platform-owned multiarch library directory
    pub fn is_platform_lib(&self, path: &Path) -> bool {
        self.relative(path)
            .is_some_and(|rel| PLATFORM_LIB_DIR.is_match(&rel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PathClassifier {
        PathClassifier::new("/build/debian/foo", "foo", Implementation::CPython3)
    }

    fn at(rel: &str) -> PathBuf {
        Path::new("/build/debian/foo").join(rel)
    }

    // ===================
    // Public
    // ===================

    #[test]
    fn test_classify_public_versioned() {
        assert_eq!(
            classifier().classify(&at("usr/lib/python3.11/site-packages")),
            DirRole::Public {
                version: Some(Version::new(3, 11))
            }
        );
        assert_eq!(
            classifier().classify(&at("usr/lib/python3.11/site-packages/foo/sub")),
            DirRole::Public {
                version: Some(Version::new(3, 11))
            }
        );
    }

    #[test]
    fn test_classify_public_unversioned() {
        assert_eq!(
            classifier().classify(&at("usr/lib/python3/dist-packages")),
            DirRole::Public { version: None }
        );
    }

    #[test]
    fn test_metadata_dir_inside_public_reports_location() {
        let c = classifier();
        let dist = at("usr/lib/python3/dist-packages/foo-1.0.dist-info");
        assert!(c.classify(&dist).is_public());
        assert_eq!(c.metadata_role(&dist), Some(DirRole::DistInfo));
    }

    // ===================
    // Private
    // ===================

    #[test]
    fn test_classify_private() {
        let c = classifier();
        assert_eq!(
            c.classify(&at("usr/share/foo/lib")),
            DirRole::Private {
                root: at("usr/share/foo")
            }
        );
        assert_eq!(
            c.classify(&at("usr/lib/foo")),
            DirRole::Private {
                root: at("usr/lib/foo")
            }
        );
    }

    #[test]
    fn test_private_prefix_is_component_aware() {
        let c = classifier();
        assert_eq!(c.classify(&at("usr/share/foobar")), DirRole::Ordinary);
        assert_eq!(c.private_root(&at("usr/share/foobar/x")), None);
    }

    #[test]
    fn test_custom_private_dirs() {
        let c = PathClassifier::with_private_dirs(
            "/build/debian/foo",
            "foo",
            Implementation::CPython3,
            &["/opt/{package}/"],
        );
        assert_eq!(
            c.private_root(&at("opt/foo/lib")),
            Some(at("opt/foo"))
        );
        assert_eq!(c.private_root(&at("usr/share/foo")), None);
    }

    // ===================
    // Bin
    // ===================

    #[test]
    fn test_classify_bin() {
        let c = classifier();
        assert_eq!(c.classify(&at("usr/bin")), DirRole::Bin);
        assert_eq!(c.classify(&at("usr/sbin")), DirRole::Bin);
        assert_eq!(c.classify(&at("bin")), DirRole::Bin);
        assert_eq!(c.classify(&at("sbin")), DirRole::Bin);
        assert_eq!(c.classify(&at("usr/games")), DirRole::Bin);
        assert_eq!(c.classify(&at("usr/local/bin")), DirRole::Bin);
    }

    #[test]
    fn test_deep_bin_is_ordinary() {
        let c = classifier();
        assert_eq!(c.classify(&at("opt/vendor/tool/x/bin")), DirRole::Ordinary);
        assert_eq!(c.classify(&at("usr/bin/extra")), DirRole::Ordinary);
    }

    // ===================
    // Metadata and ordinary
    // ===================

    #[test]
    fn test_classify_metadata_outside_site_dirs() {
        let c = classifier();
        assert_eq!(c.classify(&at("opt/foo-1.0.dist-info")), DirRole::DistInfo);
        assert_eq!(c.classify(&at("opt/foo.egg-info")), DirRole::EggInfo);
    }

    #[test]
    fn test_classify_ordinary() {
        let c = classifier();
        assert_eq!(c.classify(&at("usr/share/doc/foo")), DirRole::Ordinary);
        assert_eq!(c.classify(Path::new("/elsewhere")), DirRole::Ordinary);
        assert_eq!(c.classify(&at("")), DirRole::Ordinary);
    }

    #[test]
    fn test_relative() {
        let c = classifier();
        assert_eq!(c.relative(&at("usr/bin")).as_deref(), Some("/usr/bin"));
        assert_eq!(c.relative(&at("")).as_deref(), Some("/"));
        assert_eq!(c.relative(Path::new("/tmp")), None);
    }

    #[test]
    fn test_platform_lib() {
        let c = classifier();
        assert!(c.is_platform_lib(&at("usr/lib/x86_64-linux-gnu/libfoo.so")));
        assert!(c.is_platform_lib(&at("lib/i386-kfreebsd-gnu/foo.so")));
        assert!(!c.is_platform_lib(&at("usr/lib/python3/dist-packages/foo.so")));
    }

    #[test]
    fn test_display() {
        assert_eq!(DirRole::Bin.to_string(), "bin");
        assert_eq!(
            DirRole::Public {
                version: Some(Version::new(3, 12))
            }
            .to_string(),
            "public(3.12)"
        );
    }
}

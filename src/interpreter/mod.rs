// src/interpreter/mod.rs

//! Interpreter context for a build pass
//!
//! An [`Interpreter`] bundles everything the scanner and relocator need to
//! know about the active Python implementation: which site directories are
//! public, which version-specific ones get folded into the shared location,
//! and how binary extensions are tagged for this ABI and architecture.
//!
//! The context is immutable and passed by reference down every recursive call.

mod extension;
mod shebang;

pub use extension::{ExtensionName, ExtensionTag};
pub use shebang::{NoopRewriter, ShebangRecord, ShebangRewriter};

use crate::version::Version;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Environment variable consulted for the host multiarch triplet
pub const MULTIARCH_ENV: &str = "DEB_HOST_MULTIARCH";

static CPYTHON_PUBLIC_DIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/usr/(?:lib/debug/usr/)?(?:local/)?lib/python(3(?:\.\d+)?)/(?:site|dist)-packages(?:/|$)")
        .expect("valid regex")
});

static PYPY_PUBLIC_DIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/usr/(?:lib/debug/usr/)?(?:local/)?lib/pypy(3(?:\.\d+)?)/(?:site|dist)-packages(?:/|$)")
        .expect("valid regex")
});

/// Supported interpreter implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Implementation {
    #[default]
    CPython3,
    PyPy3,
}

impl Implementation {
    /// Directory-name stem (`python` or `pypy`)
    pub fn dir_stem(&self) -> &'static str {
        match self {
            Self::CPython3 => "python",
            Self::PyPy3 => "pypy",
        }
    }

    /// Parse an implementation name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cpython3" | "python3" | "cpython" => Some(Self::CPython3),
            "pypy3" | "pypy" => Some(Self::PyPy3),
            _ => None,
        }
    }

    /// Classify a package-relative path (`/usr/lib/...`) as a public site dir
    ///
    /// Returns `Some(Some(version))` for a versioned public directory,
    /// `Some(None)` for the version-agnostic shared one and `None` when the
    /// path is not under a public site directory at all.
    pub fn parse_public_dir(&self, relative: &str) -> Option<Option<Version>> {
        let re: &Regex = match self {
            Self::CPython3 => &CPYTHON_PUBLIC_DIR,
            Self::PyPy3 => &PYPY_PUBLIC_DIR,
        };
        let caps = re.captures(relative)?;
        let raw = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        Some(Version::parse(raw).ok().filter(Version::is_complete))
    }
}

impl fmt::Display for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CPython3 => write!(f, "cpython3"),
            Self::PyPy3 => write!(f, "pypy3"),
        }
    }
}

/// The active interpreter context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    pub implementation: Implementation,
    /// Version used for files whose location carries none
    pub default_version: Option<Version>,
    /// Host multiarch triplet, e.g. `x86_64-linux-gnu`
    pub multiarch: String,
    /// Produce debug-build extension names
    pub debug: bool,
}

impl Interpreter {
    pub fn new(implementation: Implementation, multiarch: impl Into<String>) -> Self {
        Self {
            implementation,
            default_version: None,
            multiarch: multiarch.into(),
            debug: false,
        }
    }

    pub fn with_default_version(mut self, version: Option<Version>) -> Self {
        self.default_version = version;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Resolve the host multiarch triplet
    ///
    /// An explicit value wins, then `DEB_HOST_MULTIARCH`, then a triplet
    /// derived from the architecture this binary was built for.
    pub fn resolve_multiarch(explicit: Option<&str>) -> String {
        if let Some(triplet) = explicit.filter(|t| !t.is_empty()) {
            return triplet.to_string();
        }
        match std::env::var(MULTIARCH_ENV) {
            Ok(triplet) if !triplet.is_empty() => triplet,
            _ => format!("{}-linux-gnu", std::env::consts::ARCH),
        }
    }

    /// SOABI string for `version` (e.g. `cpython-311`, `cpython-37m`)
    pub fn soabi(&self, version: Version) -> String {
        match self.implementation {
            Implementation::CPython3 => {
                let flags = match (version.at_least(3, 8), self.debug) {
                    (true, true) => "d",
                    (true, false) => "",
                    (false, true) => "dm",
                    (false, false) => "m",
                };
                format!("cpython-{}{}", version.abi_digits(), flags)
            }
            Implementation::PyPy3 => format!("pypy{}-pp73", version.abi_digits()),
        }
    }

    /// Extension tag for `version` in this context
    pub fn extension_tag(&self, version: Version) -> ExtensionTag {
        ExtensionTag {
            implementation: self.implementation,
            abi: self.soabi(version),
            multiarch: self.multiarch.clone(),
            debug: self.debug,
            version,
        }
    }

    /// Canonical tagged name for an extension file, if it should be renamed
    ///
    /// `file_name` may carry leading directories; they are preserved in the
    /// result. `version` is the version implied by the file's location; when
    /// absent the context default is used. Returns `None` when the file is
    /// not an extension, is already correctly named, or renaming it would be
    /// unsafe (stable ABI, foreign SOABI, fully tagged for another arch).
    pub fn check_extname(&self, file_name: &str, version: Option<Version>) -> Option<String> {
        let (dir, name) = match file_name.rsplit_once('/') {
            Some((dir, name)) => (Some(dir), name),
            None => (None, file_name),
        };

        let info = ExtensionName::parse(name)?;
        let mut version = version.or(self.default_version)?;
        if !version.is_complete() {
            version = info.version?;
        }

        let tag = self.extension_tag(version);
        let new_name = tag.canonical_name(&info)?;
        if new_name == name {
            return None;
        }

        Some(match dir {
            Some(dir) => format!("{}/{}", dir, new_name),
            None => new_name,
        })
    }

    /// See [`Implementation::parse_public_dir`]
    pub fn parse_public_dir(&self, relative: &str) -> Option<Option<Version>> {
        self.implementation.parse_public_dir(relative)
    }

    /// Canonical shared site directory inside `root`
    pub fn sitedir(&self, root: &Path, debug_symbols: bool) -> PathBuf {
        let base = root.to_path_buf();
        let base = if debug_symbols {
            base.join("usr/lib/debug")
        } else {
            base
        };
        base.join(format!(
            "usr/lib/{}3/dist-packages",
            self.implementation.dir_stem()
        ))
    }

    /// Version-specific site directories folded into [`Self::sitedir`]
    pub fn old_sitedirs(&self, root: &Path, version: Version, debug_symbols: bool) -> Vec<PathBuf> {
        let stem = self.implementation.dir_stem();
        let mut relative = vec![
            format!("usr/lib/{stem}3/site-packages"),
            format!("usr/lib/{stem}{version}/site-packages"),
            format!("usr/lib/{stem}{version}/dist-packages"),
        ];
        if !debug_symbols {
            relative.push(format!("usr/local/lib/{stem}{version}/site-packages"));
            relative.push(format!("usr/local/lib/{stem}{version}/dist-packages"));
        }

        let base = if debug_symbols {
            root.join("usr/lib/debug")
        } else {
            root.to_path_buf()
        };
        relative.into_iter().map(|rel| base.join(rel)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpython() -> Interpreter {
        Interpreter::new(Implementation::CPython3, "MYARCH")
    }

    #[test]
    fn test_soabi_flags() {
        let i = cpython();
        assert_eq!(i.soabi(Version::new(3, 11)), "cpython-311");
        assert_eq!(i.soabi(Version::new(3, 4)), "cpython-34m");
        let dbg = cpython().with_debug(true);
        assert_eq!(dbg.soabi(Version::new(3, 4)), "cpython-34dm");
        assert_eq!(dbg.soabi(Version::new(3, 12)), "cpython-312d");

        let pypy = Interpreter::new(Implementation::PyPy3, "MYARCH");
        assert_eq!(pypy.soabi(Version::new(3, 9)), "pypy39-pp73");
    }

    #[test]
    fn test_check_extname_python34() {
        let i = cpython().with_default_version(Some(Version::new(3, 4)));
        assert_eq!(
            i.check_extname("foo.so", None).as_deref(),
            Some("foo.cpython-34m-MYARCH.so")
        );
        // different version
        assert_eq!(i.check_extname("foo.cpython-32m.so", None), None);
        // different architecture
        assert_eq!(i.check_extname("foo.cpython-34m-OTHER.so", None), None);
        assert_eq!(
            i.check_extname("foo.cpython-34m.so", None).as_deref(),
            Some("foo.cpython-34m-MYARCH.so")
        );
        assert_eq!(i.check_extname("foo.abi3.so", None), None);
        assert_eq!(
            i.check_extname("foo/bar/bazmodule.so", None).as_deref(),
            Some("foo/bar/baz.cpython-34m-MYARCH.so")
        );
    }

    #[test]
    fn test_check_extname_python34_debug() {
        let i = cpython()
            .with_default_version(Some(Version::new(3, 4)))
            .with_debug(true);
        assert_eq!(
            i.check_extname("foo.so", None).as_deref(),
            Some("foo.cpython-34dm-MYARCH.so")
        );
        assert_eq!(i.check_extname("foo.cpython-34m-OTHER.so", None), None);
        assert_eq!(
            i.check_extname("foo/bar/bazmodule.so", None).as_deref(),
            Some("foo/bar/baz.cpython-34dm-MYARCH.so")
        );
    }

    #[test]
    fn test_check_extname_location_version_wins() {
        let i = cpython().with_default_version(Some(Version::new(3, 11)));
        assert_eq!(
            i.check_extname("foo.so", Some(Version::new(3, 12))).as_deref(),
            Some("foo.cpython-312-MYARCH.so")
        );
    }

    #[test]
    fn test_check_extname_without_any_version() {
        let i = cpython();
        assert_eq!(i.check_extname("foo.so", None), None);
        // major-only location version, no SOABI in the name
        assert_eq!(i.check_extname("foo.so", Some(Version::major_only(3))), None);
        // major-only location version, SOABI supplies the minor
        assert_eq!(
            i.check_extname("foo.cpython-311.so", Some(Version::major_only(3)))
                .as_deref(),
            Some("foo.cpython-311-MYARCH.so")
        );
    }

    #[test]
    fn test_check_extname_dotted_module_name() {
        let i = cpython().with_default_version(Some(Version::new(3, 12)));
        assert_eq!(
            i.check_extname("foo.bar.so", None).as_deref(),
            Some("foo.bar.cpython-312-MYARCH.so")
        );
        // a real triplet is still taken as the multiarch tag
        assert_eq!(
            i.check_extname("foo.aarch64-linux-gnu.so", None).as_deref(),
            Some("foo.cpython-312-aarch64-linux-gnu.so")
        );
    }

    #[test]
    fn test_check_extname_already_canonical() {
        let i = cpython().with_default_version(Some(Version::new(3, 11)));
        assert_eq!(i.check_extname("foo.cpython-311-MYARCH.so", None), None);
        assert_eq!(i.check_extname("libfoo.so.1", None), None);
        assert_eq!(i.check_extname("foo.py", None), None);
    }

    #[test]
    fn test_parse_public_dir() {
        let i = cpython();
        assert_eq!(
            i.parse_public_dir("/usr/lib/python3.11/site-packages"),
            Some(Some(Version::new(3, 11)))
        );
        assert_eq!(
            i.parse_public_dir("/usr/lib/python3.11/dist-packages/foo/bar"),
            Some(Some(Version::new(3, 11)))
        );
        assert_eq!(i.parse_public_dir("/usr/lib/python3/dist-packages"), Some(None));
        assert_eq!(
            i.parse_public_dir("/usr/local/lib/python3.12/dist-packages"),
            Some(Some(Version::new(3, 12)))
        );
        assert_eq!(
            i.parse_public_dir("/usr/lib/debug/usr/lib/python3.11/site-packages"),
            Some(Some(Version::new(3, 11)))
        );
        assert_eq!(i.parse_public_dir("/usr/lib/python3.11"), None);
        assert_eq!(i.parse_public_dir("/usr/lib/python3/dist-packages-extra"), None);
        assert_eq!(i.parse_public_dir("/usr/share/foo"), None);
    }

    #[test]
    fn test_sitedirs() {
        let i = cpython();
        let root = Path::new("/build/debian/python3-foo");
        assert_eq!(
            i.sitedir(root, false),
            PathBuf::from("/build/debian/python3-foo/usr/lib/python3/dist-packages")
        );
        assert_eq!(
            i.sitedir(root, true),
            PathBuf::from("/build/debian/python3-foo/usr/lib/debug/usr/lib/python3/dist-packages")
        );

        let old = i.old_sitedirs(root, Version::new(3, 11), false);
        assert!(old.contains(&root.join("usr/lib/python3.11/site-packages")));
        assert!(old.contains(&root.join("usr/local/lib/python3.11/dist-packages")));
        assert!(old.contains(&root.join("usr/lib/python3/site-packages")));
        assert!(!old.contains(&i.sitedir(root, false)));

        let old_dbg = i.old_sitedirs(root, Version::new(3, 11), true);
        assert!(old_dbg.contains(&root.join("usr/lib/debug/usr/lib/python3.11/dist-packages")));
    }

    #[test]
    fn test_resolve_multiarch_explicit() {
        assert_eq!(
            Interpreter::resolve_multiarch(Some("aarch64-linux-gnu")),
            "aarch64-linux-gnu"
        );
    }

    #[test]
    fn test_implementation_parse() {
        assert_eq!(Implementation::parse("cpython3"), Some(Implementation::CPython3));
        assert_eq!(Implementation::parse("pypy"), Some(Implementation::PyPy3));
        assert_eq!(Implementation::parse("jython"), None);
    }
}

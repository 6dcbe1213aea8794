// src/interpreter/shebang.rs

//! Script interpreter lines
//!
//! Rewriting shebangs is left to an external collaborator behind the
//! [`ShebangRewriter`] trait. This module only reads what a script currently
//! asks for so the scan result can report it.

use crate::version::Version;
use regex::Regex;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::sync::LazyLock;

/// Longest first line we bother to inspect
const MAX_SHEBANG_LEN: u64 = 512;

static SHEBANG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^#!\s*(?P<path>\S*/)?(?P<env>env\s+(?:-S\s+)?)?(?P<name>python|pypy)(?P<version>\d+(?:\.\d+)?)?(?P<debug>-dbg)?(?P<options>\s.*)?$",
    )
    .expect("valid regex")
});

/// Interpreter requested by a script's `#!` line
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ShebangRecord {
    /// Directory part of the interpreter (or the `env` wrapper)
    pub path: Option<String>,
    /// `python` or `pypy`
    pub name: String,
    pub version: Option<Version>,
    pub debug: bool,
    pub options: Vec<String>,
}

impl ShebangRecord {
    /// Parse a single `#!` line
    ///
    /// Returns `None` for lines that are not shebangs or that name an
    /// interpreter other than python/pypy.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = SHEBANG.captures(line.trim_end())?;

        let mut path = caps.name("path").map(|m| m.as_str().to_string());
        if caps.name("env").is_some() {
            path = Some(format!("{}env", path.unwrap_or_default()));
        }

        Some(Self {
            path,
            name: caps["name"].to_string(),
            version: caps
                .name("version")
                .and_then(|m| Version::parse(m.as_str()).ok()),
            debug: caps.name("debug").is_some(),
            options: caps
                .name("options")
                .map(|m| m.as_str().split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        })
    }

    /// Read and parse the first line of `path`
    pub fn from_file(path: &Path) -> io::Result<Option<Self>> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file.take(MAX_SHEBANG_LEN));
        let mut first = Vec::new();
        reader.read_until(b'\n', &mut first)?;
        if !first.starts_with(b"#!") {
            return Ok(None);
        }
        Ok(Self::parse(&String::from_utf8_lossy(&first)))
    }
}

/// External shebang rewriter
///
/// Implementations rewrite the interpreter line of a single file in place and
/// report whether they changed anything.
pub trait ShebangRewriter {
    fn rewrite(&self, path: &Path) -> io::Result<bool>;
}

/// Rewriter that leaves every file untouched
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRewriter;

impl ShebangRewriter for NoopRewriter {
    fn rewrite(&self, _path: &Path) -> io::Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_versioned_with_options() {
        let rec = ShebangRecord::parse("#! /usr/bin/python3.11 -E -s").unwrap();
        assert_eq!(rec.path.as_deref(), Some("/usr/bin/"));
        assert_eq!(rec.name, "python");
        assert_eq!(rec.version, Some(Version::new(3, 11)));
        assert_eq!(rec.options, vec!["-E".to_string(), "-s".to_string()]);
        assert!(!rec.debug);
    }

    #[test]
    fn test_parse_env_wrapper() {
        let rec = ShebangRecord::parse("#!/usr/bin/env python3\n").unwrap();
        assert_eq!(rec.path.as_deref(), Some("/usr/bin/env"));
        assert_eq!(rec.version, Some(Version::major_only(3)));
        assert!(rec.options.is_empty());
    }

    #[test]
    fn test_parse_pypy_and_debug() {
        let rec = ShebangRecord::parse("#!/usr/bin/pypy3 --foo").unwrap();
        assert_eq!(rec.name, "pypy");
        assert_eq!(rec.options, vec!["--foo".to_string()]);

        let rec = ShebangRecord::parse("#!/usr/bin/python3-dbg").unwrap();
        assert!(rec.debug);
    }

    #[test]
    fn test_parse_ignores_other_interpreters() {
        assert_eq!(ShebangRecord::parse("#!/bin/sh"), None);
        assert_eq!(ShebangRecord::parse("#!/usr/bin/perl -w"), None);
        assert_eq!(ShebangRecord::parse("import sys"), None);
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("tool");
        fs::write(&script, "#!/usr/bin/python3\nprint('hi')\n").unwrap();
        let rec = ShebangRecord::from_file(&script).unwrap().unwrap();
        assert_eq!(rec.name, "python");

        let binary = dir.path().join("blob");
        fs::write(&binary, [0x7f, b'E', b'L', b'F', 0, 1, 2]).unwrap();
        assert_eq!(ShebangRecord::from_file(&binary).unwrap(), None);
    }
}

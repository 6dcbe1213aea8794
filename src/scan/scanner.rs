// src/scan/scanner.rs

//! Package tree scanner

use super::result::{ScanResult, ScanStats};
use crate::classify::{DirRole, PathClassifier};
use crate::config::Options;
use crate::error::{Error, Result};
use crate::filesystem::{
    lexists, remove_file_logged, remove_if_empty, remove_tree_logged, sorted_entries,
    ExtensionRenamer,
};
use crate::interpreter::{ExtensionName, Interpreter, NoopRewriter, ShebangRecord, ShebangRewriter};
use crate::metadata::{clean_egg_name, is_license_file, remove_manifest_entries, MetadataFile};
use crate::version::Version;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Byte-compilation cache directory name
const CACHE_DIR: &str = "__pycache__";

/// Directories never shipped directly under a public site directory
const TEST_DIRS: &[&str] = &["test", "tests"];

/// Subdirectory holding license files in newer dist-info layouts
const LICENSE_DIR: &str = "licenses";

type IgnoreFn<'a> = Box<dyn Fn(&Path) -> bool + 'a>;

/// Walks one staged package tree, normalizing it in place
///
/// The walk is depth-first with each directory snapshotted before any of its
/// entries are touched. Files are handled in byte order of their names.
pub struct Scanner<'a> {
    interpreter: &'a Interpreter,
    classifier: &'a PathClassifier,
    rename_ext: bool,
    rewriter: Option<&'a dyn ShebangRewriter>,
    ignore: Vec<glob::Pattern>,
    ignore_fn: Option<IgnoreFn<'a>>,
}

impl<'a> Scanner<'a> {
    /// Create a scanner with renaming on and the no-op shebang rewriter
    pub fn new(interpreter: &'a Interpreter, classifier: &'a PathClassifier) -> Self {
        Self {
            interpreter,
            classifier,
            rename_ext: true,
            rewriter: Some(&NoopRewriter),
            ignore: Vec::new(),
            ignore_fn: None,
        }
    }

    /// Create a scanner configured from run options
    pub fn from_options(
        interpreter: &'a Interpreter,
        classifier: &'a PathClassifier,
        options: &Options,
    ) -> Result<Self> {
        let mut scanner = Self::new(interpreter, classifier)
            .with_ext_rename(!options.no_ext_rename)
            .with_ignore_patterns(options.ignore_patterns()?);
        if options.no_shebang_rewrite {
            scanner.rewriter = None;
        }
        Ok(scanner)
    }

    pub fn with_ext_rename(mut self, enabled: bool) -> Self {
        self.rename_ext = enabled;
        self
    }

    /// Use `rewriter` for scripts; `None` only records existing shebangs
    pub fn with_rewriter(mut self, rewriter: Option<&'a dyn ShebangRewriter>) -> Self {
        self.rewriter = rewriter;
        self
    }

    pub fn with_ignore_patterns(mut self, patterns: Vec<glob::Pattern>) -> Self {
        self.ignore = patterns;
        self
    }

    /// Skip directories for which `predicate` returns true
    pub fn with_ignore_fn(mut self, predicate: impl Fn(&Path) -> bool + 'a) -> Self {
        self.ignore_fn = Some(Box::new(predicate));
        self
    }

    /// Scan the whole package tree
    pub fn scan(&self) -> Result<ScanResult> {
        let root = self.classifier.root();
        if !root.is_dir() {
            return Err(Error::InvalidPath(format!(
                "package directory {} does not exist",
                root.display()
            )));
        }

        info!("Scanning {}", root.display());
        let mut result = ScanResult::default();
        self.visit_dir(root, &mut result)?;
        Ok(result)
    }

    fn is_ignored(&self, dir: &Path) -> bool {
        if self.ignore_fn.as_ref().is_some_and(|f| f(dir)) {
            return true;
        }
        let Some(rel) = self.classifier.relative(dir) else {
            return false;
        };
        let rel = rel.trim_start_matches('/');
        self.ignore.iter().any(|p| p.matches(rel))
    }

    fn visit_dir(&self, dir: &Path, result: &mut ScanResult) -> Result<()> {
        let role = self.classifier.classify(dir);
        let scope = match &role {
            DirRole::Private { root } => Some(root.clone()),
            _ => None,
        };
        debug!("Visiting {} ({})", dir.display(), role);

        if let Some(kind) = self.classifier.metadata_role(dir)
            && (role.is_public() || scope.is_some() || role.is_metadata())
        {
            let bucket = result.bucket_mut(scope.as_deref());
            return self.handle_metadata_dir(dir, &kind, bucket);
        }

        let mut snapshot = match sorted_entries(dir) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Cannot list {}: {}", dir.display(), e);
                return Ok(());
            }
        };

        let bucket = result.bucket_mut(scope.as_deref());
        match &role {
            DirRole::Public { version } => {
                if let Some(v) = version {
                    bucket.public_versions.insert(*v);
                }
                if is_site_root(dir) {
                    snapshot.dirs.retain(|name| !remove_test_dir(dir, name));
                }
                self.handle_files(dir, &snapshot.files, role.public_version(), None, bucket);
            }
            DirRole::Private { root } => {
                self.handle_files(dir, &snapshot.files, None, Some(root.as_path()), bucket);
            }
            DirRole::Bin => self.handle_bin_dir(dir, &snapshot.files, bucket),
            _ => {}
        }

        for name in &snapshot.dirs {
            let child = dir.join(name);
            if name == CACHE_DIR {
                remove_tree_logged(&child);
                continue;
            }
            if self.is_ignored(&child) {
                debug!("Ignoring {}", child.display());
                continue;
            }
            if !child.is_dir() {
                continue;
            }
            self.visit_dir(&child, result)?;
        }

        if dir != self.classifier.root() {
            remove_if_empty(dir);
        }
        Ok(())
    }

    /// Regular files of a public or private directory
    fn handle_files(
        &self,
        dir: &Path,
        files: &[OsString],
        pub_version: Option<Version>,
        private_root: Option<&Path>,
        stats: &mut ScanStats,
    ) {
        for name in files {
            let path = dir.join(name);
            if !lexists(&path) {
                debug!("{} already handled", path.display());
                continue;
            }
            let Some(name) = name.to_str() else {
                warn!("Skipping non-UTF-8 file name {}", path.display());
                continue;
            };

            if is_unwanted(name) {
                remove_file_logged(&path);
                continue;
            }
            if name.ends_with(".egg-info") {
                if let Some(kept) = handle_egg_file(&path) {
                    stats.egg_info.insert(kept);
                }
                continue;
            }

            let is_extension = name.rsplit('.').next() == Some("so");
            if private_root.is_some() && !is_extension && is_executable(&path) {
                self.record_shebang(&path, stats);
            }

            if is_extension {
                self.handle_extension(&path, pub_version, stats);
            } else if name.ends_with(".py") {
                stats.compile = true;
            }
        }
    }

    fn handle_extension(&self, path: &Path, pub_version: Option<Version>, stats: &mut ScanStats) {
        let path = if self.rename_ext {
            ExtensionRenamer::new(self.interpreter, self.classifier)
                .rename(path, pub_version)
                .path()
                .to_path_buf()
        } else {
            path.to_path_buf()
        };

        let version = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(ExtensionName::parse)
            .and_then(|info| info.version)
            .or(pub_version.filter(Version::is_complete));

        match version {
            Some(v) => {
                stats.ext_versions.insert(v);
            }
            None => {
                if self.rename_ext {
                    warn!(
                        "No interpreter version for {}; left untagged (set a default version)",
                        path.display()
                    );
                } else {
                    debug!("No version recoverable for {}", path.display());
                }
                stats.ext_no_version.insert(path);
            }
        }
    }

    fn handle_bin_dir(&self, dir: &Path, files: &[OsString], stats: &mut ScanStats) {
        for name in files {
            let path = dir.join(name);
            if path.is_symlink() || !path.is_file() {
                continue;
            }
            self.record_shebang(&path, stats);
        }
    }

    /// Hand `path` to the rewriter, then record whatever shebang it now has
    fn record_shebang(&self, path: &Path, stats: &mut ScanStats) {
        if let Some(rewriter) = self.rewriter {
            match rewriter.rewrite(path) {
                Ok(true) => info!("Rewrote shebang of {}", path.display()),
                Ok(false) => {}
                Err(e) => warn!("Cannot rewrite shebang of {}: {}", path.display(), e),
            }
        }
        match ShebangRecord::from_file(path) {
            Ok(Some(record)) => {
                stats.shebangs.insert(record);
            }
            Ok(None) => {}
            Err(e) => debug!("Cannot read {}: {}", path.display(), e),
        }
    }

    /// Normalize, clean and index a `.dist-info`/`.egg-info` directory
    fn handle_metadata_dir(&self, dir: &Path, kind: &DirRole, stats: &mut ScanStats) -> Result<()> {
        let dir = match kind {
            DirRole::EggInfo => match normalize_egg_dir(dir)? {
                Some(dir) => dir,
                None => return Ok(()),
            },
            _ => dir.to_path_buf(),
        };

        let snapshot = match sorted_entries(&dir) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Cannot list {}: {}", dir.display(), e);
                return Ok(());
            }
        };

        if *kind == DirRole::DistInfo {
            let mut removed = Vec::new();
            for name in &snapshot.files {
                let name = name.to_string_lossy();
                if is_license_file(&name) && remove_file_logged(&dir.join(name.as_ref())) {
                    removed.push(name.into_owned());
                }
            }
            if snapshot.dirs.iter().any(|d| d == LICENSE_DIR)
                && remove_tree_logged(&dir.join(LICENSE_DIR))
            {
                removed.push(format!("{}/", LICENSE_DIR));
            }
            if !removed.is_empty() {
                info!("Removed license files {:?} from {}", removed, dir.display());
                remove_manifest_entries(&dir, &removed)?;
            }
        }

        index_metadata_dir(&dir, kind, stats);
        Ok(())
    }
}

/// Record the interesting members of a metadata directory
fn index_metadata_dir(dir: &Path, kind: &DirRole, stats: &mut ScanStats) {
    let present = |name: &str| {
        let path = dir.join(name);
        path.is_file().then_some(path)
    };
    match kind {
        DirRole::EggInfo => {
            if let Some(p) = present("requires.txt") {
                stats.requires.insert(p);
            }
            if let Some(p) = present("namespace_packages.txt") {
                stats.namespace_packages.insert(p);
            }
            if let Some(p) = present("PKG-INFO") {
                stats.egg_info.insert(p);
            }
        }
        DirRole::DistInfo => {
            if let Some(p) = present("METADATA") {
                stats.dist_info.insert(p);
            }
        }
        _ => {}
    }
}

/// Strip build decoration from an egg-info directory name
///
/// Returns the directory to continue with, or `None` if it vanished.
fn normalize_egg_dir(dir: &Path) -> Result<Option<PathBuf>> {
    let (Some(parent), Some(name)) = (dir.parent(), dir.file_name().and_then(|n| n.to_str()))
    else {
        return Ok(Some(dir.to_path_buf()));
    };
    let clean = clean_egg_name(name);
    if clean == name {
        return Ok(Some(dir.to_path_buf()));
    }

    let target = parent.join(&clean);
    if target.is_dir() {
        info!("Merging {} into existing {}", dir.display(), target.display());
        merge_metadata_dirs(dir, &target)?;
        return Ok(Some(target));
    }
    if lexists(&target) {
        warn!("Cannot rename {} to {}: path exists", dir.display(), clean);
        return Ok(Some(dir.to_path_buf()));
    }

    match fs::rename(dir, &target) {
        Ok(()) => {
            info!("Renamed {} to {}", dir.display(), clean);
            Ok(Some(target))
        }
        Err(e) => {
            warn!("Cannot rename {} to {}: {}", dir.display(), clean, e);
            Ok(Some(dir.to_path_buf()))
        }
    }
}

/// Fold the members of `src` into `dst`, then delete `src`
fn merge_metadata_dirs(src: &Path, dst: &Path) -> Result<()> {
    let snapshot = sorted_entries(src)?;
    for name in snapshot.files.iter().chain(&snapshot.dirs) {
        let from = src.join(name);
        let to = dst.join(name);
        if !lexists(&to) {
            if let Err(e) = fs::rename(&from, &to) {
                warn!("Cannot move {} to {}: {}", from.display(), to.display(), e);
            }
            continue;
        }
        match MetadataFile::detect(&to) {
            Some(kind) if from.is_file() => kind.merge(&from, &to)?,
            _ => debug!("Keeping existing {}", to.display()),
        }
    }
    remove_tree_logged(src);
    Ok(())
}

/// Rename a distutils `.egg-info` file to its clean name
///
/// When the clean name is already taken the decorated file is dropped.
/// Returns the path under which the metadata now lives.
fn handle_egg_file(path: &Path) -> Option<PathBuf> {
    let parent = path.parent()?;
    let name = path.file_name()?.to_str()?;
    let clean = clean_egg_name(name);
    if clean == name {
        return Some(path.to_path_buf());
    }

    let target = parent.join(&clean);
    if lexists(&target) {
        info!("Removing {} ({} is already available)", path.display(), clean);
        remove_file_logged(path);
        return Some(target);
    }
    match fs::rename(path, &target) {
        Ok(()) => {
            info!("Renamed {} to {}", path.display(), clean);
            Some(target)
        }
        Err(e) => {
            warn!("Cannot rename {} to {}: {}", path.display(), clean, e);
            Some(path.to_path_buf())
        }
    }
}

/// Remove `name` under a site root if it is a test or hidden directory
fn remove_test_dir(site_root: &Path, name: &OsString) -> bool {
    let name_str = name.to_string_lossy();
    if !TEST_DIRS.contains(&name_str.as_ref()) && !name_str.starts_with('.') {
        return false;
    }
    remove_tree_logged(&site_root.join(name))
}

fn is_site_root(dir: &Path) -> bool {
    dir.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n == "site-packages" || n == "dist-packages")
}

fn is_unwanted(name: &str) -> bool {
    name.ends_with(".pyc") || name.ends_with(".pyo")
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    false
}

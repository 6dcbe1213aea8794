// src/metadata/record.rs

//! Manifest (`RECORD`) files
//!
//! Each line is a CSV row `path,hash,size` where `hash` is `algo=digest` and
//! both hash and size may be empty (the manifest lists itself that way).
//! Every rewrite produces sorted, deduplicated lines so independent merges of
//! the same inputs are byte-identical.

use super::lines::{read_lines, write_lines};
use crate::error::{Error, Result};
use crate::hash::digest_file;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

/// Manifest file name inside a dist-info directory
pub const MANIFEST_FILE: &str = "RECORD";
/// Tag-list file name inside a dist-info directory
pub const TAG_LIST_FILE: &str = "WHEEL";

/// One validated manifest line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub path: String,
    pub hash: Option<String>,
    pub size: Option<u64>,
}

impl ManifestEntry {
    /// Parse a manifest line, returning a description of the problem on failure
    pub fn parse(line: &str) -> std::result::Result<Self, String> {
        let (path, rest) = split_path(line)?;
        let fields: Vec<&str> = rest.split(',').collect();
        let [hash, size] = fields.as_slice() else {
            return Err(format!("expected 3 fields, found {}", fields.len() + 1));
        };

        let hash = match *hash {
            "" => None,
            h => match h.split_once('=') {
                Some((algo, digest)) if !algo.is_empty() && !digest.is_empty() => {
                    Some(h.to_string())
                }
                _ => return Err(format!("hash {:?} is not `algo=digest`", h)),
            },
        };
        let size = match *size {
            "" => None,
            s => Some(
                s.parse::<u64>()
                    .map_err(|_| format!("size {:?} is not an integer", s))?,
            ),
        };

        if path.is_empty() {
            return Err("empty path".to_string());
        }
        Ok(Self { path, hash, size })
    }
}

/// Split off the first CSV field, honouring `"..."` quoting with `""` escapes
fn split_path(line: &str) -> std::result::Result<(String, &str), String> {
    let Some(quoted) = line.strip_prefix('"') else {
        return match line.split_once(',') {
            Some((path, rest)) => Ok((path.to_string(), rest)),
            None => Err("expected 3 fields, found 1".to_string()),
        };
    };

    let mut path = String::new();
    let mut chars = quoted.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '"' {
            path.push(c);
            continue;
        }
        if chars.peek().is_some_and(|&(_, next)| next == '"') {
            chars.next();
            path.push('"');
            continue;
        }
        let rest = &quoted[i + 1..];
        return match rest.strip_prefix(',') {
            Some(rest) => Ok((path, rest)),
            None => Err("quoted path not followed by a comma".to_string()),
        };
    }
    Err("unterminated quoted path".to_string())
}

/// Read and validate a manifest, returning its non-blank lines
pub fn read_manifest(path: &Path) -> Result<Vec<(String, ManifestEntry)>> {
    let mut out = Vec::new();
    for (idx, line) in read_lines(path)?.into_iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry = ManifestEntry::parse(&line)
            .map_err(|reason| Error::malformed(path, idx + 1, "manifest", reason))?;
        out.push((line, entry));
    }
    Ok(out)
}

fn write_sorted(path: &Path, lines: impl IntoIterator<Item = String>) -> Result<()> {
    let sorted: Vec<String> = lines.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
    write_lines(path, &sorted)
}

/// Append the lines of `src` missing from `dst`, then rewrite `dst` sorted
pub fn merge_manifest(src: &Path, dst: &Path) -> Result<()> {
    let source = read_manifest(src)?;
    let target = read_manifest(dst)?;
    let before = target.len();

    let merged: BTreeSet<String> = target
        .into_iter()
        .chain(source)
        .map(|(line, _)| line)
        .collect();
    debug!(
        "Manifest {} grows from {} to {} line(s)",
        dst.display(),
        before,
        merged.len()
    );
    write_sorted(dst, merged)
}

/// Recompute the tag-list entry of the manifest in `dist_info`
///
/// All entries for `<dir>/WHEEL` are replaced with a single entry carrying
/// the current digest and size; when none existed one is appended.
pub fn fix_manifest_checksum(dist_info: &Path) -> Result<()> {
    let manifest = dist_info.join(MANIFEST_FILE);
    let tag_list = dist_info.join(TAG_LIST_FILE);
    let dir_name = dist_info
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidPath(dist_info.display().to_string()))?;
    let wheel_path = format!("{}/{}", dir_name, TAG_LIST_FILE);

    let digest = digest_file(&tag_list)?;
    let mut lines: Vec<String> = read_manifest(&manifest)?
        .into_iter()
        .filter(|(_, entry)| entry.path != wheel_path)
        .map(|(line, _)| line)
        .collect();
    lines.push(format!("{},{}", wheel_path, digest));

    info!("Updated {} entry in {}", wheel_path, manifest.display());
    write_sorted(&manifest, lines)
}

/// Drop manifest entries for `members` of `dist_info`
///
/// An entry is dropped when its path starts with `<dir>/<member>`. Returns the
/// number of entries removed; a missing manifest removes nothing.
pub fn remove_manifest_entries<S: AsRef<str>>(dist_info: &Path, members: &[S]) -> Result<usize> {
    let manifest = dist_info.join(MANIFEST_FILE);
    if members.is_empty() || !manifest.is_file() {
        return Ok(0);
    }
    let dir_name = dist_info
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidPath(dist_info.display().to_string()))?;
    let prefixes: Vec<String> = members
        .iter()
        .map(|m| format!("{}/{}", dir_name, m.as_ref()))
        .collect();

    let entries = read_manifest(&manifest)?;
    let total = entries.len();
    let kept: Vec<String> = entries
        .into_iter()
        .filter(|(_, entry)| !prefixes.iter().any(|p| entry.path.starts_with(p.as_str())))
        .map(|(line, _)| line)
        .collect();
    let removed = total - kept.len();

    if removed > 0 {
        debug!("Removed {} entries from {}", removed, manifest.display());
    }
    write_sorted(&manifest, kept)?;
    Ok(removed)
}

// src/metadata/lines.rs

//! Line-level helpers shared by the metadata merge drivers

use crate::error::Result;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Read a text file as lines without terminators
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content.lines().map(str::to_string).collect())
}

/// Rewrite `path` with one line per element, each newline-terminated
pub fn write_lines<S: AsRef<str>>(path: &Path, lines: &[S]) -> Result<()> {
    let mut out = String::new();
    for line in lines {
        out.push_str(line.as_ref());
        out.push('\n');
    }
    fs::write(path, out)?;
    Ok(())
}

/// Lines of `src` that do not appear in `dst`, in source order
pub fn missing_lines(src: &Path, dst: &Path) -> Result<Vec<String>> {
    let existing: HashSet<String> = read_lines(dst)?.into_iter().collect();
    let mut seen = HashSet::new();
    Ok(read_lines(src)?
        .into_iter()
        .filter(|line| !existing.contains(line) && seen.insert(line.clone()))
        .collect())
}

/// Plain line union: `dst` keeps its lines, missing `src` lines are appended
pub fn merge_lines(src: &Path, dst: &Path) -> Result<()> {
    let missing = missing_lines(src, dst)?;
    if missing.is_empty() {
        debug!("{} already contains every line of {}", dst.display(), src.display());
        return Ok(());
    }

    let mut lines = read_lines(dst)?;
    debug!("Appending {} line(s) to {}", missing.len(), dst.display());
    lines.extend(missing);
    write_lines(dst, &lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pair(temp: &TempDir, a: &str, b: &str) -> (std::path::PathBuf, std::path::PathBuf) {
        let pa = temp.path().join("a");
        let pb = temp.path().join("b");
        fs::write(&pa, a).unwrap();
        fs::write(&pb, b).unwrap();
        (pa, pb)
    }

    #[test]
    fn test_missing_lines() {
        let temp = TempDir::new().unwrap();
        let (a, b) = pair(&temp, "abc\ndef\n", "abc\nghi\n");
        assert_eq!(missing_lines(&a, &b).unwrap(), vec!["def".to_string()]);
    }

    #[test]
    fn test_merge_requires_keeps_destination_order() {
        let temp = TempDir::new().unwrap();
        let (src, dst) = pair(&temp, "bar\nbaz>=1.0\n", "bar\nquux\n");

        merge_lines(&src, &dst).unwrap();
        assert_eq!(fs::read_to_string(&dst).unwrap(), "bar\nquux\nbaz>=1.0\n");

        // second merge changes nothing
        merge_lines(&src, &dst).unwrap();
        assert_eq!(fs::read_to_string(&dst).unwrap(), "bar\nquux\nbaz>=1.0\n");
    }

    #[test]
    fn test_missing_lines_without_trailing_newline() {
        let temp = TempDir::new().unwrap();
        let (a, b) = pair(&temp, "x\ny", "y\n");
        assert_eq!(missing_lines(&a, &b).unwrap(), vec!["x".to_string()]);
    }
}

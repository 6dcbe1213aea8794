// src/metadata/wheel.rs

//! Tag-list (`WHEEL`) files
//!
//! A tag list is a set of `Key: value` header lines plus any number of
//! `Tag:` lines naming the interpreter/ABI/platform combinations the build
//! supports. Builds for different interpreter versions differ only in their
//! tags, so a merge keeps the destination headers and unions the tags.

use super::lines::{read_lines, write_lines};
use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

const TAG_PREFIX: &str = "Tag:";

/// Parsed tag-list file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagList {
    /// Non-tag lines in file order, continuations included
    pub headers: Vec<String>,
    pub tags: BTreeSet<String>,
}

impl TagList {
    /// Parse the file at `path`
    ///
    /// Blank lines are dropped. Anything that is neither a `Key: value` header
    /// nor an indented continuation is a structural error.
    pub fn read(path: &Path) -> Result<Self> {
        let mut list = Self::default();
        for (idx, line) in read_lines(path)?.into_iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            if line.starts_with(TAG_PREFIX) {
                list.tags.insert(line);
                continue;
            }

            let continuation = line.starts_with([' ', '\t']);
            if continuation && list.headers.is_empty() {
                return Err(Error::malformed(
                    path,
                    idx + 1,
                    "tag list",
                    "continuation line before any header",
                ));
            }
            if !continuation && !is_header(&line) {
                return Err(Error::malformed(
                    path,
                    idx + 1,
                    "tag list",
                    format!("expected `Key: value`, found {:?}", line),
                ));
            }
            list.headers.push(line);
        }
        Ok(list)
    }

    /// Lines in output order: headers, then sorted tags
    pub fn to_lines(&self) -> Vec<String> {
        self.headers
            .iter()
            .cloned()
            .chain(self.tags.iter().cloned())
            .collect()
    }
}

fn is_header(line: &str) -> bool {
    line.split_once(':').is_some_and(|(key, _)| {
        !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}

/// Merge the tags of `src` into `dst`
///
/// Headers of `src` that `dst` lacks are discarded with a warning.
pub fn merge_tag_list(src: &Path, dst: &Path) -> Result<()> {
    let source = TagList::read(src)?;
    let mut target = TagList::read(dst)?;

    for header in &source.headers {
        if !target.headers.contains(header) {
            warn!(
                "Discarding line {:?} from {} while merging into {}",
                header,
                src.display(),
                dst.display()
            );
        }
    }

    let before = target.tags.len();
    target.tags.extend(source.tags);
    debug!(
        "Merged {} new tag(s) from {} into {}",
        target.tags.len() - before,
        src.display(),
        dst.display()
    );
    write_lines(dst, &target.to_lines())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const HEADER: &str = "Wheel-Version: 1.0\nGenerator: bdist_wheel (0.42.0)\nRoot-Is-Purelib: false\n";

    #[test]
    fn test_merge_unions_tags_sorted() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        fs::write(&src, format!("{HEADER}Tag: cp312-cp312-linux_x86_64\n")).unwrap();
        fs::write(&dst, format!("{HEADER}Tag: cp311-cp311-linux_x86_64\n")).unwrap();

        merge_tag_list(&src, &dst).unwrap();
        assert_eq!(
            fs::read_to_string(&dst).unwrap(),
            format!(
                "{HEADER}Tag: cp311-cp311-linux_x86_64\nTag: cp312-cp312-linux_x86_64\n"
            )
        );
    }

    #[test]
    fn test_merge_discards_foreign_headers() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        fs::write(&src, "Generator: other\nTag: A\n").unwrap();
        fs::write(&dst, "Generator: mine\nTag: B\n").unwrap();

        merge_tag_list(&src, &dst).unwrap();
        assert_eq!(
            fs::read_to_string(&dst).unwrap(),
            "Generator: mine\nTag: A\nTag: B\n"
        );
    }

    #[test]
    fn test_merge_order_independent() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        let a2 = temp.path().join("a2");
        let b2 = temp.path().join("b2");
        fs::write(&a, "Wheel-Version: 1.0\nTag: Z\nTag: A\n").unwrap();
        fs::write(&b, "Wheel-Version: 1.0\nTag: M\n").unwrap();
        fs::copy(&a, &a2).unwrap();
        fs::copy(&b, &b2).unwrap();

        merge_tag_list(&a, &b).unwrap();
        merge_tag_list(&b2, &a2).unwrap();
        assert_eq!(fs::read(&b).unwrap(), fs::read(&a2).unwrap());
    }

    #[test]
    fn test_malformed_line_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("WHEEL");
        fs::write(&path, "Wheel-Version: 1.0\nthis is not a header\n").unwrap();

        match TagList::read(&path) {
            Err(Error::MalformedMetadata { line, kind, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(kind, "tag list");
            }
            other => panic!("expected malformed error, got {:?}", other),
        }
    }

    #[test]
    fn test_continuation_lines_kept_with_headers() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("WHEEL");
        fs::write(&path, "Generator: x\n  continued\nTag: A\n").unwrap();
        let list = TagList::read(&path).unwrap();
        assert_eq!(list.headers, vec!["Generator: x", "  continued"]);
        assert_eq!(list.tags.len(), 1);
    }
}

// src/filesystem/compare.rs

//! Content comparison for merge decisions
//!
//! Extension binaries can be large, so files are compared in fixed-size
//! chunks rather than read whole.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

const CHUNK_SIZE: usize = 64 * 1024;

/// Byte-for-byte comparison of two regular files
pub fn files_identical(a: &Path, b: &Path) -> io::Result<bool> {
    let meta_a = fs::metadata(a)?;
    let meta_b = fs::metadata(b)?;
    if !meta_a.is_file() || !meta_b.is_file() || meta_a.len() != meta_b.len() {
        return Ok(false);
    }

    let mut file_a = File::open(a)?;
    let mut file_b = File::open(b)?;
    let mut buf_a = vec![0u8; CHUNK_SIZE];
    let mut buf_b = vec![0u8; CHUNK_SIZE];

    loop {
        let n_a = read_full(&mut file_a, &mut buf_a)?;
        let n_b = read_full(&mut file_b, &mut buf_b)?;
        if n_a != n_b || buf_a[..n_a] != buf_b[..n_b] {
            return Ok(false);
        }
        if n_a == 0 {
            return Ok(true);
        }
    }
}

/// Fill `buf` as far as the reader allows; returns bytes read (0 at EOF)
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// True if both paths are symlinks that resolve to the same real target
///
/// Dangling links compare by their literal link text.
pub fn same_symlink_target(a: &Path, b: &Path) -> io::Result<bool> {
    let is_link = |p: &Path| -> io::Result<bool> {
        Ok(p.symlink_metadata()?.file_type().is_symlink())
    };
    if !is_link(a)? || !is_link(b)? {
        return Ok(false);
    }

    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(real_a), Ok(real_b)) => Ok(real_a == real_b),
        _ => Ok(fs::read_link(a)? == fs::read_link(b)?),
    }
}

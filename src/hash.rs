// src/hash.rs

//! Content digests for manifest entries
//!
//! Manifest (`RECORD`) entries carry `sha256=<hex>` digests together with the
//! file size. Both are computed in one streaming pass.

use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Digest algorithm name as written in manifest entries
pub const MANIFEST_ALGORITHM: &str = "sha256";

/// Digest and byte length of a piece of content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDigest {
    /// Lowercase hex SHA-256
    pub hex: String,
    pub size: u64,
}

impl ContentDigest {
    /// The hash column of a manifest entry (`sha256=<hex>`)
    pub fn manifest_hash(&self) -> String {
        format!("{}={}", MANIFEST_ALGORITHM, self.hex)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.manifest_hash(), self.size)
    }
}

/// Hash everything `reader` yields
pub fn digest_reader<R: Read>(reader: &mut R) -> io::Result<ContentDigest> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    let mut size = 0u64;

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..n]);
        size += n as u64;
    }

    Ok(ContentDigest {
        hex: format!("{:x}", hasher.finalize()),
        size,
    })
}

/// Hash the file at `path`
pub fn digest_file(path: &Path) -> io::Result<ContentDigest> {
    let mut file = File::open(path)?;
    digest_reader(&mut file)
}

/// SHA-256 of a byte slice as lowercase hex
pub fn sha256(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

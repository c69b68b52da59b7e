//! Content hashing for stage reconciliation
//!
//! The stage stores a content hash per file. Small files carry a plain
//! streaming SHA-256 digest. Files uploaded in parallel chunks carry a
//! composite "multi-part" digest instead: each fixed-size chunk is digested,
//! the chunk digests are concatenated and digested again, and the part count
//! is appended (`<hex>-<parts>`). Comparing a local file against a multi-part
//! hash requires recomputing the same chunked digest with the same chunk
//! size, not a whole-file digest.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// Chunk size convention used for multi-part uploads and hash recomputation.
pub const MULTIPART_CHUNK_SIZE: u64 = 8 * 1024 * 1024;

const READ_BUF_SIZE: usize = 64 * 1024;

/// SHA-256 of a byte slice as lowercase hex.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Streaming SHA-256 of a file's content as lowercase hex.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; READ_BUF_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Composite multi-part digest of a byte slice.
pub fn multipart_hash_bytes(bytes: &[u8], chunk_size: u64) -> String {
    let chunk = chunk_size.max(1) as usize;
    let mut outer = Sha256::new();
    let mut parts = 0u32;
    for piece in bytes.chunks(chunk) {
        parts += 1;
        outer.update(Sha256::digest(piece));
    }
    if parts == 0 {
        // Empty content still counts as one (empty) part.
        parts = 1;
        outer.update(Sha256::digest(b""));
    }
    format!("{:x}-{}", outer.finalize(), parts)
}

/// Composite multi-part digest of a file, streaming one chunk at a time.
pub fn multipart_hash_file(path: &Path, chunk_size: u64) -> io::Result<String> {
    let chunk_size = chunk_size.max(1);
    let mut reader = BufReader::new(File::open(path)?);
    let mut outer = Sha256::new();
    let mut parts = 0u32;
    let mut buf = [0u8; READ_BUF_SIZE];
    loop {
        let mut part_hasher = Sha256::new();
        let mut remaining = chunk_size;
        let mut read_any = false;
        while remaining > 0 {
            let want = remaining.min(buf.len() as u64) as usize;
            let n = reader.read(&mut buf[..want])?;
            if n == 0 {
                break;
            }
            part_hasher.update(&buf[..n]);
            remaining -= n as u64;
            read_any = true;
        }
        if !read_any {
            break;
        }
        parts += 1;
        outer.update(part_hasher.finalize());
    }
    if parts == 0 {
        parts = 1;
        outer.update(Sha256::digest(b""));
    }
    Ok(format!("{:x}-{}", outer.finalize(), parts))
}

/// Parsed shape of a hash reported by the stage listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteHash {
    /// Whole-file digest.
    Simple(String),
    /// Composite digest of fixed-size chunks plus part count.
    MultiPart { digest: String, parts: u32 },
}

impl RemoteHash {
    /// Parse the raw listing value. `<hex>-<n>` is a multi-part digest;
    /// anything else is treated as a simple digest.
    pub fn parse(raw: &str) -> Self {
        if let Some((digest, count)) = raw.rsplit_once('-') {
            let hexish = !digest.is_empty() && digest.chars().all(|c| c.is_ascii_hexdigit());
            if hexish {
                if let Ok(parts) = count.parse::<u32>() {
                    if parts > 0 {
                        return RemoteHash::MultiPart {
                            digest: digest.to_ascii_lowercase(),
                            parts,
                        };
                    }
                }
            }
        }
        RemoteHash::Simple(raw.to_ascii_lowercase())
    }

    /// Whether the local file's content hashes to this remote value,
    /// recomputing the chunked digest when the remote shape is multi-part.
    pub fn matches_file(&self, path: &Path, chunk_size: u64) -> io::Result<bool> {
        match self {
            RemoteHash::Simple(digest) => Ok(hash_file(path)? == *digest),
            RemoteHash::MultiPart { digest, parts } => {
                Ok(multipart_hash_file(path, chunk_size)? == format!("{digest}-{parts}"))
            }
        }
    }
}

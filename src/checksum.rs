//! Content hashes and file stamps for source invalidation.
use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Hash recorded for paths that do not exist, so creating them invalidates.
pub const MISSING_HASH: &str = "missing";

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Content hash of a file, or [`MISSING_HASH`] when it is absent.
pub fn checksum(path: &Path) -> Result<String> {
    match fs::read(path) {
        Ok(bytes) => Ok(sha256_hex(&bytes)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(MISSING_HASH.to_string()),
        Err(err) => Err(Error::io(path, err)),
    }
}

/// Modification time in nanoseconds since the epoch; zero when unavailable.
pub fn mtime_ns(path: &Path) -> u64 {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|duration| u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

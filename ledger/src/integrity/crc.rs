//! CRC32 (IEEE) checksums over transaction payload bytes.

use crc32fast::Hasher;

/// Computes the IEEE CRC32 of `bytes`, formatted as 8 lowercase hex digits.
pub fn crc32_hex(bytes: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    format!("{:08x}", hasher.finalize())
}

//! Content hashing for canonical type descriptions.
//!
//! Hashes are SHA-256 over a canonical byte string, with no salt and no
//! process-specific state, so the same input yields the same hash in every
//! run.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// A 32-byte SHA-256 content hash.
pub type ContentHash = [u8; 32];

/// Prefix of generated alias names for anonymous structs.
pub const STRUCT_ALIAS_PREFIX: &str = "Struct_";

/// Compute the SHA-256 content hash of any serializable value.
pub fn content_hash<T: Serialize>(value: &T) -> serde_json::Result<ContentHash> {
    let json = serde_json::to_vec(value)?;
    Ok(bytes_hash(&json))
}

/// SHA-256 of raw bytes.
pub fn bytes_hash(bytes: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Format a content hash as a hex string.
pub fn hash_hex(hash: &ContentHash) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// 64-bit structural hash of a canonical struct field listing: the first
/// eight bytes of its SHA-256, big-endian.
pub fn struct_hash(field_listing: &str) -> u64 {
    let digest = bytes_hash(field_listing.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

/// Alias name for an anonymous struct with the given field listing.
pub fn struct_alias(field_listing: &str) -> String {
    format!("{STRUCT_ALIAS_PREFIX}{:016x}", struct_hash(field_listing))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_hash() {
        let h1 = content_hash(&"hello world").unwrap();
        let h2 = content_hash(&"hello world").unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn hash_hex_format() {
        let hex = hash_hex(&bytes_hash(b"x"));
        assert_eq!(hex.len(), 64);
    }

    #[test]
    fn alias_is_stable_and_shaped() {
        let a = struct_alias("X int64;");
        let b = struct_alias("X int64;");
        assert_eq!(a, b);
        assert!(a.starts_with(STRUCT_ALIAS_PREFIX));
        assert_eq!(a.len(), STRUCT_ALIAS_PREFIX.len() + 16);
    }

    #[test]
    fn alias_matches_sha256_prefix() {
        // sha256("") = e3b0c44298fc1c14...
        assert_eq!(struct_alias(""), "Struct_e3b0c44298fc1c14");
    }

    #[test]
    fn distinct_listings_distinct_aliases() {
        assert_ne!(struct_alias("X int64;"), struct_alias("Y int64;"));
        assert_ne!(struct_alias("X int64;"), struct_alias("X string;"));
        assert_ne!(
            struct_alias("A int64;B string;"),
            struct_alias("B string;A int64;")
        );
    }
}

//! SHA-256 checksums (§3: `FileMetadata.Checksum` is lowercase hex SHA-256,
//! §6: stable lowercase hex output format).

use sha2::{Digest, Sha256};

/// Compute the lowercase hex SHA-256 digest of `data`, used as the
/// content-addressed identity for ingested files (invariant I1).
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_matches_known_digest() {
        let hash = sha256_hex(b"hello world");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn sha256_hex_is_deterministic_and_content_sensitive() {
        assert_eq!(sha256_hex(b"a"), sha256_hex(b"a"));
        assert_ne!(sha256_hex(b"a"), sha256_hex(b"b"));
    }
}

//! Content hashing for change detection
//!
//! The hash is only ever compared for equality; SHA-256 is used because
//! it is already in the dependency tree.

use sha2::{Digest, Sha256};

/// Hex digest of the file content, stable across runs.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(content_hash("fn main() {}"), content_hash("fn main() {}"));
    }

    #[test]
    fn test_hash_detects_changes() {
        assert_ne!(content_hash("a"), content_hash("b"));
        assert_ne!(content_hash(""), content_hash(" "));
    }
}

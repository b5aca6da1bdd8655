//! SHA-256 hashing, the single digest used everywhere in the chain.

use sha2::{Digest, Sha256};

/// Number of bytes in a canonical hash.
pub const HASH_LEN: usize = 32;

/// Hash `bytes` with SHA-256, returning the raw 32-byte digest.
pub fn hash(bytes: &[u8]) -> [u8; HASH_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let out = hasher.finalize();
    let mut buf = [0u8; HASH_LEN];
    buf.copy_from_slice(&out);
    buf
}

/// Hash `bytes` with SHA-256, returning the lowercase hex encoding.
pub fn hash_hex(bytes: &[u8]) -> String {
    hex::encode(hash(bytes))
}

/// Hash a UTF-8 string with SHA-256, returning the lowercase hex encoding.
///
/// All content strings hashed by this crate (transaction content, block
/// headers) are built as UTF-8 string concatenations, so this is the
/// entry point the rest of the crate actually calls.
pub fn hash_hex_str(s: &str) -> String {
    hash_hex(s.as_bytes())
}

/// `true` iff `hash` begins with `difficulty` ASCII `'0'` characters.
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.as_bytes().iter().take(difficulty).all(|&b| b == b'0') && hash.len() >= difficulty
}

/// `true` iff the raw digest `hash` begins with `difficulty` hex-nibble
/// zeros, checked directly on bytes. Equivalent to
/// `meets_difficulty(&hex::encode(hash), difficulty)` but without
/// allocating a hex string — the form the mining hot path uses, since it
/// hashes every nonce attempt.
pub fn meets_difficulty_bytes(hash: &[u8; HASH_LEN], difficulty: usize) -> bool {
    let full_bytes = difficulty / 2;
    if full_bytes > HASH_LEN || hash[..full_bytes].iter().any(|&b| b != 0) {
        return false;
    }
    if difficulty % 2 == 1 {
        match hash.get(full_bytes) {
            Some(byte) => byte >> 4 == 0,
            None => false,
        }
    } else {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_hex_is_deterministic_and_lowercase() {
        let a = hash_hex_str("systemgenesis00");
        let b = hash_hex_str("systemgenesis00");
        assert_eq!(a, b);
        assert_eq!(a, a.to_lowercase());
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn different_input_different_hash() {
        assert_ne!(hash_hex_str("a"), hash_hex_str("b"));
    }

    #[test]
    fn meets_difficulty_checks_leading_zero_nibbles() {
        assert!(meets_difficulty("000abc", 3));
        assert!(!meets_difficulty("00abc0", 3));
        assert!(!meets_difficulty("00", 3));
    }

    #[test]
    fn meets_difficulty_bytes_agrees_with_the_hex_form() {
        for difficulty in 0..6 {
            for seed in 0u8..50 {
                let digest = hash(&[seed]);
                assert_eq!(
                    meets_difficulty_bytes(&digest, difficulty),
                    meets_difficulty(&hex::encode(digest), difficulty),
                );
            }
        }
    }
}

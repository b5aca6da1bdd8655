//! Merkle root over hex-encoded leaf digests.
//!
//! A root only, no proof objects: leaves here are transaction ids,
//! which are already hashes, rather than raw bytes the tree itself
//! would need to hash first.

use crate::hash::hash_hex_str;

/// Compute the Merkle root over `leaves`, an ordered sequence of hex
/// strings. Empty/whitespace-only entries are filtered out first.
///
/// Odd levels pair the last element with itself, matching the Bitcoin
/// shape. The result must be byte-for-byte identical across nodes.
pub fn merkle_root<I, S>(leaves: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut level: Vec<String> = leaves
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .filter(|s| !s.trim().is_empty())
        .collect();

    if level.is_empty() {
        return hash_hex_str("");
    }

    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            let combined = if pair.len() == 2 {
                format!("{}{}", pair[0], pair[1])
            } else {
                format!("{}{}", pair[0], pair[0])
            };
            next.push(hash_hex_str(&combined));
        }
        level = next;
    }

    level.into_iter().next().expect("level is non-empty by loop invariant")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_hex_str;

    #[test]
    fn empty_leaves_hash_empty_string() {
        let empty: Vec<String> = vec![];
        assert_eq!(merkle_root(empty), hash_hex_str(""));
    }

    #[test]
    fn single_leaf_is_its_own_root() {
        let leaf = hash_hex_str("tx1");
        assert_eq!(merkle_root([leaf.clone()]), leaf);
    }

    #[test]
    fn two_leaves_hash_their_concatenation() {
        let a = hash_hex_str("tx1");
        let b = hash_hex_str("tx2");
        let expected = hash_hex_str(&format!("{a}{b}"));
        assert_eq!(merkle_root([a, b]), expected);
    }

    #[test]
    fn odd_leaf_count_duplicates_the_last() {
        let a = hash_hex_str("tx1");
        let b = hash_hex_str("tx2");
        let c = hash_hex_str("tx3");
        let ab = hash_hex_str(&format!("{a}{b}"));
        let cc = hash_hex_str(&format!("{c}{c}"));
        let expected = hash_hex_str(&format!("{ab}{cc}"));
        assert_eq!(merkle_root([a, b, c]), expected);
    }

    #[test]
    fn blank_entries_are_filtered() {
        let a = hash_hex_str("tx1");
        assert_eq!(merkle_root([a.clone(), "".to_string(), "   ".to_string()]), a);
    }

    #[test]
    fn deterministic_across_calls() {
        let leaves = vec![hash_hex_str("x"), hash_hex_str("y"), hash_hex_str("z")];
        assert_eq!(merkle_root(leaves.clone()), merkle_root(leaves));
    }
}

//! Block: an immutable header plus an ordered transaction list.
//!
//! `hash` is never a field — it is always a pure function of the other
//! header fields, recomputed on demand.

use serde::{Deserialize, Serialize};

use super::transaction::Transaction;
use crate::hash::hash_hex_str;
use crate::merkle::merkle_root;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    pub index: u64,
    pub timestamp: u64,
    #[serde(rename = "previousHash")]
    pub previous_hash: String,
    pub transactions: Vec<Transaction>,
    #[serde(rename = "merkleRoot")]
    pub merkle_root: String,
    pub nonce: u64,
}

impl Block {
    /// Build a block, computing its Merkle root from `transactions`'
    /// ids. `hash` is derived, not stored.
    pub fn new(
        index: u64,
        timestamp: u64,
        previous_hash: String,
        transactions: Vec<Transaction>,
        nonce: u64,
    ) -> Self {
        let merkle_root = merkle_root(transactions.iter().map(|tx| tx.id.as_str()));
        Self {
            index,
            timestamp,
            previous_hash,
            transactions,
            merkle_root,
            nonce,
        }
    }

    /// The deterministic genesis block shared by all nodes:
    /// `index=0`, `timestamp=0`, `previousHash` = 64 zeros, `nonce=0`, a
    /// single hard-coded system transaction.
    pub fn genesis() -> Self {
        let genesis_tx = Transaction::coinbase("genesis", 0, 0);
        Self::new(0, 0, "0".repeat(64), vec![genesis_tx], 0)
    }

    /// `index||timestamp||previousHash||merkleRoot||nonce`, hashed.
    /// Never stored; always recomputed.
    pub fn hash(&self) -> String {
        let content = format!(
            "{}{}{}{}{}",
            self.index, self.timestamp, self.previous_hash, self.merkle_root, self.nonce
        );
        hash_hex_str(&content)
    }

    pub fn coinbase_transaction(&self) -> Option<&Transaction> {
        self.transactions.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_is_deterministic() {
        let a = Block::genesis();
        let b = Block::genesis();
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.index, 0);
        assert_eq!(a.previous_hash, "0".repeat(64));
    }

    #[test]
    fn hash_is_stable_across_serialization() {
        let block = Block::genesis();
        let before = block.hash();
        let json = serde_json::to_string(&block).unwrap();
        let restored: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(before, restored.hash());
    }

    #[test]
    fn changing_nonce_changes_hash() {
        let mut block = Block::new(
            1,
            0,
            Block::genesis().hash(),
            vec![Transaction::coinbase("m", 50, 0)],
            0,
        );
        let h0 = block.hash();
        block.nonce = 1;
        assert_ne!(h0, block.hash());
    }

    #[test]
    fn merkle_root_reflects_transaction_ids() {
        let txs = vec![Transaction::coinbase("m", 50, 0)];
        let block = Block::new(1, 0, Block::genesis().hash(), txs.clone(), 0);
        assert_eq!(
            block.merkle_root,
            crate::merkle::merkle_root([txs[0].id.clone()])
        );
    }
}

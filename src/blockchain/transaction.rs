//! Transaction: an immutable value + identity + signature record.

use serde::{Deserialize, Serialize};

use crate::crypto::{verify, KeyProvider};
use crate::hash::hash_hex_str;

/// The sentinel `from` address for coinbase transactions.
pub const COINBASE_FROM: &str = "system";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub from: String,
    pub to: String,
    pub amount: i64,
    pub timestamp: u64,
    pub signature: Option<String>,
    pub id: String,
}

impl Transaction {
    /// The unsigned content string hashed for `id` and signed for
    /// `signature`: the UTF-8 concatenation of `from`, `to`, `amount` and
    /// `timestamp` in that order, with no separators.
    pub fn content_string(from: &str, to: &str, amount: i64, timestamp: u64) -> String {
        format!("{from}{to}{amount}{timestamp}")
    }

    /// Build and sign a user transaction with `keypair`.
    pub fn new_signed<K: KeyProvider>(keypair: &K, to: &str, amount: i64, timestamp: u64) -> Self {
        let from = keypair.public_key_hex();
        let content = Self::content_string(&from, to, amount, timestamp);
        let id = hash_hex_str(&content);
        let signature = hex::encode(keypair.sign(content.as_bytes()));
        Self {
            from,
            to: to.to_string(),
            amount,
            timestamp,
            signature: Some(signature),
            id,
        }
    }

    /// Build a coinbase transaction crediting `to` with `amount`. Coinbase
    /// transactions carry no signature.
    pub fn coinbase(to: &str, amount: i64, timestamp: u64) -> Self {
        let content = Self::content_string(COINBASE_FROM, to, amount, timestamp);
        let id = hash_hex_str(&content);
        Self {
            from: COINBASE_FROM.to_string(),
            to: to.to_string(),
            amount,
            timestamp,
            signature: None,
            id,
        }
    }

    pub fn is_coinbase(&self) -> bool {
        self.from == COINBASE_FROM
    }

    /// `true` iff `id` matches the content, `amount` is within the range
    /// allowed for the transaction's kind, and, for non-coinbase
    /// transactions, `signature` verifies against the public key encoded
    /// in `from`. Never raises: malformed signatures are just `false`.
    pub fn validate_signature(&self) -> bool {
        let content = Self::content_string(&self.from, &self.to, self.amount, self.timestamp);
        if hash_hex_str(&content) != self.id {
            return false;
        }
        if self.is_coinbase() {
            return self.amount >= 0;
        }
        if self.amount <= 0 {
            return false;
        }
        let Some(signature_hex) = &self.signature else {
            return false;
        };
        let Ok(signature) = hex::decode(signature_hex) else {
            return false;
        };
        verify(&self.from, content.as_bytes(), &signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::EcdsaKeyPair;

    #[test]
    fn signed_transaction_validates() {
        let keypair = EcdsaKeyPair::generate();
        let tx = Transaction::new_signed(&keypair, "bob", 10, 1_700_000_000);
        assert!(tx.validate_signature());
    }

    #[test]
    fn tampered_amount_fails_validation() {
        let keypair = EcdsaKeyPair::generate();
        let mut tx = Transaction::new_signed(&keypair, "bob", 10, 1_700_000_000);
        tx.amount = 999;
        assert!(!tx.validate_signature());
    }

    #[test]
    fn non_coinbase_zero_or_negative_amount_is_rejected() {
        let keypair = EcdsaKeyPair::generate();
        let zero = Transaction::new_signed(&keypair, "bob", 0, 1);
        assert!(!zero.validate_signature());
        let negative = Transaction::new_signed(&keypair, "bob", -5, 1);
        assert!(!negative.validate_signature());
    }

    #[test]
    fn coinbase_allows_zero_but_not_negative_amount() {
        let zero = Transaction::coinbase("miner", 0, 1);
        assert!(zero.validate_signature());
        let mut negative = Transaction::coinbase("miner", 5, 1);
        negative.amount = -5;
        negative.id = hash_hex_str(&Transaction::content_string(
            COINBASE_FROM,
            "miner",
            -5,
            1,
        ));
        assert!(!negative.validate_signature());
    }

    #[test]
    fn coinbase_validates_without_signature() {
        let tx = Transaction::coinbase("miner", 50, 1_700_000_000);
        assert!(tx.signature.is_none());
        assert!(tx.validate_signature());
    }

    #[test]
    fn genesis_transaction_id_is_fixed() {
        let tx = Transaction::coinbase("genesis", 0, 0);
        let tx = Transaction {
            from: COINBASE_FROM.to_string(),
            ..tx
        };
        assert_eq!(tx.id, hash_hex_str("systemgenesis00"));
    }

    #[test]
    fn id_is_a_function_of_content() {
        let a = Transaction::coinbase("alice", 5, 100);
        let b = Transaction::coinbase("alice", 5, 100);
        assert_eq!(a.id, b.id);
    }
}

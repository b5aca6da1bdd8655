//! Mempool: a concurrent pool of pending transactions keyed by id.
//!
//! Backed by a `DashMap` for a thread-safe map whose operations are
//! individually atomic but not composable across calls.

use dashmap::DashMap;

use crate::blockchain::Transaction;

#[derive(Default)]
pub struct Mempool {
    pending: DashMap<String, Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
        }
    }

    /// Admit `tx`. Verifies `tx.validate_signature()`; for non-coinbase
    /// transactions, rejects if `tx.amount` exceeds `confirmed_balance(from)`
    /// minus the amount already pending from the same sender. Insertion is
    /// atomic with respect to other admissions of the same id: a
    /// duplicate id is rejected even if called concurrently.
    ///
    /// `confirmed_balance` is supplied by the caller (the coordinator, in
    /// practice) so the mempool itself has no direct chain dependency.
    /// This balance pre-check is advisory only; the authoritative check
    /// happens under the chain lock at append time.
    pub fn add<F>(&self, tx: Transaction, confirmed_balance: F) -> bool
    where
        F: Fn(&str) -> i64,
    {
        if !tx.validate_signature() {
            return false;
        }

        if !tx.is_coinbase() {
            let pending_from_sender: i64 = self
                .pending
                .iter()
                .filter(|entry| entry.value().from == tx.from)
                .map(|entry| entry.value().amount)
                .sum();
            let available = confirmed_balance(&tx.from) - pending_from_sender;
            if tx.amount > available {
                return false;
            }
        }

        match self.pending.entry(tx.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(tx);
                true
            }
        }
    }

    /// Best-effort removal of a single transaction by id.
    pub fn remove(&self, id: &str) {
        self.pending.remove(id);
    }

    /// Best-effort removal of every transaction in `txs` (by id).
    pub fn remove_confirmed(&self, txs: &[Transaction]) {
        for tx in txs {
            self.pending.remove(&tx.id);
        }
    }

    /// A stable ordered slice of up to `limit` current entries. No
    /// guarantee they are still present by the time the caller acts on
    /// them.
    pub fn snapshot(&self, limit: usize) -> Vec<Transaction> {
        self.pending
            .iter()
            .take(limit)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{EcdsaKeyPair, KeyProvider};

    #[test]
    fn admits_a_signed_transaction_within_confirmed_balance() {
        let mempool = Mempool::new();
        let keypair = EcdsaKeyPair::generate();
        let tx = Transaction::new_signed(&keypair, "bob", 10, 1);
        assert!(mempool.add(tx, |_| 20));
        assert_eq!(mempool.count(), 1);
    }

    #[test]
    fn rejects_unsigned_or_tampered_transaction() {
        let mempool = Mempool::new();
        let keypair = EcdsaKeyPair::generate();
        let mut tx = Transaction::new_signed(&keypair, "bob", 10, 1);
        tx.amount = 999;
        assert!(!mempool.add(tx, |_| 1_000));
        assert_eq!(mempool.count(), 0);
    }

    #[test]
    fn rejects_transaction_exceeding_available_balance() {
        let mempool = Mempool::new();
        let keypair = EcdsaKeyPair::generate();
        let tx = Transaction::new_signed(&keypair, "bob", 10, 1);
        assert!(!mempool.add(tx, |_| 5));
    }

    #[test]
    fn second_pending_spend_from_same_sender_is_advisory_checked() {
        let mempool = Mempool::new();
        let keypair = EcdsaKeyPair::generate();
        let first = Transaction::new_signed(&keypair, "bob", 8, 1);
        let second = Transaction::new_signed(&keypair, "carol", 8, 2);
        assert!(mempool.add(first, |_| 10));
        assert!(!mempool.add(second, |_| 10));
    }

    #[test]
    fn rejects_duplicate_id() {
        let mempool = Mempool::new();
        let keypair = EcdsaKeyPair::generate();
        let tx = Transaction::new_signed(&keypair, "bob", 10, 1);
        assert!(mempool.add(tx.clone(), |_| 100));
        assert!(!mempool.add(tx, |_| 100));
        assert_eq!(mempool.count(), 1);
    }

    #[test]
    fn snapshot_and_removal_round_trip() {
        let mempool = Mempool::new();
        let keypair = EcdsaKeyPair::generate();
        let tx = Transaction::new_signed(&keypair, "bob", 10, 1);
        mempool.add(tx.clone(), |_| 100);
        assert_eq!(mempool.snapshot(10).len(), 1);
        mempool.remove_confirmed(&[tx]);
        assert_eq!(mempool.count(), 0);
        assert!(mempool.snapshot(10).is_empty());
    }
}

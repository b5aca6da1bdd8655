//! Pure consensus rules: reward schedule, PoW check, coinbase check,
//! balance check. Every function here is deterministic and side
//! effect free, and every validator returns a plain `bool` — consensus
//! rule violations are never raised as errors.

use std::collections::HashMap;

use crate::blockchain::{Block, Transaction};

/// Block reward at height 0, before any halving.
pub const INITIAL_BLOCK_REWARD: i64 = 50;

/// Height interval between reward halvings.
pub const HALVING_INTERVAL: u64 = 210_000;

/// Leading `'0'` hex characters a block hash must have.
pub const DIFFICULTY: usize = 3;

/// The sentinel `from` address of coinbase transactions.
pub const COINBASE_FROM: &str = "system";

/// `INITIAL_BLOCK_REWARD >> (height / HALVING_INTERVAL)`, saturating to 0
/// once the shift count reaches 64.
pub fn reward_for(height: u64) -> i64 {
    let halvings = height / HALVING_INTERVAL;
    if halvings >= 64 {
        0
    } else {
        INITIAL_BLOCK_REWARD >> halvings
    }
}

/// `block` has at least one transaction, the first is a coinbase from
/// [`COINBASE_FROM`], and its amount does not exceed the reward owed at
/// `block.index`.
pub fn validate_coinbase(block: &Block) -> bool {
    match block.transactions.first() {
        Some(tx) => tx.from == COINBASE_FROM && tx.amount <= reward_for(block.index),
        None => false,
    }
}

/// `block.hash()` begins with [`DIFFICULTY`] ASCII `'0'` characters.
pub fn validate_difficulty(block: &Block) -> bool {
    crate::hash::meets_difficulty(&block.hash(), DIFFICULTY)
}

/// Replay every transaction in `preceding_chain` to build a running
/// `address -> balance` mapping (coinbase credits `to`; user transactions
/// debit `from` and credit `to`), then require every non-coinbase
/// transaction in `block` to have a strictly positive `amount` and spend
/// no more than the sender's balance at that point, updating the mapping
/// in place so later transactions in the same block see the effect.
///
/// The positive-amount check is enforced here in addition to
/// `Transaction::validate_signature` because block-level validation
/// (`Chain::append`, `Chain::is_valid_chain`) never re-checks signatures
/// per transaction — a block assembled outside the mempool must still be
/// rejected for a non-positive user-transaction amount.
///
/// Balances use signed arithmetic and are never clamped: a chain of
/// coinbase-only credits can make a balance "positive" with no debit
/// path. This is deliberate, not an oversight — see `DESIGN.md`.
pub fn validate_balances(preceding_chain: &[Block], block: &Block) -> bool {
    let mut balances: HashMap<&str, i64> = HashMap::new();
    for preceding in preceding_chain {
        for tx in &preceding.transactions {
            apply_to_balances(&mut balances, tx);
        }
    }

    for tx in &block.transactions {
        if tx.from == COINBASE_FROM {
            apply_to_balances(&mut balances, tx);
            continue;
        }
        if tx.amount <= 0 {
            return false;
        }
        let available = *balances.get(tx.from.as_str()).unwrap_or(&0);
        if tx.amount > available {
            return false;
        }
        apply_to_balances(&mut balances, tx);
    }

    true
}

fn apply_to_balances<'a>(balances: &mut HashMap<&'a str, i64>, tx: &'a Transaction) {
    if tx.from != COINBASE_FROM {
        *balances.entry(tx.from.as_str()).or_insert(0) -= tx.amount;
    }
    *balances.entry(tx.to.as_str()).or_insert(0) += tx.amount;
}

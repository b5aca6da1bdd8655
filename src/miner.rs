//! Miner: cancellable block-template + PoW search loop.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::blockchain::{Block, Chain, Transaction};
use crate::consensus::{reward_for, DIFFICULTY};
use crate::hash::{hash, meets_difficulty_bytes};
use crate::mempool::Mempool;
use crate::merkle::merkle_root;

/// Up to this many mempool entries are included per mined block.
const MAX_TRANSACTIONS_PER_BLOCK: usize = 100;

/// Yield cooperatively and check cancellation every this many nonces.
const YIELD_EVERY: u64 = 10_000;

/// Retry pause after a failed mining attempt in the continuous loop.
const RETRY_PAUSE: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum MiningError {
    /// The chain tip moved while searching for a nonce; the template is
    /// stale and must be recomputed.
    #[error("mining template went stale")]
    StaleTemplate,
    /// The final append under the chain lock was rejected — most likely
    /// a race with a concurrently accepted block.
    #[error("mined block was rejected on append")]
    AppendRejected,
    /// Cancellation observed at a yield point.
    #[error("mining cancelled")]
    Cancelled,
}

pub type MiningOutcome = Result<Block, MiningError>;

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the Unix epoch")
        .as_secs()
}

/// Cancellable block-template + PoW search loop. Shares its chain and
/// mempool handles with whatever coordinates it rather than owning
/// independent copies.
pub struct Miner {
    reward_address: String,
    chain: Arc<Mutex<Chain>>,
    mempool: Arc<Mempool>,
    cancel: CancellationToken,
    running: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Miner {
    pub fn new(reward_address: String, chain: Arc<Mutex<Chain>>, mempool: Arc<Mempool>) -> Self {
        Self {
            reward_address,
            chain,
            mempool,
            cancel: CancellationToken::new(),
            running: AtomicBool::new(false),
            handle: Mutex::new(None),
        }
    }

    /// The single source of truth for producing one block:
    /// 1. snapshot the tip, 2. snapshot up to 100 mempool transactions
    ///    and prepend a fresh coinbase, 3. compute the Merkle root and
    ///    timestamp, 4. search nonces (yielding every 10,000 attempts),
    /// 5. re-check the tip hasn't moved, 6. append under the chain lock,
    /// 7. best-effort drop the block's transactions from the mempool.
    pub async fn mine_one(&self, cancel: &CancellationToken) -> MiningOutcome {
        let (index, previous_hash) = {
            let chain = self.chain.lock();
            (chain.latest().index + 1, chain.latest().hash())
        };

        let mut transactions = self.mempool.snapshot(MAX_TRANSACTIONS_PER_BLOCK);
        let timestamp = unix_timestamp();
        let coinbase = Transaction::coinbase(&self.reward_address, reward_for(index), timestamp);
        transactions.insert(0, coinbase);

        // The header is `index||timestamp||previousHash||merkleRoot||nonce`;
        // everything but the nonce is fixed for the whole search, so it is
        // built once and the nonce is rewritten into a reused buffer on
        // every attempt instead of re-hashing a freshly formatted string.
        let merkle = merkle_root(transactions.iter().map(|tx| tx.id.as_str()));
        let header_prefix = format!("{index}{timestamp}{previous_hash}{merkle}");
        let mut header = String::with_capacity(header_prefix.len() + 20);
        header.push_str(&header_prefix);

        let mut nonce = 0u64;
        loop {
            header.truncate(header_prefix.len());
            write!(header, "{nonce}").expect("writing digits into a String never fails");
            let digest = hash(header.as_bytes());
            if meets_difficulty_bytes(&digest, DIFFICULTY) {
                break;
            }
            nonce += 1;
            if nonce % YIELD_EVERY == 0 {
                if cancel.is_cancelled() {
                    return Err(MiningError::Cancelled);
                }
                tokio::task::yield_now().await;
            }
        }
        let block = Block {
            index,
            timestamp,
            previous_hash: previous_hash.clone(),
            transactions,
            merkle_root: merkle,
            nonce,
        };

        let tip_moved = {
            let chain = self.chain.lock();
            chain.latest().hash() != previous_hash
        };
        if tip_moved {
            return Err(MiningError::StaleTemplate);
        }

        let appended = {
            let mut chain = self.chain.lock();
            chain.append(block.clone())
        };
        if !appended {
            return Err(MiningError::AppendRejected);
        }

        self.mempool.remove_confirmed(&block.transactions);
        Ok(block)
    }

    /// Spawn the continuous mining loop if it is not already running.
    /// Idempotent: a second call while already running is a no-op.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let miner = Arc::clone(self);
        let cancel = self.cancel.clone();
        let join = tokio::spawn(async move {
            loop {
                if cancel.is_cancelled() {
                    break;
                }
                match miner.mine_one(&cancel).await {
                    Ok(block) => {
                        tracing::info!(index = block.index, "miner produced block");
                    }
                    Err(MiningError::Cancelled) => break,
                    Err(err) => {
                        tracing::debug!(%err, "mining attempt failed, retrying");
                        tokio::time::sleep(RETRY_PAUSE).await;
                    }
                }
            }
            miner.running.store(false, Ordering::SeqCst);
        });
        *self.handle.lock() = Some(join);
    }

    /// Signal cancellation and detach — does not wait for the mining
    /// task to observe it.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Signal cancellation and await the mining task's exit. Used by a
    /// coordinated process shutdown, where cancellation must never leave
    /// a half-appended chain.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

//! NodeCoordinator: the only component that mutates the chain or
//! persists it. Serialises chain mutation behind a single exclusive
//! lock; broadcasts and persistence happen after the lock is released
//! so I/O never blocks the mining hot path or other readers.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::blockchain::{Block, Chain, Transaction};
use crate::error::LedgerError;
use crate::mempool::Mempool;
use crate::miner::{Miner, MiningOutcome};
use crate::store::Store;
use crate::transport::{InboundHandler, Transport};

/// Orchestrates mine/accept/replace against a shared [`Chain`] and
/// [`Mempool`], and drives persistence and broadcast through injected
/// [`Store`] and [`Transport`] collaborators.
pub struct NodeCoordinator {
    chain: Arc<Mutex<Chain>>,
    mempool: Arc<Mempool>,
    miner: Arc<Miner>,
    store: Arc<dyn Store>,
    transport: Arc<dyn Transport>,
}

impl NodeCoordinator {
    pub fn new(reward_address: String, store: Arc<dyn Store>, transport: Arc<dyn Transport>) -> Self {
        let chain = Arc::new(Mutex::new(Chain::new()));
        let mempool = Arc::new(Mempool::new());
        let miner = Arc::new(Miner::new(reward_address, Arc::clone(&chain), Arc::clone(&mempool)));
        Self {
            chain,
            mempool,
            miner,
            store,
            transport,
        }
    }

    /// Load the persisted chain and replace the in-memory one if it is
    /// non-empty and valid. A missing or invalid persisted chain is
    /// ignored — a fresh genesis-only chain is a perfectly valid start.
    pub async fn initialize_from_store(&self) -> Result<(), LedgerError> {
        let blocks = self.store.load().await?;
        if !blocks.is_empty() && Chain::is_valid_chain(&blocks) {
            *self.chain.lock() = Chain::from_blocks(blocks);
        }
        Ok(())
    }

    /// Snapshot read of the full chain under the lock.
    pub fn get_chain(&self) -> Vec<Block> {
        self.chain.lock().blocks().to_vec()
    }

    /// Snapshot read of the tip under the lock.
    pub fn get_latest(&self) -> Block {
        self.chain.lock().latest().clone()
    }

    /// Walk the chain under the lock and sum `address`'s balance
    /// (coinbase credits, user transactions debit `from` and credit
    /// `to`). O(chain · transactions): this becomes the hot path for
    /// long chains; an incremental cache keyed by chain tip would be a
    /// legitimate optimisation but must never change the rules.
    pub fn get_balance(&self, address: &str) -> i64 {
        let chain = self.chain.lock();
        let mut balance = 0i64;
        for block in chain.blocks() {
            for tx in &block.transactions {
                if tx.from == address {
                    balance -= tx.amount;
                }
                if tx.to == address {
                    balance += tx.amount;
                }
            }
        }
        balance
    }

    /// Admit a client-submitted transaction into the mempool, then
    /// broadcast it to peers. The mempool's balance pre-check is
    /// advisory only; the authoritative check happens at block-append
    /// time.
    pub async fn submit_transaction(&self, tx: Transaction) -> bool {
        let accepted = self.mempool.add(tx.clone(), |addr| self.get_balance(addr));
        if accepted {
            self.broadcast_transaction(&tx).await;
        }
        accepted
    }

    /// Run `Miner::mine_one`, then persist and broadcast the block
    /// outside the chain lock.
    pub async fn mine_block(&self, cancel: &CancellationToken) -> MiningOutcome {
        let block = self.miner.mine_one(cancel).await?;
        tracing::info!(index = block.index, hash = %block.hash(), "mined block");
        self.persist().await;
        self.broadcast_block(&block).await;
        Ok(block)
    }

    pub fn start_mining(self: &Arc<Self>) {
        self.miner.start();
    }

    pub fn stop_mining(&self) {
        self.miner.stop();
    }

    pub async fn shutdown(&self) {
        self.miner.shutdown().await;
    }

    /// Append `block` under the lock. On success, drop its transactions
    /// from the mempool, persist, and report success; on failure the
    /// caller (transport layer) may request the sender's chain.
    pub async fn try_accept_block(&self, block: Block) -> bool {
        let appended = self.chain.lock().append(block.clone());
        if appended {
            self.mempool.remove_confirmed(&block.transactions);
            self.persist().await;
        }
        appended
    }

    /// Sort `remote` by index (tolerates unordered input), reject if
    /// empty or invalid, then require it to be strictly longer than the
    /// local chain before replacing it. Ties go to the local chain, to
    /// avoid oscillation.
    pub async fn try_replace_chain(&self, mut remote: Vec<Block>) -> bool {
        if remote.is_empty() {
            return false;
        }
        remote.sort_by_key(|block| block.index);
        if !Chain::is_valid_chain(&remote) {
            return false;
        }

        let replaced = {
            let mut chain = self.chain.lock();
            if remote.len() > chain.len() {
                chain.replace(remote);
                true
            } else {
                false
            }
        };

        if replaced {
            self.persist().await;
        }
        replaced
    }

    async fn persist(&self) {
        let blocks = self.get_chain();
        if let Err(err) = self.store.save(&blocks).await {
            tracing::warn!(%err, "chain persistence failed, in-memory chain remains authoritative");
        }
    }

    async fn broadcast_block(&self, block: &Block) {
        self.transport.broadcast_block(block).await;
    }

    async fn broadcast_transaction(&self, tx: &Transaction) {
        self.transport.broadcast_transaction(tx).await;
    }

    /// Ask `peer` for their chain via the transport and atomically swap
    /// it in if it is longer and valid. This is the path a node takes
    /// after an inbound block is rejected, in case that means it is
    /// behind.
    pub async fn request_and_adopt_chain(&self, peer: &str) -> bool {
        match self.transport.request_chain(peer).await {
            Ok(remote) => self.try_replace_chain(remote).await,
            Err(err) => {
                tracing::warn!(%peer, %err, "chain request failed");
                false
            }
        }
    }
}

/// The inbound side of the node: a transport delivers messages here.
/// An inbound block that fails to append may mean we are behind, so we
/// ask the sender for their chain; duplicates and reorderings are
/// tolerated because every path re-validates through `Chain`.
#[async_trait]
impl InboundHandler for NodeCoordinator {
    async fn on_block(&self, block: Block) {
        if !self.try_accept_block(block.clone()).await {
            tracing::debug!(index = block.index, "inbound block rejected, requesting sender's chain");
        }
    }

    async fn on_transaction(&self, tx: Transaction) {
        let accepted = self.mempool.add(tx, |addr| self.get_balance(addr));
        if !accepted {
            tracing::debug!("inbound transaction rejected by mempool");
        }
    }

    async fn on_chain(&self, chain: Vec<Block>) {
        let _ = self.try_replace_chain(chain).await;
    }

    async fn on_chain_request(&self) -> Vec<Block> {
        self.get_chain()
    }
}

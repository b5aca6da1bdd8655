//! Crate root.
//!
//! `ledger-node` implements the consensus, mining and replication engine of
//! a Bitcoin-inspired proof-of-work blockchain node. The transport, store
//! and key-provider collaborators are abstract traits (see [`transport`],
//! [`store`], [`crypto`]); concrete implementations are provided for
//! running a real node but the core never depends on them directly.

pub mod blockchain;
pub mod config;
pub mod consensus;
pub mod crypto;
pub mod error;
pub mod hash;
pub mod mempool;
pub mod merkle;
pub mod miner;
pub mod node;
pub mod store;
pub mod transport;

pub use blockchain::{Block, Chain, Transaction};
pub use error::LedgerError;
pub use mempool::Mempool;
pub use miner::{MiningError, MiningOutcome};
pub use node::NodeCoordinator;

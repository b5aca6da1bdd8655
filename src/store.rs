//! Store: the persistence collaborator.
//!
//! `load()` returns a possibly-empty ordered list of blocks; `save()` is a
//! best-effort idempotent overwrite. No atomicity is promised beyond
//! last-writer-wins: the in-memory chain stays authoritative and the
//! caller decides whether to retry.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::blockchain::Block;
use crate::error::LedgerError;

/// The persistence capability set: load an ordered list of blocks
/// (possibly empty), and overwrite it.
#[async_trait]
pub trait Store: Send + Sync {
    async fn load(&self) -> Result<Vec<Block>, LedgerError>;
    async fn save(&self, blocks: &[Block]) -> Result<(), LedgerError>;
}

/// A concrete `Store` backed by a single JSON file on disk: an array of
/// block objects, `hash` never serialised, recomputed on load. This is a
/// reference implementation, not a hardened store — it keeps no
/// write-ahead log and performs a single whole-file overwrite per save.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Store for FileStore {
    /// An absent file is treated as an empty chain, not an error — a
    /// fresh node has nothing persisted yet.
    async fn load(&self) -> Result<Vec<Block>, LedgerError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(LedgerError::Store(err.to_string())),
        };
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|err| LedgerError::Store(err.to_string()))
    }

    async fn save(&self, blocks: &[Block]) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| LedgerError::Store(err.to_string()))?;
        }
        let json =
            serde_json::to_vec_pretty(blocks).map_err(|err| LedgerError::Store(err.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|err| LedgerError::Store(err.to_string()))
    }
}

/// An in-memory `Store` for tests and for running a node without disk
/// persistence (e.g. ephemeral local-testing nodes).
#[derive(Default)]
pub struct MemoryStore {
    blocks: parking_lot::Mutex<Vec<Block>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn load(&self) -> Result<Vec<Block>, LedgerError> {
        Ok(self.blocks.lock().clone())
    }

    async fn save(&self, blocks: &[Block]) -> Result<(), LedgerError> {
        *self.blocks.lock() = blocks.to_vec();
        Ok(())
    }
}

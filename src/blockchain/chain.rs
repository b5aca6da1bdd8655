//! Chain: an ordered block sequence with append/replace/validate.

use super::block::Block;
use crate::consensus::{validate_balances, validate_coinbase, validate_difficulty};

#[derive(Clone, Debug)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain {
    /// A chain initialised with the deterministic genesis block.
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::genesis()],
        }
    }

    /// Construct a chain directly from `blocks` without validation. Used
    /// by the store's load path and by tests; callers must validate with
    /// [`Chain::is_valid_chain`] first if the source is untrusted.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn latest(&self) -> &Block {
        self.blocks.last().expect("chain always has at least the genesis block")
    }

    /// Append `block` iff it extends the tip and passes every consensus
    /// rule. `false` and no mutation on any failure.
    pub fn append(&mut self, block: Block) -> bool {
        if block.previous_hash != self.latest().hash() {
            return false;
        }
        if block.index > 0
            && !(validate_coinbase(&block)
                && validate_difficulty(&block)
                && validate_balances(&self.blocks, &block))
        {
            return false;
        }
        self.blocks.push(block);
        true
    }

    /// Unconditional, caller-validated full replacement.
    pub fn replace(&mut self, new_blocks: Vec<Block>) {
        self.blocks = new_blocks;
    }

    /// For every `i >= 1`: previous-hash linkage, coinbase, difficulty and
    /// balance validity against the prefix `blocks[0..i)`. The genesis
    /// block (`i = 0`) is accepted unconditionally and must equal the
    /// fixed genesis value.
    pub fn is_valid_chain(blocks: &[Block]) -> bool {
        let Some(genesis) = blocks.first() else {
            return false;
        };
        if genesis != &Block::genesis() {
            return false;
        }
        for i in 1..blocks.len() {
            let block = &blocks[i];
            let preceding = &blocks[..i];
            let tip = &blocks[i - 1];
            if block.previous_hash != tip.hash() {
                return false;
            }
            if !validate_coinbase(block) || !validate_difficulty(block) {
                return false;
            }
            if !validate_balances(preceding, block) {
                return false;
            }
        }
        true
    }
}

//! Chain interface consumed by the block processor
//!
//! Fork choice, rollback and difficulty live behind this trait. `MemoryChain`
//! only tracks heights and the best tip.

use crate::types::*;
use crate::error::{ChainError, Result};
use crate::mempool::TransactionDescriptorIndex;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub trait Chain: Send + Sync {
    fn has_block(&self, block_hash: &Hash) -> Result<bool>;

    fn get_block(&self, block_hash: &Hash) -> Result<Option<(BlockInfo, Block)>>;

    /// Store a block whose parent is already stored. Returns true when the
    /// block became the best tip. Each call is atomic on its own.
    fn put_block(&self, block_hash: &Hash, block: &Block) -> Result<bool>;

    fn best_block_hash(&self) -> Result<Option<Hash>>;
}

#[derive(Default)]
struct ChainState {
    blocks: HashMap<Hash, (BlockInfo, Block)>,
    best: Option<(Hash, Natural)>,
}

/// In-memory chain: heights from the genesis block, best tip by height.
#[derive(Default)]
pub struct MemoryChain {
    state: RwLock<ChainState>,
    tx_desc_index: Option<Arc<TransactionDescriptorIndex>>,
}

impl MemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a descriptor for every transaction of each stored block.
    pub fn with_descriptor_index(tx_desc_index: Arc<TransactionDescriptorIndex>) -> Self {
        Self {
            state: RwLock::new(ChainState::default()),
            tx_desc_index: Some(tx_desc_index),
        }
    }

    pub fn height(&self, block_hash: &Hash) -> Option<Natural> {
        self.state
            .read()
            .blocks
            .get(block_hash)
            .map(|(info, _)| info.height)
    }

    pub fn len(&self) -> usize {
        self.state.read().blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().blocks.is_empty()
    }
}

impl Chain for MemoryChain {
    fn has_block(&self, block_hash: &Hash) -> Result<bool> {
        Ok(self.state.read().blocks.contains_key(block_hash))
    }

    fn get_block(&self, block_hash: &Hash) -> Result<Option<(BlockInfo, Block)>> {
        Ok(self.state.read().blocks.get(block_hash).cloned())
    }

    fn put_block(&self, block_hash: &Hash, block: &Block) -> Result<bool> {
        let mut state = self.state.write();

        if state.blocks.contains_key(block_hash) {
            debug!(block = %hash_hex(block_hash), "block already stored");
            return Ok(false);
        }

        let height = if block.header.is_genesis() {
            0
        } else {
            match state.blocks.get(&block.header.prev_block_hash) {
                Some((parent_info, _)) => parent_info.height + 1,
                None => {
                    return Err(ChainError::Storage(format!(
                        "Parent {} of block {} is not stored",
                        hash_hex(&block.header.prev_block_hash),
                        hash_hex(block_hash)
                    )))
                }
            }
        };

        let info = BlockInfo {
            height,
            block_header: block.header.clone(),
        };
        state.blocks.insert(*block_hash, (info, block.clone()));

        if let Some(index) = &self.tx_desc_index {
            for (i, tx) in block.transactions.iter().enumerate() {
                index.put_transaction_descriptor(
                    tx.hash(),
                    TransactionDescriptor {
                        block_hash: *block_hash,
                        index_in_block: i as Natural,
                    },
                );
            }
        }

        let is_best = match state.best {
            Some((_, best_height)) => height > best_height,
            None => true,
        };
        if is_best {
            state.best = Some((*block_hash, height));
            info!(block = %hash_hex(block_hash), height, "new best block");
        }
        Ok(is_best)
    }

    fn best_block_hash(&self) -> Result<Option<Hash>> {
        Ok(self.state.read().best.map(|(hash, _)| hash))
    }
}

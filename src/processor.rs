//! Block acceptance and orphan promotion
//!
//! A received block is either linked onto the chain (its parent is stored) or
//! parked in the orphanage until the missing ancestor arrives. Fork choice is
//! left to the `Chain` implementation.

use crate::types::*;
use crate::chain::Chain;
use crate::error::{ChainError, Result};
use crate::orphanage::BlockOrphanage;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of handing a received block to the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOutcome {
    /// The block waits for an ancestor; `orphan_root` is the block whose
    /// parent should be requested from peers.
    Orphaned { orphan_root: Hash },
    /// The block is on the chain. `promoted` lists orphans linked after it.
    Linked { best_tip: bool, promoted: Vec<Hash> },
}

pub struct BlockProcessor {
    chain: Arc<dyn Chain>,
    orphanage: Arc<BlockOrphanage>,
}

impl BlockProcessor {
    pub fn new(chain: Arc<dyn Chain>, orphanage: Arc<BlockOrphanage>) -> Self {
        Self { chain, orphanage }
    }

    /// Block stored on the chain. Orphans are not returned.
    pub fn get_block(&self, block_hash: &Hash) -> Result<Option<Block>> {
        Ok(self.chain.get_block(block_hash)?.map(|(_, block)| block))
    }

    /// Known either as an orphan or on the chain.
    pub fn exists(&self, block_hash: &Hash) -> Result<bool> {
        Ok(self.has_non_orphan(block_hash)? || self.has_orphan(block_hash))
    }

    pub fn has_orphan(&self, block_hash: &Hash) -> bool {
        self.orphanage.has_orphan(block_hash)
    }

    pub fn has_non_orphan(&self, block_hash: &Hash) -> Result<bool> {
        self.chain.has_block(block_hash)
    }

    pub fn put_orphan(&self, block: Block) {
        self.orphanage.put_orphan(block);
    }

    /// Earliest orphan ancestor of `block_hash` whose own parent is unknown.
    pub fn get_orphan_root(&self, block_hash: &Hash) -> Result<Hash> {
        Ok(self.orphanage.get_orphan_root(block_hash))
    }

    /// Hook for full block validation. Performs no checks.
    pub fn validate_block(&self, _block: &Block) -> Result<()> {
        Ok(())
    }

    /// AcceptBlock
    ///
    /// 1. Refuse the genesis block; it is stored on the chain directly
    /// 2. Parent on the chain: store the block and report whether it became the best tip
    /// 3. Otherwise keep the block as an orphan
    pub fn accept_block(&self, block_hash: &Hash, block: &Block) -> Result<bool> {
        // 1. Genesis
        if block.header.is_genesis() {
            return Err(ChainError::UnexpectedGenesis(hash_hex(block_hash)));
        }

        // 2. Parent known
        let parent_hash = &block.header.prev_block_hash;
        if self.chain.has_block(parent_hash)? {
            let best_tip = self.chain.put_block(block_hash, block)?;
            // A linked block is never also an orphan
            if self.orphanage.del_orphan(block) {
                debug!(block = %hash_hex(block_hash), "orphan record dropped after linking");
            }
            info!(block = %hash_hex(block_hash), best_tip, "block accepted");
            return Ok(best_tip);
        }

        // 3. Orphan
        debug!(
            block = %hash_hex(block_hash),
            parent = %hash_hex(parent_hash),
            "parent unknown, block kept as orphan"
        );
        self.orphanage.put_orphan(block.clone());
        Ok(false)
    }

    /// AcceptChildren
    ///
    /// Links every orphan descending from `parent_hash`, breadth first:
    /// 1. Pop a parent from the work list
    /// 2. Accept each orphan still depending on it, record it, queue it as a
    ///    parent and drop its orphan record
    /// 3. Drop the parent's dependency entry
    ///
    /// An orphan removed concurrently by another caller is skipped. The result
    /// holds each linked hash once, in the order first linked.
    pub fn accept_children(&self, parent_hash: &Hash) -> Result<Vec<Hash>> {
        if !self.chain.has_block(parent_hash)? {
            return Ok(Vec::new());
        }

        let mut accepted_children = Vec::new();
        let mut pending_parents = VecDeque::from([*parent_hash]);

        // 1. Work list
        while let Some(parent_hash) = pending_parents.pop_front() {
            // 2. Children
            for child_hash in self.orphanage.get_orphans_depending_on(&parent_hash) {
                let Some(child) = self.orphanage.get_orphan(&child_hash) else {
                    continue;
                };
                self.accept_block(&child_hash, &child)?;
                accepted_children.push(child_hash);
                pending_parents.push_back(child_hash);
                self.orphanage.del_orphan(&child);
            }

            // 3. Dependency entry
            self.orphanage.remove_dependencies_on(&parent_hash);
        }

        let mut seen = HashSet::with_capacity(accepted_children.len());
        accepted_children.retain(|hash| seen.insert(*hash));

        if !accepted_children.is_empty() {
            info!(
                parent = %hash_hex(parent_hash),
                promoted = accepted_children.len(),
                "orphan blocks linked"
            );
        }
        Ok(accepted_children)
    }

    /// Validate, accept, then either promote waiting orphans or report the
    /// ancestor to request.
    pub fn process_block(&self, block_hash: &Hash, block: &Block) -> Result<BlockOutcome> {
        self.validate_block(block)?;
        let best_tip = self.accept_block(block_hash, block)?;

        if self.has_non_orphan(block_hash)? {
            let promoted = self.accept_children(block_hash)?;
            Ok(BlockOutcome::Linked { best_tip, promoted })
        } else {
            let orphan_root = self.get_orphan_root(block_hash)?;
            Ok(BlockOutcome::Orphaned { orphan_root })
        }
    }
}

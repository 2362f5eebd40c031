//! Orphan blocks: received blocks whose parent is not yet in the chain

use crate::types::*;
use crate::config::OrphanConfig;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

struct OrphanEntry {
    sequence: u64,
    block: Block,
}

#[derive(Default)]
struct OrphanState {
    by_hash: HashMap<Hash, OrphanEntry>,
    /// Parent hash -> orphans declaring it, in arrival order
    by_parent: HashMap<Hash, Vec<Hash>>,
    /// Arrival sequence -> orphan hash, oldest first
    arrival: BTreeMap<u64, Hash>,
    next_sequence: u64,
}

impl OrphanState {
    fn remove(&mut self, block_hash: &Hash) -> Option<Block> {
        let entry = self.by_hash.remove(block_hash)?;
        self.arrival.remove(&entry.sequence);

        let parent_hash = entry.block.header.prev_block_hash;
        if let Some(children) = self.by_parent.get_mut(&parent_hash) {
            children.retain(|child| child != block_hash);
            if children.is_empty() {
                self.by_parent.remove(&parent_hash);
            }
        }
        Some(entry.block)
    }
}

/// Orphan blocks indexed by hash and by declared parent.
///
/// Both indexes live under one mutex so no caller can observe a block in one
/// and not the other.
pub struct BlockOrphanage {
    state: Mutex<OrphanState>,
    max_orphans: usize,
}

impl Default for BlockOrphanage {
    fn default() -> Self {
        Self::new(&OrphanConfig::default())
    }
}

impl BlockOrphanage {
    pub fn new(config: &OrphanConfig) -> Self {
        Self {
            state: Mutex::new(OrphanState::default()),
            max_orphans: config.max_orphans.max(1),
        }
    }

    /// Store `block` as an orphan. Returns false if it was already stored.
    pub fn put_orphan(&self, block: Block) -> bool {
        let block_hash = block.hash();
        let parent_hash = block.header.prev_block_hash;
        let mut state = self.state.lock();

        if state.by_hash.contains_key(&block_hash) {
            return false;
        }

        while state.by_hash.len() >= self.max_orphans {
            let Some(oldest) = state.arrival.values().next().copied() else {
                break;
            };
            state.remove(&oldest);
            warn!(
                orphan = %hash_hex(&oldest),
                max_orphans = self.max_orphans,
                "orphan limit reached, evicting oldest orphan"
            );
        }

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.arrival.insert(sequence, block_hash);
        state.by_parent.entry(parent_hash).or_default().push(block_hash);
        state.by_hash.insert(block_hash, OrphanEntry { sequence, block });

        debug!(
            block = %hash_hex(&block_hash),
            parent = %hash_hex(&parent_hash),
            "block stored as orphan"
        );
        true
    }

    pub fn get_orphan(&self, block_hash: &Hash) -> Option<Block> {
        self.state
            .lock()
            .by_hash
            .get(block_hash)
            .map(|entry| entry.block.clone())
    }

    pub fn has_orphan(&self, block_hash: &Hash) -> bool {
        self.state.lock().by_hash.contains_key(block_hash)
    }

    /// Remove `block`. Returns false if another caller removed it first.
    pub fn del_orphan(&self, block: &Block) -> bool {
        self.state.lock().remove(&block.hash()).is_some()
    }

    /// Hashes of the orphans that declare `parent_hash` as their parent.
    pub fn get_orphans_depending_on(&self, parent_hash: &Hash) -> Vec<Hash> {
        self.state
            .lock()
            .by_parent
            .get(parent_hash)
            .cloned()
            .unwrap_or_default()
    }

    /// Forget the dependency entry of `parent_hash`. The orphans stay stored.
    pub fn remove_dependencies_on(&self, parent_hash: &Hash) {
        self.state.lock().by_parent.remove(parent_hash);
    }

    /// Follow declared parents from `block_hash` while the parent is itself an
    /// orphan; the result is the orphan whose parent is missing everywhere.
    pub fn get_orphan_root(&self, block_hash: &Hash) -> Hash {
        let state = self.state.lock();
        let mut root = *block_hash;
        while let Some(entry) = state.by_hash.get(&root) {
            let parent_hash = entry.block.header.prev_block_hash;
            if !state.by_hash.contains_key(&parent_hash) {
                break;
            }
            root = parent_hash;
        }
        root
    }

    pub fn len(&self) -> usize {
        self.state.lock().by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().by_hash.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_on(parent: Hash, nonce: u32) -> Block {
        Block {
            header: BlockHeader {
                version: 1,
                prev_block_hash: parent,
                merkle_root: [0; 32],
                timestamp: 1_700_000_000,
                bits: 0x207fffff,
                nonce,
            },
            transactions: vec![],
        }
    }

    #[test]
    fn test_put_and_lookup() {
        let orphanage = BlockOrphanage::default();
        let block = block_on([1; 32], 0);
        let hash = block.hash();

        assert!(orphanage.put_orphan(block.clone()));
        assert!(!orphanage.put_orphan(block.clone()));
        assert!(orphanage.has_orphan(&hash));
        assert_eq!(orphanage.get_orphan(&hash), Some(block));
        assert_eq!(orphanage.get_orphans_depending_on(&[1; 32]), vec![hash]);
        assert_eq!(orphanage.len(), 1);
    }

    #[test]
    fn test_del_is_idempotent() {
        let orphanage = BlockOrphanage::default();
        let block = block_on([1; 32], 0);
        orphanage.put_orphan(block.clone());

        assert!(orphanage.del_orphan(&block));
        assert!(!orphanage.del_orphan(&block));
        assert!(orphanage.get_orphans_depending_on(&[1; 32]).is_empty());
        assert!(orphanage.is_empty());
    }

    #[test]
    fn test_remove_dependencies_keeps_orphans() {
        let orphanage = BlockOrphanage::default();
        let a = block_on([1; 32], 0);
        let b = block_on([1; 32], 1);
        orphanage.put_orphan(a.clone());
        orphanage.put_orphan(b.clone());

        assert_eq!(orphanage.get_orphans_depending_on(&[1; 32]), vec![a.hash(), b.hash()]);
        orphanage.remove_dependencies_on(&[1; 32]);
        assert!(orphanage.get_orphans_depending_on(&[1; 32]).is_empty());
        assert!(orphanage.has_orphan(&a.hash()));
        assert!(orphanage.has_orphan(&b.hash()));
    }

    #[test]
    fn test_orphan_root_walks_to_earliest_orphan() {
        let orphanage = BlockOrphanage::default();
        let b1 = block_on([7; 32], 0);
        let b2 = block_on(b1.hash(), 0);
        let b3 = block_on(b2.hash(), 0);
        let side = block_on(b1.hash(), 1);
        for block in [&b3, &side, &b1, &b2] {
            orphanage.put_orphan(block.clone());
        }

        assert_eq!(orphanage.get_orphan_root(&b3.hash()), b1.hash());
        assert_eq!(orphanage.get_orphan_root(&side.hash()), b1.hash());
        assert_eq!(orphanage.get_orphan_root(&b1.hash()), b1.hash());
        assert_eq!(orphanage.get_orphan_root(&[9; 32]), [9; 32]);
    }

    #[test]
    fn test_limit_evicts_oldest() {
        let orphanage = BlockOrphanage::new(&OrphanConfig { max_orphans: 2 });
        let first = block_on([1; 32], 0);
        let second = block_on([2; 32], 0);
        let third = block_on([3; 32], 0);
        orphanage.put_orphan(first.clone());
        orphanage.put_orphan(second.clone());
        orphanage.put_orphan(third.clone());

        assert_eq!(orphanage.len(), 2);
        assert!(!orphanage.has_orphan(&first.hash()));
        assert!(orphanage.get_orphans_depending_on(&[1; 32]).is_empty());
        assert!(orphanage.has_orphan(&second.hash()));
        assert!(orphanage.has_orphan(&third.hash()));
    }
}

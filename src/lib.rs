//! # Chain-Core
//!
//! Chain-extension core of a full node: block template assembly and block
//! acceptance with orphan handling.
//!
//! ## Architecture
//!
//! Leaves first:
//! - Coin views (durable lookup plus a transient scratch overlay)
//! - Transaction pool and confirmed-transaction descriptor index
//! - Attachment validator (dry run and commit over one validation core)
//! - Readiness queue (fee-ordered)
//! - Block template assembler
//! - Orphan store and block processor
//!
//! Storage, the chain itself and script validation are collaborators behind
//! traits; in-memory implementations are provided for each.
//!
//! ## Design Principles
//!
//! 1. **Scratch state never leaks**: template assembly runs inside an abort-only scope
//! 2. **Dependency order**: a transaction is selected only after its in-block parents
//! 3. **Explicit context**: `ChainCore` is constructed, never global
//! 4. **Exact Version Pinning**: consensus-critical dependencies pinned to exact versions
//!
//! ## Usage
//!
//! ```rust
//! use chain_core::{ChainCore, CoinbaseData, MinerAddress, NodeConfig, UtxoSet, MAX_BLOCK_SIZE};
//!
//! let core = ChainCore::in_memory(NodeConfig::default(), UtxoSet::new());
//! let template = core
//!     .get_block_template(
//!         &CoinbaseData::new(b"hello".to_vec()),
//!         &MinerAddress::from_pubkey_hash([0; 20]),
//!         MAX_BLOCK_SIZE,
//!     )
//!     .unwrap();
//! assert_eq!(template.transaction_count(), 1);
//! ```

pub mod types;
pub mod constants;
pub mod error;
pub mod codec;
pub mod transaction;
pub mod coins;
pub mod storage;
pub mod mempool;
pub mod magnet;
pub mod priority;
pub mod mining;
pub mod orphanage;
pub mod chain;
pub mod processor;
pub mod config;

// Re-export commonly used types
pub use types::*;
pub use constants::*;
pub use error::{ChainError, Result};
pub use chain::{Chain, MemoryChain};
pub use coins::{CoinView, ScratchCoinView};
pub use config::{MiningConfig, NodeConfig, OrphanConfig, PoolConfig};
pub use mempool::{TransactionDescriptorIndex, TransactionPool};
pub use mining::{BlockMining, BlockTemplate};
pub use orphanage::BlockOrphanage;
pub use priority::PriorityPolicy;
pub use processor::{BlockOutcome, BlockProcessor};
pub use storage::{Database, MemoryDatabase};
pub use transaction::{CoinbaseData, MinerAddress};

use std::sync::Arc;

/// Node context wiring the pool, the miner and the block processor to shared
/// collaborators.
///
/// # Examples
///
/// ```
/// use chain_core::*;
/// use std::sync::Arc;
///
/// let tx_desc_index = Arc::new(TransactionDescriptorIndex::new());
/// let chain = Arc::new(MemoryChain::with_descriptor_index(tx_desc_index.clone()));
/// let core = ChainCore::new(
///     NodeConfig::default(),
///     Arc::new(MemoryDatabase::new()),
///     Arc::new(UtxoSet::new()),
///     chain,
///     tx_desc_index,
/// );
/// assert!(core.pool().is_empty());
/// ```
pub struct ChainCore {
    config: NodeConfig,
    chain: Arc<dyn Chain>,
    pool: Arc<TransactionPool>,
    tx_desc_index: Arc<TransactionDescriptorIndex>,
    orphanage: Arc<BlockOrphanage>,
    mining: BlockMining,
    processor: BlockProcessor,
}

impl ChainCore {
    pub fn new(
        config: NodeConfig,
        db: Arc<dyn Database>,
        coins_view: Arc<dyn CoinView>,
        chain: Arc<dyn Chain>,
        tx_desc_index: Arc<TransactionDescriptorIndex>,
    ) -> Self {
        let pool = Arc::new(TransactionPool::new(&config.pool));
        let orphanage = Arc::new(BlockOrphanage::new(&config.orphans));
        let mining = BlockMining::new(
            db,
            tx_desc_index.clone(),
            pool.clone(),
            coins_view,
            config.mining.clone(),
        );
        let processor = BlockProcessor::new(chain.clone(), orphanage.clone());

        Self {
            config,
            chain,
            pool,
            tx_desc_index,
            orphanage,
            mining,
            processor,
        }
    }

    /// Context backed entirely by the in-memory collaborators.
    pub fn in_memory(config: NodeConfig, utxo_set: UtxoSet) -> Self {
        let tx_desc_index = Arc::new(TransactionDescriptorIndex::new());
        let chain = Arc::new(MemoryChain::with_descriptor_index(tx_desc_index.clone()));
        Self::new(
            config,
            Arc::new(MemoryDatabase::new()),
            Arc::new(utxo_set),
            chain,
            tx_desc_index,
        )
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn chain(&self) -> &Arc<dyn Chain> {
        &self.chain
    }

    pub fn pool(&self) -> &Arc<TransactionPool> {
        &self.pool
    }

    pub fn descriptor_index(&self) -> &Arc<TransactionDescriptorIndex> {
        &self.tx_desc_index
    }

    pub fn orphanage(&self) -> &Arc<BlockOrphanage> {
        &self.orphanage
    }

    pub fn mining(&self) -> &BlockMining {
        &self.mining
    }

    pub fn processor(&self) -> &BlockProcessor {
        &self.processor
    }

    /// Store the genesis block. It bypasses the processor, which refuses it.
    pub fn store_genesis_block(&self, genesis: &Block) -> Result<bool> {
        if !genesis.header.is_genesis() {
            return Err(ChainError::InvalidBlock(format!(
                "{} has a parent and is not a genesis block",
                hash_hex(&genesis.hash())
            )));
        }
        self.chain.put_block(&genesis.hash(), genesis)
    }

    /// Admit a transaction into the pool, returning its hash.
    pub fn submit_transaction(&self, tx: Transaction) -> Result<Hash> {
        let tx_hash = tx.hash();
        self.pool.add_transaction(tx_hash, tx)?;
        Ok(tx_hash)
    }

    pub fn get_block_template(
        &self,
        coinbase_data: &CoinbaseData,
        miner_address: &MinerAddress,
        max_block_size: usize,
    ) -> Result<BlockTemplate> {
        self.mining
            .get_block_template(coinbase_data, miner_address, max_block_size)
    }

    pub fn process_block(&self, block: &Block) -> Result<BlockOutcome> {
        self.processor.process_block(&block.hash(), block)
    }
}

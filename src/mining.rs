//! Block template assembly

use crate::types::*;
use crate::constants::*;
use crate::codec::{encode_varint, encoded_size, merkle_root};
use crate::coins::{CoinView, ScratchCoinView};
use crate::config::MiningConfig;
use crate::error::{ChainError, Result};
use crate::magnet::TransactionMagnet;
use crate::mempool::{TransactionDescriptorIndex, TransactionPool};
use crate::priority::TransactionPriorityQueue;
use crate::storage::{Database, ScratchScope};
use crate::transaction::{new_generation_transaction, CoinbaseData, MinerAddress};
use std::sync::Arc;
use tracing::{debug, error, info};

/// BlockTemplate: everything except the header fields a miner varies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTemplate {
    pub difficulty_bits: u32,
    /// Generation transaction first, then dependency-ordered selections
    pub transactions: Vec<Transaction>,
}

impl BlockTemplate {
    pub fn generation_transaction(&self) -> &Transaction {
        &self.transactions[0]
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Exact serialized size of a block built from this template.
    pub fn serialized_size(&self) -> usize {
        BLOCK_HEADER_SIZE
            + encode_varint(self.transactions.len() as u64).len()
            + self.transactions.iter().map(encoded_size).sum::<usize>()
    }

    /// Block on top of `prev_block_hash` with nonce 0.
    pub fn into_block(self, prev_block_hash: Hash, timestamp: u32) -> Result<Block> {
        let merkle_root = merkle_root(&self.transactions)?;
        Ok(Block {
            header: BlockHeader {
                version: 1,
                prev_block_hash,
                merkle_root,
                timestamp,
                bits: self.difficulty_bits,
                nonce: 0,
            },
            transactions: self.transactions,
        })
    }
}

/// Builds block templates from the transaction pool.
pub struct BlockMining {
    db: Arc<dyn Database>,
    tx_desc_index: Arc<TransactionDescriptorIndex>,
    transaction_pool: Arc<TransactionPool>,
    coins_view: Arc<dyn CoinView>,
    magnet: TransactionMagnet,
    config: MiningConfig,
}

impl BlockMining {
    pub fn new(
        db: Arc<dyn Database>,
        tx_desc_index: Arc<TransactionDescriptorIndex>,
        transaction_pool: Arc<TransactionPool>,
        coins_view: Arc<dyn CoinView>,
        config: MiningConfig,
    ) -> Self {
        Self {
            db,
            tx_desc_index,
            transaction_pool,
            coins_view,
            magnet: TransactionMagnet::new(),
            config,
        }
    }

    pub fn config(&self) -> &MiningConfig {
        &self.config
    }

    /// GetBlockTemplate
    ///
    /// 1. Fetch the oldest `max_block_size / bytes_per_transaction` pool transactions
    /// 2. Evict candidates that are already confirmed in a block
    /// 3. Build the generation transaction
    /// 4. Select and order the remaining candidates
    pub fn get_block_template(
        &self,
        coinbase_data: &CoinbaseData,
        miner_address: &MinerAddress,
        max_block_size: usize,
    ) -> Result<BlockTemplate> {
        // 1. Candidates in arrival order
        let estimated_transaction_count = max_block_size / self.config.bytes_per_transaction.max(1);
        let candidate_transactions = self
            .transaction_pool
            .get_oldest_transactions(estimated_transaction_count);
        let candidate_tx_count = candidate_transactions.len();

        // 2. A descriptor means the transaction already sits in an accepted block
        let (stale_transactions, valid_transactions): (Vec<_>, Vec<_>) = candidate_transactions
            .into_iter()
            .partition(|(tx_hash, _)| self.tx_desc_index.contains(tx_hash));

        for (tx_hash, _) in &stale_transactions {
            debug!(tx = %hash_hex(tx_hash), "evicting confirmed transaction from pool");
            self.transaction_pool.remove_transaction(tx_hash);
        }
        let valid_tx_count = valid_transactions.len();

        // 3. Generation transaction
        let generation_transaction =
            new_generation_transaction(coinbase_data, miner_address, self.config.coinbase_reward);

        // 4. Selection
        let (tx_count, sorted_transactions) =
            self.select_transactions(generation_transaction, valid_transactions, max_block_size)?;

        info!(
            candidate_tx_count,
            valid_tx_count,
            stale_tx_count = stale_transactions.len(),
            selected_tx_count = tx_count - 1,
            "block template assembled"
        );

        Ok(BlockTemplate {
            difficulty_bits: self.config.difficulty_bits,
            transactions: sorted_transactions,
        })
    }

    /// SelectTransactions
    ///
    /// Orders transactions by dependency, then by priority, keeping the running
    /// serialized size within `max_block_size`:
    /// 1. Start from the generation transaction and a scratch scope + coin view
    /// 2. Move every candidate that passes a dry-run attach into the ready queue,
    ///    giving up on a scan after `max_consecutive_unattachable` misses in a row
    /// 3. Pop the best ready transaction; stop if there is none
    /// 4. Count its size; if the block still fits, attach it to the scratch state
    ///    so its dependents become attachable on the next scan
    /// 5. Stop once the running size exceeds the limit
    ///
    /// The running size includes the last popped transaction even when it did not
    /// fit, which ends the selection at the first transaction that overflows.
    /// The scratch scope is never committed.
    pub fn select_transactions(
        &self,
        generation_transaction: Transaction,
        candidates: Vec<(Hash, Transaction)>,
        max_block_size: usize,
    ) -> Result<(usize, Vec<Transaction>)> {
        let mut candidates = candidates;

        // 1. Baseline
        let mut serialized_block_size =
            BLOCK_HEADER_SIZE + MAX_VARINT_SIZE + encoded_size(&generation_transaction);
        let mut selected_transactions = vec![generation_transaction];

        let mut scope = ScratchScope::begin(self.db.as_ref())?;
        let mut coins_view = ScratchCoinView::new(self.coins_view.as_ref());
        let mut tx_queue = TransactionPriorityQueue::new(self.config.priority);

        loop {
            // 2. Scan for attachable candidates
            let max_consecutive_unattachable = self.config.max_consecutive_unattachable.max(1);
            let mut consecutive_unattachable = 0;
            let mut i = 0;
            while consecutive_unattachable < max_consecutive_unattachable && i < candidates.len() {
                let (tx_hash, tx) = &candidates[i];
                match self.magnet.check_transaction(&scope, &coins_view, tx_hash, tx) {
                    Ok(()) => {
                        let (tx_hash, tx) = candidates.remove(i);
                        match tx_queue.enqueue(&coins_view, tx_hash, tx) {
                            Ok(()) => consecutive_unattachable = 0,
                            // Unpriceable; dropped from this pass, kept in the pool
                            Err(e) if e.is_not_attachable() => {
                                debug!(tx = %hash_hex(&tx_hash), error = %e, "skipping candidate");
                                consecutive_unattachable += 1;
                            }
                            Err(e) => return Err(e),
                        }
                    }
                    Err(e) if e.is_not_attachable() => {
                        consecutive_unattachable += 1;
                        i += 1;
                    }
                    Err(e) => return Err(e),
                }
            }

            // 3. Best ready transaction
            let Some((tx_hash, tx)) = tx_queue.dequeue() else {
                break;
            };

            // 4. Size accounting before the fit check
            serialized_block_size += encoded_size(&tx);
            if serialized_block_size <= max_block_size {
                self.magnet
                    .apply_transaction(&mut scope, &mut coins_view, tx_hash, &tx)
                    .map_err(|e| {
                        error!(tx = %hash_hex(&tx_hash), error = %e, "attach failed after a successful dry run");
                        ChainError::CommitPhaseAttachFailure(format!("{}: {}", hash_hex(&tx_hash), e))
                    })?;
                selected_transactions.push(tx);
            }

            // 5. Budget exhausted
            if serialized_block_size > max_block_size {
                break;
            }
        }

        scope.abort();

        Ok((selected_transactions.len(), selected_transactions))
    }
}

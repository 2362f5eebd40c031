//! Transaction pool and confirmed-transaction descriptor index
//!
//! Both are shared between peer handlers and the miner, so each owns a single
//! lock and every read returns a consistent snapshot.

use crate::types::*;
use crate::config::PoolConfig;
use crate::error::{ChainError, Result};
use crate::transaction::is_coinbase;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

struct PoolEntry {
    sequence: u64,
    transaction: Transaction,
}

#[derive(Default)]
struct PoolState {
    transactions: HashMap<Hash, PoolEntry>,
    /// Arrival sequence -> transaction hash
    time_index: BTreeMap<u64, Hash>,
    /// Out-points spent by pooled transactions -> spender
    spent: HashMap<OutPoint, Hash>,
    next_sequence: u64,
}

/// Pending transactions ordered by arrival.
pub struct TransactionPool {
    state: RwLock<PoolState>,
    max_transactions: usize,
}

impl Default for TransactionPool {
    fn default() -> Self {
        Self::new(&PoolConfig::default())
    }
}

impl TransactionPool {
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            state: RwLock::new(PoolState::default()),
            max_transactions: config.max_transactions,
        }
    }

    /// AddTransactionToPool
    ///
    /// 1. Reject generation transactions
    /// 2. Reject duplicates
    /// 3. Reject transactions spending an out-point another pooled transaction spends
    /// 4. Reject when the pool is full
    /// 5. Record the arrival sequence
    pub fn add_transaction(&self, tx_hash: Hash, tx: Transaction) -> Result<()> {
        // 1. Coinbase transactions only live inside blocks
        if is_coinbase(&tx) {
            return Err(ChainError::PoolRejected(format!(
                "Generation transaction {} cannot enter the pool",
                hash_hex(&tx_hash)
            )));
        }

        let mut state = self.state.write();

        // 2. Duplicate check
        if state.transactions.contains_key(&tx_hash) {
            return Err(ChainError::DuplicateTransaction(hash_hex(&tx_hash)));
        }

        // 3. Conflict check
        for input in &tx.inputs {
            if let Some(spender) = state.spent.get(&input.prevout) {
                return Err(ChainError::PoolConflict(format!(
                    "{} spends {}:{} already spent by {}",
                    hash_hex(&tx_hash),
                    hash_hex(&input.prevout.hash),
                    input.prevout.index,
                    hash_hex(spender)
                )));
            }
        }

        // 4. Capacity
        if state.transactions.len() >= self.max_transactions {
            return Err(ChainError::PoolRejected(format!(
                "Pool is full ({} transactions)",
                self.max_transactions
            )));
        }

        // 5. Insert
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        for input in &tx.inputs {
            state.spent.insert(input.prevout, tx_hash);
        }
        state.time_index.insert(sequence, tx_hash);
        state.transactions.insert(tx_hash, PoolEntry { sequence, transaction: tx });

        debug!(tx = %hash_hex(&tx_hash), sequence, "transaction added to pool");
        Ok(())
    }

    /// Up to `count` transactions, oldest arrival first.
    pub fn get_oldest_transactions(&self, count: usize) -> Vec<(Hash, Transaction)> {
        let state = self.state.read();
        state
            .time_index
            .values()
            .take(count)
            .filter_map(|hash| {
                state
                    .transactions
                    .get(hash)
                    .map(|entry| (*hash, entry.transaction.clone()))
            })
            .collect()
    }

    pub fn get_transaction(&self, tx_hash: &Hash) -> Option<Transaction> {
        self.state
            .read()
            .transactions
            .get(tx_hash)
            .map(|entry| entry.transaction.clone())
    }

    pub fn contains(&self, tx_hash: &Hash) -> bool {
        self.state.read().transactions.contains_key(tx_hash)
    }

    /// Returns false when the transaction was not pooled.
    pub fn remove_transaction(&self, tx_hash: &Hash) -> bool {
        let mut state = self.state.write();
        let Some(entry) = state.transactions.remove(tx_hash) else {
            return false;
        };

        state.time_index.remove(&entry.sequence);
        for input in &entry.transaction.inputs {
            if state.spent.get(&input.prevout) == Some(tx_hash) {
                state.spent.remove(&input.prevout);
            }
        }

        debug!(tx = %hash_hex(tx_hash), "transaction removed from pool");
        true
    }

    pub fn len(&self) -> usize {
        self.state.read().transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().transactions.is_empty()
    }
}

/// Index of transactions confirmed inside accepted blocks.
#[derive(Default)]
pub struct TransactionDescriptorIndex {
    descriptors: RwLock<HashMap<Hash, TransactionDescriptor>>,
}

impl TransactionDescriptorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_transaction_descriptor(&self, tx_hash: Hash, descriptor: TransactionDescriptor) {
        self.descriptors.write().insert(tx_hash, descriptor);
    }

    pub fn get_transaction_descriptor(&self, tx_hash: &Hash) -> Option<TransactionDescriptor> {
        self.descriptors.read().get(tx_hash).cloned()
    }

    pub fn del_transaction_descriptor(&self, tx_hash: &Hash) -> bool {
        self.descriptors.write().remove(tx_hash).is_some()
    }

    pub fn contains(&self, tx_hash: &Hash) -> bool {
        self.descriptors.read().contains_key(tx_hash)
    }

    pub fn len(&self) -> usize {
        self.descriptors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spend(hash: Hash, index: u32, value: Integer) -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![TransactionInput {
                prevout: OutPoint { hash, index },
                script_sig: vec![0x51],
                sequence: 0xffffffff,
            }],
            outputs: vec![TransactionOutput { value, script_pubkey: vec![0x51] }],
            lock_time: 0,
        }
    }

    #[test]
    fn test_oldest_transactions_follow_arrival_order() {
        let pool = TransactionPool::default();
        let txs: Vec<Transaction> = (1..=4u8).map(|i| spend([i; 32], 0, 100)).collect();
        for tx in &txs {
            pool.add_transaction(tx.hash(), tx.clone()).unwrap();
        }

        let oldest = pool.get_oldest_transactions(3);
        assert_eq!(oldest.len(), 3);
        for (i, (hash, tx)) in oldest.iter().enumerate() {
            assert_eq!(*hash, txs[i].hash());
            assert_eq!(tx, &txs[i]);
        }
    }

    #[test]
    fn test_duplicate_rejected() {
        let pool = TransactionPool::default();
        let tx = spend([1; 32], 0, 100);
        pool.add_transaction(tx.hash(), tx.clone()).unwrap();
        let result = pool.add_transaction(tx.hash(), tx);
        assert!(matches!(result, Err(ChainError::DuplicateTransaction(_))));
    }

    #[test]
    fn test_conflicting_spend_rejected_until_removed() {
        let pool = TransactionPool::default();
        let first = spend([1; 32], 0, 100);
        let second = spend([1; 32], 0, 90);
        pool.add_transaction(first.hash(), first.clone()).unwrap();

        let result = pool.add_transaction(second.hash(), second.clone());
        assert!(matches!(result, Err(ChainError::PoolConflict(_))));

        assert!(pool.remove_transaction(&first.hash()));
        pool.add_transaction(second.hash(), second).unwrap();
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_coinbase_rejected() {
        let pool = TransactionPool::default();
        let coinbase = spend(NULL_HASH, 0xffffffff, 100);
        let result = pool.add_transaction(coinbase.hash(), coinbase);
        assert!(matches!(result, Err(ChainError::PoolRejected(_))));
    }

    #[test]
    fn test_capacity_enforced() {
        let pool = TransactionPool::new(&PoolConfig { max_transactions: 1 });
        let first = spend([1; 32], 0, 100);
        let second = spend([2; 32], 0, 100);
        pool.add_transaction(first.hash(), first).unwrap();
        let result = pool.add_transaction(second.hash(), second);
        assert!(matches!(result, Err(ChainError::PoolRejected(_))));
    }

    #[test]
    fn test_remove_missing_is_false() {
        let pool = TransactionPool::default();
        assert!(!pool.remove_transaction(&[5; 32]));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_descriptor_index() {
        let index = TransactionDescriptorIndex::new();
        let descriptor = TransactionDescriptor { block_hash: [3; 32], index_in_block: 1 };
        index.put_transaction_descriptor([1; 32], descriptor.clone());

        assert_eq!(index.get_transaction_descriptor(&[1; 32]), Some(descriptor));
        assert!(index.get_transaction_descriptor(&[2; 32]).is_none());
        assert!(index.del_transaction_descriptor(&[1; 32]));
        assert!(index.is_empty());
    }
}

//! Coin views: read-only output lookup and the scratch overlay used while mining

use crate::types::*;
use crate::error::Result;
use std::collections::{BTreeMap, HashMap};

/// Resolve an unspent output by its out-point.
///
/// A durable implementation answers `None` for outputs that do not exist or are
/// already spent by a confirmed transaction.
pub trait CoinView: Send + Sync {
    fn resolve(&self, outpoint: &OutPoint) -> Result<Option<TransactionOutput>>;
}

impl CoinView for UtxoSet {
    fn resolve(&self, outpoint: &OutPoint) -> Result<Option<TransactionOutput>> {
        Ok(self.get(outpoint).cloned())
    }
}

/// A coin view decorated with an in-memory pool of staged transactions.
///
/// Lookups hit the staged pool first and fall back to the wrapped view, so a
/// chain of dependent transactions can be simulated without persisting any
/// intermediate state. Dropping the view discards everything staged.
pub struct ScratchCoinView<'a> {
    coins_view: &'a dyn CoinView,
    pool: HashMap<Hash, Transaction>,
    time_index: BTreeMap<u64, Hash>,
    next_sequence: u64,
}

impl<'a> ScratchCoinView<'a> {
    pub fn new(coins_view: &'a dyn CoinView) -> Self {
        Self {
            coins_view,
            pool: HashMap::new(),
            time_index: BTreeMap::new(),
            next_sequence: 0,
        }
    }

    /// Make the outputs of `tx` resolvable through this view.
    pub fn stage(&mut self, tx_hash: Hash, tx: Transaction) {
        if self.pool.insert(tx_hash, tx).is_none() {
            self.time_index.insert(self.next_sequence, tx_hash);
            self.next_sequence += 1;
        }
    }

    pub fn contains(&self, tx_hash: &Hash) -> bool {
        self.pool.contains_key(tx_hash)
    }

    /// Staged transactions in staging order.
    pub fn staged_transactions(&self) -> Vec<(Hash, &Transaction)> {
        self.time_index
            .values()
            .filter_map(|hash| self.pool.get(hash).map(|tx| (*hash, tx)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}

impl CoinView for ScratchCoinView<'_> {
    fn resolve(&self, outpoint: &OutPoint) -> Result<Option<TransactionOutput>> {
        let staged = self
            .pool
            .get(&outpoint.hash)
            .and_then(|tx| tx.outputs.get(outpoint.index as usize));

        match staged {
            Some(output) => Ok(Some(output.clone())),
            None => self.coins_view.resolve(outpoint),
        }
    }
}

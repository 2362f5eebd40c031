//! Transaction attachment against a database scope and a coin view
//!
//! `check_transaction` and `apply_transaction` run the same validation;
//! only the latter mutates anything.

use crate::types::*;
use crate::codec::{decode_in_point, encode_in_point, outpoint_key};
use crate::coins::{CoinView, ScratchCoinView};
use crate::error::{ChainError, Result};
use crate::storage::{ScratchScope, SPENT_OUTPOINT_PREFIX};
use crate::transaction::is_coinbase;
use std::collections::HashSet;

#[derive(Debug, Default, Clone, Copy)]
pub struct TransactionMagnet;

impl TransactionMagnet {
    pub fn new() -> Self {
        Self
    }

    /// Attach `tx`, or only verify that it could be attached when `check_only` is set.
    pub fn attach_transaction(
        &self,
        scope: &mut ScratchScope<'_>,
        coins_view: &mut ScratchCoinView<'_>,
        tx_hash: Hash,
        tx: &Transaction,
        check_only: bool,
    ) -> Result<()> {
        if check_only {
            self.check_transaction(scope, coins_view, &tx_hash, tx)
        } else {
            self.apply_transaction(scope, coins_view, tx_hash, tx)
        }
    }

    /// Dry run: validate without mutating the scope or the view.
    pub fn check_transaction(
        &self,
        scope: &ScratchScope<'_>,
        coins_view: &ScratchCoinView<'_>,
        tx_hash: &Hash,
        tx: &Transaction,
    ) -> Result<()> {
        validate_attachable(scope, coins_view, tx_hash, tx)
    }

    /// Validate, then mark the consumed out-points spent and stage the outputs.
    pub fn apply_transaction(
        &self,
        scope: &mut ScratchScope<'_>,
        coins_view: &mut ScratchCoinView<'_>,
        tx_hash: Hash,
        tx: &Transaction,
    ) -> Result<()> {
        validate_attachable(scope, coins_view, &tx_hash, tx)?;

        for (i, input) in tx.inputs.iter().enumerate() {
            let spender = InPoint {
                hash: tx_hash,
                index: i as u32,
            };
            scope.put(
                &outpoint_key(SPENT_OUTPOINT_PREFIX, &input.prevout),
                &encode_in_point(&spender),
            )?;
        }

        coins_view.stage(tx_hash, tx.clone());
        Ok(())
    }

    /// The in-point that spent `outpoint` inside `scope`, if any.
    pub fn spent_by(&self, scope: &ScratchScope<'_>, outpoint: &OutPoint) -> Result<Option<InPoint>> {
        spent_by(scope, outpoint)
    }
}

fn spent_by(scope: &ScratchScope<'_>, outpoint: &OutPoint) -> Result<Option<InPoint>> {
    match scope.get(&outpoint_key(SPENT_OUTPOINT_PREFIX, outpoint))? {
        Some(value) => Ok(Some(decode_in_point(&value)?)),
        None => Ok(None),
    }
}

fn validate_attachable(
    scope: &ScratchScope<'_>,
    coins_view: &ScratchCoinView<'_>,
    tx_hash: &Hash,
    tx: &Transaction,
) -> Result<()> {
    let not_attachable = |reason: String| {
        Err(ChainError::NotAttachable(format!("{}: {}", hash_hex(tx_hash), reason)))
    };

    if is_coinbase(tx) {
        return not_attachable("generation transaction".to_string());
    }

    if coins_view.contains(tx_hash) {
        return not_attachable("already attached".to_string());
    }

    let mut seen = HashSet::with_capacity(tx.inputs.len());
    for (i, input) in tx.inputs.iter().enumerate() {
        let prevout = &input.prevout;

        if !seen.insert(*prevout) {
            return not_attachable(format!("input {} repeats an out-point", i));
        }

        if coins_view.resolve(prevout)?.is_none() {
            return not_attachable(format!(
                "input {} references missing output {}:{}",
                i,
                hash_hex(&prevout.hash),
                prevout.index
            ));
        }

        if let Some(spender) = spent_by(scope, prevout)? {
            return not_attachable(format!(
                "input {} spends {}:{} already spent by {}",
                i,
                hash_hex(&prevout.hash),
                prevout.index,
                hash_hex(&spender.hash)
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryDatabase;

    fn spend(prevouts: &[OutPoint], value: Integer) -> Transaction {
        Transaction {
            version: 1,
            inputs: prevouts
                .iter()
                .map(|prevout| TransactionInput { prevout: *prevout, script_sig: vec![], sequence: 0xffffffff })
                .collect(),
            outputs: vec![TransactionOutput { value, script_pubkey: vec![0x51] }],
            lock_time: 0,
        }
    }

    fn funded_set() -> (UtxoSet, OutPoint) {
        let mut utxo_set = UtxoSet::new();
        let outpoint = OutPoint { hash: [1; 32], index: 0 };
        utxo_set.insert(outpoint, TransactionOutput { value: 1000, script_pubkey: vec![] });
        (utxo_set, outpoint)
    }

    #[test]
    fn test_check_only_does_not_mutate() {
        let db = MemoryDatabase::new();
        let (utxo_set, outpoint) = funded_set();
        let mut scope = ScratchScope::begin(&db).unwrap();
        let mut view = ScratchCoinView::new(&utxo_set);
        let magnet = TransactionMagnet::new();
        let tx = spend(&[outpoint], 900);

        magnet.attach_transaction(&mut scope, &mut view, tx.hash(), &tx, true).unwrap();
        magnet.attach_transaction(&mut scope, &mut view, tx.hash(), &tx, true).unwrap();

        assert!(view.is_empty());
        assert!(magnet.spent_by(&scope, &outpoint).unwrap().is_none());
    }

    #[test]
    fn test_apply_marks_spent_and_stages_outputs() {
        let db = MemoryDatabase::new();
        let (utxo_set, outpoint) = funded_set();
        let mut scope = ScratchScope::begin(&db).unwrap();
        let mut view = ScratchCoinView::new(&utxo_set);
        let magnet = TransactionMagnet::new();
        let parent = spend(&[outpoint], 900);
        let child = spend(&[OutPoint { hash: parent.hash(), index: 0 }], 800);

        assert!(magnet.check_transaction(&scope, &view, &child.hash(), &child).unwrap_err().is_not_attachable());

        magnet.apply_transaction(&mut scope, &mut view, parent.hash(), &parent).unwrap();
        let spender = magnet.spent_by(&scope, &outpoint).unwrap().unwrap();
        assert_eq!(spender, InPoint { hash: parent.hash(), index: 0 });

        magnet.check_transaction(&scope, &view, &child.hash(), &child).unwrap();
    }

    #[test]
    fn test_double_spend_in_scope_rejected() {
        let db = MemoryDatabase::new();
        let (utxo_set, outpoint) = funded_set();
        let mut scope = ScratchScope::begin(&db).unwrap();
        let mut view = ScratchCoinView::new(&utxo_set);
        let magnet = TransactionMagnet::new();
        let first = spend(&[outpoint], 900);
        let second = spend(&[outpoint], 800);

        magnet.apply_transaction(&mut scope, &mut view, first.hash(), &first).unwrap();
        let err = magnet.apply_transaction(&mut scope, &mut view, second.hash(), &second).unwrap_err();
        assert!(err.is_not_attachable());
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn test_duplicate_and_repeated_inputs_rejected() {
        let db = MemoryDatabase::new();
        let (utxo_set, outpoint) = funded_set();
        let mut scope = ScratchScope::begin(&db).unwrap();
        let mut view = ScratchCoinView::new(&utxo_set);
        let magnet = TransactionMagnet::new();

        let repeated = spend(&[outpoint, outpoint], 900);
        assert!(magnet.check_transaction(&scope, &view, &repeated.hash(), &repeated).is_err());

        let tx = spend(&[outpoint], 900);
        magnet.apply_transaction(&mut scope, &mut view, tx.hash(), &tx).unwrap();
        assert!(magnet.check_transaction(&scope, &view, &tx.hash(), &tx).unwrap_err().is_not_attachable());
    }

    #[test]
    fn test_coinbase_not_attachable() {
        let db = MemoryDatabase::new();
        let utxo_set = UtxoSet::new();
        let scope = ScratchScope::begin(&db).unwrap();
        let view = ScratchCoinView::new(&utxo_set);
        let coinbase = spend(&[OutPoint { hash: NULL_HASH, index: 0xffffffff }], 50);

        let err = TransactionMagnet::new()
            .check_transaction(&scope, &view, &coinbase.hash(), &coinbase)
            .unwrap_err();
        assert!(err.is_not_attachable());
    }

    #[test]
    fn test_scope_abort_leaves_database_clean() {
        let db = MemoryDatabase::new();
        let (utxo_set, outpoint) = funded_set();
        {
            let mut scope = ScratchScope::begin(&db).unwrap();
            let mut view = ScratchCoinView::new(&utxo_set);
            let tx = spend(&[outpoint], 900);
            TransactionMagnet::new().apply_transaction(&mut scope, &mut view, tx.hash(), &tx).unwrap();
        }
        assert!(db.is_empty());
    }
}

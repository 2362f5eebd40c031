//! Readiness queue: transactions proven attachable, best first

use crate::types::*;
use crate::codec::encoded_size;
use crate::coins::CoinView;
use crate::error::Result;
use crate::transaction::calculate_fee;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// How ready transactions are ranked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityPolicy {
    /// Absolute fee, highest first
    #[default]
    Fee,
    /// Fee per thousand encoded bytes, highest first
    FeeRate,
}

impl PriorityPolicy {
    pub fn priority(&self, fee: Integer, tx: &Transaction) -> Integer {
        match self {
            PriorityPolicy::Fee => fee,
            PriorityPolicy::FeeRate => {
                let size = encoded_size(tx).max(1) as Integer;
                fee.saturating_mul(1000) / size
            }
        }
    }
}

struct QueuedTransaction {
    priority: Integer,
    /// Enqueue order; earlier wins ties
    sequence: u64,
    tx_hash: Hash,
    transaction: Transaction,
}

impl Ord for QueuedTransaction {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for QueuedTransaction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedTransaction {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedTransaction {}

/// Max-heap of ready transactions.
pub struct TransactionPriorityQueue {
    policy: PriorityPolicy,
    heap: BinaryHeap<QueuedTransaction>,
    next_sequence: u64,
}

impl TransactionPriorityQueue {
    pub fn new(policy: PriorityPolicy) -> Self {
        Self {
            policy,
            heap: BinaryHeap::new(),
            next_sequence: 0,
        }
    }

    /// Rank `tx` using fees resolved through `coins_view`.
    pub fn enqueue(&mut self, coins_view: &dyn CoinView, tx_hash: Hash, tx: Transaction) -> Result<()> {
        let fee = calculate_fee(&tx, coins_view)?;
        let priority = self.policy.priority(fee, &tx);

        self.heap.push(QueuedTransaction {
            priority,
            sequence: self.next_sequence,
            tx_hash,
            transaction: tx,
        });
        self.next_sequence += 1;
        Ok(())
    }

    pub fn dequeue(&mut self) -> Option<(Hash, Transaction)> {
        self.heap.pop().map(|queued| (queued.tx_hash, queued.transaction))
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

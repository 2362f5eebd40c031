//! Shared fixtures for integration tests
#![allow(dead_code)]

use chain_core::*;

pub fn spend(prevouts: &[OutPoint], value: Integer) -> Transaction {
    Transaction {
        version: 1,
        inputs: prevouts
            .iter()
            .map(|prevout| TransactionInput {
                prevout: *prevout,
                script_sig: vec![0x51],
                sequence: 0xffffffff,
            })
            .collect(),
        outputs: vec![TransactionOutput {
            value,
            script_pubkey: vec![0x51],
        }],
        lock_time: 0,
    }
}

/// Output 0 of `tx`
pub fn first_output(tx: &Transaction) -> OutPoint {
    OutPoint { hash: tx.hash(), index: 0 }
}

/// One 10 000 unit output per seed.
pub fn funded_utxo_set(seeds: &[u8]) -> (UtxoSet, Vec<OutPoint>) {
    let mut utxo_set = UtxoSet::new();
    let mut outpoints = Vec::new();
    for seed in seeds {
        let outpoint = OutPoint { hash: [*seed; 32], index: 0 };
        utxo_set.insert(outpoint, TransactionOutput { value: 10_000, script_pubkey: vec![] });
        outpoints.push(outpoint);
    }
    (utxo_set, outpoints)
}

pub fn block_on(parent: Hash, nonce: u32) -> Block {
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

pub fn genesis() -> Block {
    block_on(NULL_HASH, 0)
}

/// Linear chain of `len` blocks on top of `parent`.
pub fn chain_of(parent: Hash, len: usize) -> Vec<Block> {
    let mut blocks = Vec::with_capacity(len);
    let mut prev = parent;
    for _ in 0..len {
        let block = block_on(prev, 0);
        prev = block.hash();
        blocks.push(block);
    }
    blocks
}

pub fn coinbase_data() -> CoinbaseData {
    CoinbaseData::new(b"integration".to_vec())
}

pub fn miner() -> MinerAddress {
    MinerAddress::from_pubkey_hash([0x42; 20])
}

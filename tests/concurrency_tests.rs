//! Shared components under concurrent callers

mod common;

use chain_core::*;
use chain_core::transaction::is_coinbase;
use common::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

#[test]
fn test_overlapping_accept_children_agree_with_sequential() {
    let chain = Arc::new(MemoryChain::new());
    let orphanage = Arc::new(BlockOrphanage::default());
    let processor = BlockProcessor::new(chain.clone(), orphanage.clone());
    let genesis = genesis();
    chain.put_block(&genesis.hash(), &genesis).unwrap();

    let blocks = chain_of(genesis.hash(), 40);
    let forks: Vec<Block> = blocks[..10].iter().map(|b| block_on(b.hash(), 99)).collect();
    for block in blocks[1..].iter().chain(forks.iter()) {
        processor.put_orphan(block.clone());
    }
    processor.accept_block(&blocks[0].hash(), &blocks[0]).unwrap();

    let results: Vec<Vec<Hash>> = thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| processor.accept_children(&blocks[0].hash())))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect()
    });

    let mut union = HashSet::new();
    for result in &results {
        let unique: HashSet<&Hash> = result.iter().collect();
        assert_eq!(unique.len(), result.len());
        union.extend(result.iter().copied());
    }

    let expected: HashSet<Hash> = blocks[1..]
        .iter()
        .chain(forks.iter())
        .map(|b| b.hash())
        .collect();
    assert_eq!(union, expected);
    assert!(orphanage.is_empty());
    assert_eq!(chain.len(), 1 + blocks.len() + forks.len());
    assert_eq!(chain.best_block_hash().unwrap(), Some(blocks[39].hash()));
}

#[test]
fn test_same_block_from_many_peers_becomes_tip_once() {
    let chain = Arc::new(MemoryChain::new());
    let processor = BlockProcessor::new(chain.clone(), Arc::new(BlockOrphanage::default()));
    let genesis = genesis();
    chain.put_block(&genesis.hash(), &genesis).unwrap();
    let block = block_on(genesis.hash(), 1);

    let verdicts: Vec<bool> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| processor.accept_block(&block.hash(), &block)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect()
    });

    assert_eq!(verdicts.iter().filter(|v| **v).count(), 1);
    assert_eq!(chain.len(), 2);
}

#[test]
fn test_templates_consistent_while_pool_grows() {
    let seeds: Vec<u8> = (1..=60).collect();
    let (utxo_set, outpoints) = funded_utxo_set(&seeds);
    let core = ChainCore::in_memory(NodeConfig::default(), utxo_set);

    // Parent/child pairs so every template has ordering to honor
    let pairs: Vec<(Transaction, Transaction)> = outpoints
        .iter()
        .map(|o| {
            let parent = spend(&[*o], 9_000);
            let child = spend(&[first_output(&parent)], 8_000);
            (parent, child)
        })
        .collect();

    let templates: Vec<BlockTemplate> = thread::scope(|s| {
        let core = &core;
        let pairs = &pairs;
        s.spawn(move || {
            for (parent, child) in pairs {
                core.submit_transaction(child.clone()).unwrap();
                core.submit_transaction(parent.clone()).unwrap();
            }
        });
        let reader = s.spawn(move || {
            (0..20)
                .map(|_| {
                    core.get_block_template(&coinbase_data(), &miner(), MAX_BLOCK_SIZE)
                        .unwrap()
                })
                .collect::<Vec<_>>()
        });
        reader.join().unwrap()
    });

    for template in &templates {
        assert!(is_coinbase(&template.transactions[0]));
        let mut seen = HashSet::new();
        for tx in &template.transactions[1..] {
            assert!(!is_coinbase(tx));
            for input in &tx.inputs {
                // An in-block parent must already be placed
                if pairs.iter().any(|(parent, _)| parent.hash() == input.prevout.hash) {
                    assert!(seen.contains(&input.prevout.hash));
                }
            }
            assert!(seen.insert(tx.hash()));
        }
    }

    let last = core.get_block_template(&coinbase_data(), &miner(), MAX_BLOCK_SIZE).unwrap();
    assert_eq!(last.transaction_count(), 1 + 2 * pairs.len());
}

#[test]
fn test_orphanage_shared_between_threads() {
    let orphanage = Arc::new(BlockOrphanage::default());
    let parent = [5; 32];

    thread::scope(|s| {
        for t in 0..4u32 {
            let orphanage = orphanage.clone();
            s.spawn(move || {
                for n in 0..25u32 {
                    orphanage.put_orphan(block_on(parent, t * 100 + n));
                }
            });
        }
    });

    assert_eq!(orphanage.len(), 100);
    assert_eq!(orphanage.get_orphans_depending_on(&parent).len(), 100);
}

//! Canonical binary encoding used for hashing and size accounting
//!
//! Fields are little-endian and lengths are Bitcoin varints. The wire protocol
//! proper lives outside this crate; only the byte counts and the hashes derived
//! from this encoding matter here.

use crate::types::*;
use crate::error::{ChainError, Result};
use bitcoin_hashes::{sha256d, Hash as BitcoinHash, HashEngine};

/// Encode a number as a Bitcoin varint
pub fn encode_varint(value: u64) -> Vec<u8> {
    if value < 0xfd {
        vec![value as u8]
    } else if value <= 0xffff {
        let mut result = vec![0xfd];
        result.extend_from_slice(&(value as u16).to_le_bytes());
        result
    } else if value <= 0xffffffff {
        let mut result = vec![0xfe];
        result.extend_from_slice(&(value as u32).to_le_bytes());
        result
    } else {
        let mut result = vec![0xff];
        result.extend_from_slice(&value.to_le_bytes());
        result
    }
}

/// Serialize a transaction
pub fn encode_transaction(tx: &Transaction) -> Vec<u8> {
    let mut data = Vec::with_capacity(encoded_size(tx));

    data.extend_from_slice(&tx.version.to_le_bytes());

    data.extend_from_slice(&encode_varint(tx.inputs.len() as u64));
    for input in &tx.inputs {
        data.extend_from_slice(&input.prevout.hash);
        data.extend_from_slice(&input.prevout.index.to_le_bytes());
        data.extend_from_slice(&encode_varint(input.script_sig.len() as u64));
        data.extend_from_slice(&input.script_sig);
        data.extend_from_slice(&input.sequence.to_le_bytes());
    }

    data.extend_from_slice(&encode_varint(tx.outputs.len() as u64));
    for output in &tx.outputs {
        data.extend_from_slice(&(output.value as u64).to_le_bytes());
        data.extend_from_slice(&encode_varint(output.script_pubkey.len() as u64));
        data.extend_from_slice(&output.script_pubkey);
    }

    data.extend_from_slice(&tx.lock_time.to_le_bytes());
    data
}

/// Length of `encode_transaction(tx)` without allocating.
pub fn encoded_size(tx: &Transaction) -> usize {
    let varint_len = |n: usize| encode_varint(n as u64).len();

    let inputs: usize = tx
        .inputs
        .iter()
        .map(|input| 32 + 4 + varint_len(input.script_sig.len()) + input.script_sig.len() + 4)
        .sum();
    let outputs: usize = tx
        .outputs
        .iter()
        .map(|output| 8 + varint_len(output.script_pubkey.len()) + output.script_pubkey.len())
        .sum();

    4 + varint_len(tx.inputs.len()) + inputs + varint_len(tx.outputs.len()) + outputs + 4
}

/// Serialize a block header (always 80 bytes)
pub fn encode_block_header(header: &BlockHeader) -> Vec<u8> {
    let mut data = Vec::with_capacity(crate::constants::BLOCK_HEADER_SIZE);
    data.extend_from_slice(&header.version.to_le_bytes());
    data.extend_from_slice(&header.prev_block_hash);
    data.extend_from_slice(&header.merkle_root);
    data.extend_from_slice(&header.timestamp.to_le_bytes());
    data.extend_from_slice(&header.bits.to_le_bytes());
    data.extend_from_slice(&header.nonce.to_le_bytes());
    data
}

pub fn transaction_hash(tx: &Transaction) -> Hash {
    sha256d_hash(&[encode_transaction(tx).as_slice()])
}

pub fn block_hash(header: &BlockHeader) -> Hash {
    sha256d_hash(&[encode_block_header(header).as_slice()])
}

/// Merkle root over transaction hashes; an odd level duplicates its last hash.
pub fn merkle_root(transactions: &[Transaction]) -> Result<Hash> {
    if transactions.is_empty() {
        return Err(ChainError::InvalidBlock(
            "Cannot calculate merkle root for empty transaction list".to_string(),
        ));
    }

    let mut hashes: Vec<Hash> = transactions.iter().map(transaction_hash).collect();

    while hashes.len() > 1 {
        hashes = hashes
            .chunks(2)
            .map(|chunk| {
                let right = chunk.get(1).unwrap_or(&chunk[0]);
                sha256d_hash(&[&chunk[0][..], &right[..]])
            })
            .collect();
    }

    Ok(hashes[0])
}

/// Storage key for an out-point: hash followed by the little-endian index.
pub fn outpoint_key(prefix: u8, outpoint: &OutPoint) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + 32 + 4);
    key.push(prefix);
    key.extend_from_slice(&outpoint.hash);
    key.extend_from_slice(&outpoint.index.to_le_bytes());
    key
}

pub fn encode_in_point(in_point: &InPoint) -> Vec<u8> {
    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&in_point.hash);
    data.extend_from_slice(&in_point.index.to_le_bytes());
    data
}

pub fn decode_in_point(data: &[u8]) -> Result<InPoint> {
    if data.len() != 36 {
        return Err(ChainError::Serialization(format!(
            "In-point must be 36 bytes, got {}",
            data.len()
        )));
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&data[..32]);
    let mut index = [0u8; 4];
    index.copy_from_slice(&data[32..]);
    Ok(InPoint {
        hash,
        index: u32::from_le_bytes(index),
    })
}

fn sha256d_hash(parts: &[&[u8]]) -> Hash {
    let mut hasher = sha256d::Hash::engine();
    for part in parts {
        hasher.input(part);
    }
    let result = sha256d::Hash::from_engine(hasher);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

//! Core types for chain extension

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write;

/// Hash type: 256-bit hash
pub type Hash = [u8; 32];

/// Byte string type
pub type ByteString = Vec<u8>;

/// Natural number type
pub type Natural = u64;

/// Integer type
pub type Integer = i64;

/// All-zero hash used as the genesis parent and the coinbase prevout.
pub const NULL_HASH: Hash = [0u8; 32];

/// OutPoint: reference to output `index` of transaction `hash`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub hash: Hash,
    pub index: u32,
}

/// InPoint: input `index` of the spending transaction `hash`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InPoint {
    pub hash: Hash,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub prevout: OutPoint,
    pub script_sig: ByteString,
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub value: Integer,
    pub script_pubkey: ByteString,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,
}

impl Transaction {
    /// Double SHA-256 of the canonical serialization.
    pub fn hash(&self) -> Hash {
        crate::codec::transaction_hash(self)
    }
}

/// Block Header. Only `prev_block_hash` is interpreted by this crate.
///
/// Field widths match the 80-byte serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_block_hash: Hash,
    pub merkle_root: Hash,
    pub timestamp: u32,
    pub bits: u32,
    pub nonce: u32,
}

impl BlockHeader {
    pub fn hash(&self) -> Hash {
        crate::codec::block_hash(self)
    }

    /// The genesis block is the only block without a parent.
    pub fn is_genesis(&self) -> bool {
        self.prev_block_hash == NULL_HASH
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }
}

/// Chain metadata kept next to a stored block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub height: Natural,
    pub block_header: BlockHeader,
}

/// Presence in the descriptor index means the transaction is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDescriptor {
    pub block_hash: Hash,
    pub index_in_block: Natural,
}

/// UTXO Set: 𝒰𝒮 = 𝒪 → 𝒯
pub type UtxoSet = HashMap<OutPoint, TransactionOutput>;

/// Lowercase hex of a hash, for log fields and error messages.
pub fn hash_hex(hash: &Hash) -> String {
    let mut out = String::with_capacity(64);
    for byte in hash {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

//! Transaction helpers: coinbase detection, fees and the generation transaction

use crate::types::*;
use crate::constants::*;
use crate::coins::CoinView;
use crate::error::{ChainError, Result};
use ripemd::Ripemd160;
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Check if transaction is coinbase
pub fn is_coinbase(tx: &Transaction) -> bool {
    tx.inputs.len() == 1 &&
    tx.inputs[0].prevout.hash == NULL_HASH &&
    tx.inputs[0].prevout.index == COINBASE_PREVOUT_INDEX
}

/// Fee: Σ resolved input values − Σ output values
///
/// Every input must resolve through `coins_view`; callers only ask for the fee of
/// transactions that already passed an attach check against the same view.
/// Value sums that do not fit an `Integer` make the transaction not attachable.
pub fn calculate_fee(tx: &Transaction, coins_view: &dyn CoinView) -> Result<Integer> {
    if is_coinbase(tx) {
        return Ok(0);
    }

    let overflow = |what: &str| {
        ChainError::NotAttachable(format!("{} of {} overflows", what, hash_hex(&tx.hash())))
    };

    let mut total_input_value: Integer = 0;
    for (i, input) in tx.inputs.iter().enumerate() {
        match coins_view.resolve(&input.prevout)? {
            Some(output) => {
                total_input_value = total_input_value
                    .checked_add(output.value)
                    .ok_or_else(|| overflow("Input value sum"))?;
            }
            None => {
                return Err(ChainError::NotAttachable(format!(
                    "Input {} of {} references a missing output",
                    i,
                    hash_hex(&tx.hash())
                )))
            }
        }
    }

    let total_output_value = tx
        .outputs
        .iter()
        .try_fold(0 as Integer, |total, output| total.checked_add(output.value))
        .ok_or_else(|| overflow("Output value sum"))?;

    total_input_value
        .checked_sub(total_output_value)
        .ok_or_else(|| overflow("Fee"))
}

/// Opaque payload placed in the generation transaction's input script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinbaseData(pub ByteString);

impl CoinbaseData {
    pub fn new(data: impl Into<ByteString>) -> Self {
        Self(data.into())
    }
}

/// Pay-to-pubkey-hash address of the miner receiving the block reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerAddress {
    pub version: u8,
    pub pubkey_hash: [u8; 20],
}

impl MinerAddress {
    pub fn from_pubkey_hash(pubkey_hash: [u8; 20]) -> Self {
        Self {
            version: PUBKEY_ADDRESS_VERSION,
            pubkey_hash,
        }
    }

    /// Derive the address from a serialized secp256k1 public key.
    pub fn from_public_key(public_key: &[u8]) -> Result<Self> {
        let pubkey = PublicKey::from_slice(public_key)
            .map_err(|e| ChainError::InvalidAddress(format!("Invalid public key: {}", e)))?;

        // HASH160 = RIPEMD160(SHA256(x))
        let sha256_hash = Sha256::digest(pubkey.serialize());
        let ripemd160_hash = Ripemd160::digest(sha256_hash);

        let mut pubkey_hash = [0u8; 20];
        pubkey_hash.copy_from_slice(&ripemd160_hash);
        Ok(Self::from_pubkey_hash(pubkey_hash))
    }

    /// OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG
    pub fn locking_script(&self) -> ByteString {
        let mut script = Vec::with_capacity(25);
        script.push(0x76);
        script.push(0xa9);
        script.push(0x14);
        script.extend_from_slice(&self.pubkey_hash);
        script.push(0x88);
        script.push(0xac);
        script
    }
}

/// Build the generation transaction paying `reward` to `miner_address`.
pub fn new_generation_transaction(
    coinbase_data: &CoinbaseData,
    miner_address: &MinerAddress,
    reward: Integer,
) -> Transaction {
    let coinbase_input = TransactionInput {
        prevout: OutPoint {
            hash: NULL_HASH,
            index: COINBASE_PREVOUT_INDEX,
        },
        script_sig: coinbase_data.0.clone(),
        sequence: SEQUENCE_FINAL,
    };

    let coinbase_output = TransactionOutput {
        value: reward,
        script_pubkey: miner_address.locking_script(),
    };

    Transaction {
        version: 1,
        inputs: vec![coinbase_input],
        outputs: vec![coinbase_output],
        lock_time: 0,
    }
}

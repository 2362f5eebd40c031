//! Node configuration
//!
//! Every section falls back to its defaults, so a partial JSON document (or
//! `{}`) is a valid configuration.

use crate::constants::*;
use crate::priority::PriorityPolicy;
use crate::types::Integer;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Block template assembly parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Average transaction size used to size the candidate fetch
    pub bytes_per_transaction: usize,
    /// Consecutive dry-run failures that end a candidate scan
    pub max_consecutive_unattachable: usize,
    /// Compact difficulty bits written into templates
    pub difficulty_bits: u32,
    /// Value of the generation transaction output
    pub coinbase_reward: Integer,
    /// Ordering of ready transactions
    pub priority: PriorityPolicy,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            bytes_per_transaction: BYTES_PER_TRANSACTION,
            max_consecutive_unattachable: MAX_CONSECUTIVE_UNATTACHABLE,
            difficulty_bits: MAX_TARGET,
            coinbase_reward: INITIAL_SUBSIDY,
            priority: PriorityPolicy::Fee,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrphanConfig {
    /// Orphan blocks kept before the oldest is evicted
    pub max_orphans: usize,
}

impl Default for OrphanConfig {
    fn default() -> Self {
        Self {
            max_orphans: MAX_ORPHAN_BLOCKS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_transactions: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_transactions: 50_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub mining: MiningConfig,
    pub orphans: OrphanConfig,
    pub pool: PoolConfig,
}

impl NodeConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse node configuration")
    }

    /// Load a JSON configuration file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        Self::from_json_str(&json)
    }
}

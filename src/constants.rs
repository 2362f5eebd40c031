//! Chain extension constants

/// Serialized block header size
pub const BLOCK_HEADER_SIZE: usize = 80;

/// Largest varint encoding; reserved for the transaction count
pub const MAX_VARINT_SIZE: usize = 9;

/// Average transaction size used to estimate how many candidates to fetch
pub const BYTES_PER_TRANSACTION: usize = 128;

/// Consecutive dry-run failures after which a candidate scan gives up
pub const MAX_CONSECUTIVE_UNATTACHABLE: usize = 16;

/// Maximum block size: 1MB
pub const MAX_BLOCK_SIZE: usize = 1_000_000;

/// Maximum target (minimum difficulty), compact form
pub const MAX_TARGET: u32 = 0x1d00ffff;

/// Initial block subsidy: 50 coins
pub const INITIAL_SUBSIDY: i64 = 50 * 100_000_000;

/// Output index of the coinbase prevout
pub const COINBASE_PREVOUT_INDEX: u32 = 0xffffffff;

/// Sequence number for final transaction
pub const SEQUENCE_FINAL: u32 = 0xffffffff;

/// Orphan blocks kept before the oldest is evicted
pub const MAX_ORPHAN_BLOCKS: usize = 10_000;

/// Pay-to-pubkey-hash address version byte
pub const PUBKEY_ADDRESS_VERSION: u8 = 0x00;

pub mod action;
pub mod asset;
pub mod error;
pub mod intent;
pub mod plan;
pub mod quote;
pub mod result;
pub mod transaction;

/// EIP-155 chain identifier.
pub type ChainId = u64;

/// Per-account transaction sequence number.
pub type Nonce = u64;

/// Chain ids the engine ships default configuration for.
pub mod chains {
    use super::ChainId;

    pub const MAINNET: ChainId = 1;
    pub const OPTIMISM: ChainId = 10;
    pub const BSC: ChainId = 56;
    pub const POLYGON: ChainId = 137;
    pub const BASE: ChainId = 8453;
    pub const ARBITRUM: ChainId = 42161;
}

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};

use crate::models::ChainId;

/// Aggregators represent the native asset with this placeholder address.
pub const AGGREGATOR_NATIVE_ADDRESS: Address =
    address!("0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// Returns true if `address` is one of the placeholders used for a chain's native asset.
pub fn is_native_address(address: &Address) -> bool {
    address.is_zero() || *address == AGGREGATOR_NATIVE_ADDRESS
}

/// A fungible asset as the wallet knows it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub address: Address,
    pub chain_id: ChainId,
    pub symbol: String,
    pub decimals: u8,
    /// Set by the asset source for the chain's gas token (ETH, MATIC, BNB...).
    #[serde(default)]
    pub is_native: bool,
}

impl Asset {
    pub fn new(address: Address, chain_id: ChainId, symbol: &str, decimals: u8) -> Self {
        Self { address, chain_id, symbol: symbol.to_string(), decimals, is_native: false }
    }

    pub fn native(chain_id: ChainId, symbol: &str) -> Self {
        Self {
            address: Address::ZERO,
            chain_id,
            symbol: symbol.to_string(),
            decimals: 18,
            is_native: true,
        }
    }

    /// Native assets never need an allowance.
    pub fn is_native_asset(&self) -> bool {
        self.is_native || is_native_address(&self.address)
    }
}

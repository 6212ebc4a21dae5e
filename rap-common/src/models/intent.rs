use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::{
    gas::GasPrice,
    models::{asset::Asset, quote::QuoteResponse, ChainId},
};

/// The user-level operation a Rap fulfils.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum RapType {
    Swap,
    CrosschainSwap,
    Bridge,
    ClaimBridge,
    RevokeApproval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapParameters {
    pub quote: QuoteResponse,
    pub asset_to_sell: Asset,
    pub asset_to_buy: Asset,
    /// Chain the sell side executes on.
    pub chain_id: ChainId,
    /// Raw amount of `asset_to_sell`, in its smallest unit.
    pub sell_amount: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TokenStandard {
    Erc20,
    Erc721,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokeParameters {
    pub from: Address,
    pub token: Address,
    pub spender: Address,
    pub standard: TokenStandard,
    pub chain_id: ChainId,
}

/// Native funds just claimed on `chain_id`, to be bridged to `to_chain_id`.
///
/// The quote is fetched at planning time: the amount actually bridged may be lowered so the
/// remaining balance still pays for the bridge transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimBridgeParameters {
    pub address: Address,
    pub chain_id: ChainId,
    pub to_chain_id: ChainId,
    /// Claimed amount in wei.
    pub sell_amount: U256,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "parameters", rename_all = "camelCase")]
pub enum RapIntent {
    Swap(SwapParameters),
    CrosschainSwap(SwapParameters),
    Bridge(SwapParameters),
    ClaimBridge(ClaimBridgeParameters),
    RevokeApproval(RevokeParameters),
}

impl RapIntent {
    pub fn rap_type(&self) -> RapType {
        match self {
            RapIntent::Swap(_) => RapType::Swap,
            RapIntent::CrosschainSwap(_) => RapType::CrosschainSwap,
            RapIntent::Bridge(_) => RapType::Bridge,
            RapIntent::ClaimBridge(_) => RapType::ClaimBridge,
            RapIntent::RevokeApproval(_) => RapType::RevokeApproval,
        }
    }

    pub fn chain_id(&self) -> ChainId {
        match self {
            RapIntent::Swap(params) |
            RapIntent::CrosschainSwap(params) |
            RapIntent::Bridge(params) => params.chain_id,
            RapIntent::ClaimBridge(params) => params.chain_id,
            RapIntent::RevokeApproval(params) => params.chain_id,
        }
    }
}

/// Per-call user settings. Passed explicitly to planning and execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RapSettings {
    /// Quotes with a higher slippage tolerance are refused.
    pub max_slippage_bps: u32,
    /// Route mainnet transactions through a private relay.
    pub flashbots_enabled: bool,
    /// Only accept quotes produced by this aggregator.
    pub source: Option<String>,
    /// Approve `U256::MAX` instead of the exact sell amount.
    pub unlimited_approval: bool,
    /// Fees to attach to every transaction. `None` lets the signer fill them in.
    pub gas_price: Option<GasPrice>,
    /// Current "fast" fees. Every action but the last is priced at least this high, so
    /// preparatory transactions do not hold up the one the user asked for.
    pub fast_gas_price: Option<GasPrice>,
}

impl Default for RapSettings {
    fn default() -> Self {
        Self {
            max_slippage_bps: 500,
            flashbots_enabled: false,
            source: None,
            unlimited_approval: true,
            gas_price: None,
            fast_gas_price: None,
        }
    }
}

//! Quote shapes returned by the external quote provider.
//!
//! The provider answers with one of three shapes. [`QuoteResponse`] tags them explicitly so the
//! planner resolves the shape exactly once, through [`QuoteResponse::resolve`], and nothing
//! downstream ever re-inspects it.
use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::models::ChainId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SwapType {
    Normal,
    Wrap,
    Unwrap,
    CrossChain,
}

/// A same-chain swap quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Account the quote was issued for.
    pub from: Address,
    pub chain_id: ChainId,
    pub sell_token_address: Address,
    pub buy_token_address: Address,
    pub sell_amount: U256,
    pub buy_amount: U256,
    /// Contract the route executes against.
    pub to: Address,
    /// Encoded route call, opaque to the engine.
    pub data: Bytes,
    pub value: U256,
    /// Spender the sold token must be approved for.
    pub allowance_target: Address,
    pub swap_type: SwapType,
    /// Provider-side gas limit suggestion, already inflated.
    #[serde(default)]
    pub default_gas_limit: Option<u64>,
    #[serde(default)]
    pub trade_amount_usd: f64,
    /// Aggregator that produced the route.
    pub source: String,
    pub slippage_bps: u32,
}

/// A quote moving value between two chains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrosschainQuote {
    #[serde(flatten)]
    pub quote: Quote,
    pub to_chain_id: ChainId,
    /// Bridge the route goes through.
    pub bridge: String,
    /// The bridge only accepts the wrapped form of the native asset.
    #[serde(default)]
    pub requires_wrapped_input: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteError {
    pub code: u32,
    pub message: String,
}

/// Parameters of a quote fetched by the engine itself, as for claim bridges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub from: Address,
    pub chain_id: ChainId,
    pub to_chain_id: ChainId,
    pub sell_token_address: Address,
    pub buy_token_address: Address,
    pub sell_amount: U256,
    pub slippage_bps: u32,
    pub swap_type: SwapType,
}

/// Raw provider answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuoteResponse {
    Quote(Quote),
    CrosschainQuote(CrosschainQuote),
    QuoteError(QuoteError),
}

/// A usable quote: the error case has been split off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedQuote {
    Quote(Quote),
    CrosschainQuote(CrosschainQuote),
}

impl QuoteResponse {
    pub fn resolve(self) -> Result<ResolvedQuote, QuoteError> {
        match self {
            QuoteResponse::Quote(quote) => Ok(ResolvedQuote::Quote(quote)),
            QuoteResponse::CrosschainQuote(quote) => Ok(ResolvedQuote::CrosschainQuote(quote)),
            QuoteResponse::QuoteError(err) => Err(err),
        }
    }
}

impl ResolvedQuote {
    /// Fields shared by both quote shapes.
    pub fn base(&self) -> &Quote {
        match self {
            ResolvedQuote::Quote(quote) => quote,
            ResolvedQuote::CrosschainQuote(quote) => &quote.quote,
        }
    }

    /// Chain the bought asset arrives on.
    pub fn destination_chain_id(&self) -> ChainId {
        match self {
            ResolvedQuote::Quote(quote) => quote.chain_id,
            ResolvedQuote::CrosschainQuote(quote) => quote.to_chain_id,
        }
    }

    pub fn is_crosschain(&self) -> bool {
        self.destination_chain_id() != self.base().chain_id
    }
}

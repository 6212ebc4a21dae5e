use alloy_primitives::{Address, Bytes, TxHash, U256};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::{
    gas::GasPrice,
    models::{action::ActionKind, ChainId, Nonce},
};

/// Block tag used when reading an account's transaction count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum BlockTag {
    Latest,
    /// Includes transactions still sitting in the node's mempool.
    Pending,
}

/// A single reserved nonce, valid for exactly one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonceLease {
    pub address: Address,
    pub chain_id: ChainId,
    pub nonce: Nonce,
}

/// A transaction ready to be signed, or a partially populated one handed to `estimate_gas`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub chain_id: ChainId,
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub nonce: Option<Nonce>,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<GasPrice>,
    /// Submit through a private relay instead of the public mempool.
    #[serde(default)]
    pub private: bool,
}

impl TransactionRequest {
    pub fn with_nonce(mut self, nonce: Nonce) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }
}

/// Output of a signer: the encoded envelope plus its hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub chain_id: ChainId,
    pub nonce: Nonce,
    pub hash: TxHash,
    pub raw: Bytes,
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    /// False when the transaction was included but reverted.
    pub success: bool,
    pub gas_used: u64,
}

/// How a gas limit was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GasSource {
    Estimated,
    /// The estimate call failed for a non-revert reason; a configured default was used.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasEstimate {
    pub gas_limit: u64,
    pub source: GasSource,
}

impl GasEstimate {
    pub fn estimated(gas_limit: u64) -> Self {
        Self { gas_limit, source: GasSource::Estimated }
    }

    pub fn fallback(gas_limit: u64) -> Self {
        Self { gas_limit, source: GasSource::Fallback }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == GasSource::Fallback
    }
}

/// Record of one action that reached the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub index: usize,
    pub kind: ActionKind,
    pub chain_id: ChainId,
    pub tx_hash: TxHash,
    pub nonce: Nonce,
    pub gas: GasEstimate,
    /// True once the engine observed a successful receipt for it.
    pub confirmed: bool,
}

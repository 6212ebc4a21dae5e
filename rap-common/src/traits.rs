use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;

use crate::models::{
    error::{EstimateGasError, RpcError, SignerError},
    quote::{QuoteRequest, QuoteResponse},
    transaction::{
        BlockTag, SignedTransaction, TransactionReceipt, TransactionRequest,
    },
    ChainId, Nonce,
};

/// Chain access needed by the Rap engine.
///
/// Implementations route each call to the RPC endpoint of `chain_id`. None of the methods
/// apply timeouts of their own; the engine wraps them with the per-chain timeouts it is
/// configured with.
#[cfg_attr(feature = "test-utils", mockall::automock)]
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Number of transactions sent from `address`, as seen at `tag`.
    async fn get_transaction_count(
        &self,
        address: Address,
        chain_id: ChainId,
        tag: BlockTag,
    ) -> Result<Nonce, RpcError>;

    /// Simulates the request and returns the gas it consumes, without any padding.
    ///
    /// Must return [`EstimateGasError::Reverted`] when the call itself reverts, so callers can
    /// tell a doomed transaction apart from an unreachable node.
    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, EstimateGasError>;

    /// Native balance of `address` in wei.
    async fn get_balance(
        &self,
        address: Address,
        chain_id: ChainId,
        tag: BlockTag,
    ) -> Result<U256, RpcError>;

    /// ERC-20 `allowance(owner, spender)` on `token`.
    async fn get_allowance(
        &self,
        owner: Address,
        spender: Address,
        token: Address,
        chain_id: ChainId,
    ) -> Result<U256, RpcError>;

    async fn send_raw_transaction(
        &self,
        chain_id: ChainId,
        tx: &SignedTransaction,
    ) -> Result<TxHash, RpcError>;

    /// Resolves once the transaction is included in at least one block.
    async fn wait_for_confirmation(
        &self,
        chain_id: ChainId,
        tx_hash: TxHash,
    ) -> Result<TransactionReceipt, RpcError>;

    /// Whether the node knows about the transaction, pending or mined.
    async fn is_transaction_known(&self, chain_id: ChainId, tx_hash: TxHash)
        -> Result<bool, RpcError>;
}

/// Signing capability of the active wallet.
///
/// Abstracts local keystores and hardware wallets. Watch-only accounts expose an address but
/// cannot sign; the planner refuses to plan for them.
#[cfg_attr(feature = "test-utils", mockall::automock)]
#[async_trait]
pub trait Signer: Send + Sync {
    fn address(&self) -> Address;

    fn is_watch_only(&self) -> bool;

    /// Signs a fully populated request (nonce and gas limit set).
    async fn sign_transaction(
        &self,
        tx: &TransactionRequest,
    ) -> Result<SignedTransaction, SignerError>;
}

/// Source of fresh quotes for Raps the engine prices itself.
///
/// Swap and bridge intents arrive with their quote attached; only claim bridges ask for one,
/// possibly twice when the claimed amount has to be lowered to cover gas.
#[cfg_attr(feature = "test-utils", mockall::automock)]
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn get_claim_bridge_quote(
        &self,
        request: &QuoteRequest,
    ) -> Result<QuoteResponse, RpcError>;
}

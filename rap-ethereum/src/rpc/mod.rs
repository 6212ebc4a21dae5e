use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use rap_common::{
    models::{
        transaction::{BlockTag, SignedTransaction, TransactionReceipt, TransactionRequest},
        ChainId, Nonce,
    },
    traits::ChainRpc,
    EstimateGasError, RpcError,
};
use tracing::{instrument, warn};

pub mod config;
mod retry;

pub use retry::RetryPolicy;

use crate::rpc::config::RPCRetryConfig;

/// Wraps a [`ChainRpc`] and retries its idempotent reads on transient failures.
///
/// `estimate_gas`, `send_raw_transaction` and `wait_for_confirmation` are passed through: a
/// revert must surface immediately, a broadcast retry needs a new nonce, and confirmation
/// waits are bounded by the engine's timeouts.
#[derive(Clone, Debug)]
pub struct RetryingChainRpc<R> {
    inner: R,
    retry_policy: RetryPolicy,
}

impl<R: ChainRpc> RetryingChainRpc<R> {
    /// Uses the default retry configuration (3 retries, 100ms initial backoff, 5000ms max).
    pub fn new(inner: R) -> Self {
        Self { inner, retry_policy: RetryPolicy::default() }
    }

    pub fn with_retry(mut self, retry_config: RPCRetryConfig) -> Self {
        self.retry_policy = retry_config.into();
        self
    }
}

#[async_trait]
impl<R: ChainRpc> ChainRpc for RetryingChainRpc<R> {
    #[instrument(level = "debug", skip(self))]
    async fn get_transaction_count(
        &self,
        address: Address,
        chain_id: ChainId,
        tag: BlockTag,
    ) -> Result<Nonce, RpcError> {
        self.retry_policy
            .retry_request(|| async {
                self.inner
                    .get_transaction_count(address, chain_id, tag)
                    .await
                    .inspect_err(|e| warn!(%address, chain_id, error = %e, "Nonce read failed"))
            })
            .await
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, EstimateGasError> {
        self.inner.estimate_gas(tx).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_balance(
        &self,
        address: Address,
        chain_id: ChainId,
        tag: BlockTag,
    ) -> Result<U256, RpcError> {
        self.retry_policy
            .retry_request(|| async {
                self.inner
                    .get_balance(address, chain_id, tag)
                    .await
                    .inspect_err(|e| warn!(%address, chain_id, error = %e, "Balance read failed"))
            })
            .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_allowance(
        &self,
        owner: Address,
        spender: Address,
        token: Address,
        chain_id: ChainId,
    ) -> Result<U256, RpcError> {
        self.retry_policy
            .retry_request(|| async {
                self.inner
                    .get_allowance(owner, spender, token, chain_id)
                    .await
                    .inspect_err(|e| warn!(%token, chain_id, error = %e, "Allowance read failed"))
            })
            .await
    }

    async fn send_raw_transaction(
        &self,
        chain_id: ChainId,
        tx: &SignedTransaction,
    ) -> Result<TxHash, RpcError> {
        self.inner
            .send_raw_transaction(chain_id, tx)
            .await
    }

    async fn wait_for_confirmation(
        &self,
        chain_id: ChainId,
        tx_hash: TxHash,
    ) -> Result<TransactionReceipt, RpcError> {
        self.inner
            .wait_for_confirmation(chain_id, tx_hash)
            .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn is_transaction_known(
        &self,
        chain_id: ChainId,
        tx_hash: TxHash,
    ) -> Result<bool, RpcError> {
        self.retry_policy
            .retry_request(|| async {
                self.inner
                    .is_transaction_known(chain_id, tx_hash)
                    .await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::Bytes;
    use rap_common::traits::MockChainRpc;

    use super::*;

    fn fast_retry() -> RPCRetryConfig {
        RPCRetryConfig::new(3, 1, 2)
    }

    #[tokio::test]
    async fn test_nonce_read_retried_on_transport_error() {
        let mut mock = MockChainRpc::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_get_transaction_count()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(RpcError::RequestError("connection reset".into())));
        mock.expect_get_transaction_count()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(12));

        let rpc = RetryingChainRpc::new(mock).with_retry(fast_retry());
        let nonce = rpc
            .get_transaction_count(Address::ZERO, 1, BlockTag::Pending)
            .await;

        assert_eq!(nonce, Ok(12));
    }

    #[tokio::test]
    async fn test_balance_read_retried_on_timeout() {
        let mut mock = MockChainRpc::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_get_balance()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(RpcError::Timeout("eth_getBalance".into())));
        mock.expect_get_balance()
            .withf(|_, chain_id, tag| *chain_id == 10 && *tag == BlockTag::Latest)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(U256::from(7u64)));

        let rpc = RetryingChainRpc::new(mock).with_retry(fast_retry());
        let balance = rpc
            .get_balance(Address::ZERO, 10, BlockTag::Latest)
            .await;

        assert_eq!(balance, Ok(U256::from(7u64)));
    }

    #[tokio::test]
    async fn test_allowance_node_error_not_retried() {
        let mut mock = MockChainRpc::new();
        mock.expect_get_allowance()
            .times(1)
            .returning(|_, _, _, _| {
                Err(RpcError::NodeError { code: 3, message: "execution reverted".into() })
            });

        let rpc = RetryingChainRpc::new(mock).with_retry(fast_retry());
        let result = rpc
            .get_allowance(Address::ZERO, Address::ZERO, Address::ZERO, 1)
            .await;

        assert!(matches!(result, Err(RpcError::NodeError { code: 3, .. })));
    }

    #[tokio::test]
    async fn test_broadcast_is_not_retried() {
        let mut mock = MockChainRpc::new();
        mock.expect_send_raw_transaction()
            .times(1)
            .returning(|_, _| Err(RpcError::RequestError("connection reset".into())));

        let rpc = RetryingChainRpc::new(mock).with_retry(fast_retry());
        let signed = SignedTransaction {
            chain_id: 1,
            nonce: 0,
            hash: TxHash::ZERO,
            raw: Bytes::new(),
            private: false,
        };

        assert!(rpc
            .send_raw_transaction(1, &signed)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_revert_is_not_retried() {
        let mut mock = MockChainRpc::new();
        mock.expect_estimate_gas()
            .times(1)
            .returning(|_| Err(EstimateGasError::Reverted("STF".into())));

        let rpc = RetryingChainRpc::new(mock);
        let tx = TransactionRequest {
            chain_id: 1,
            from: Address::ZERO,
            to: Address::ZERO,
            data: Bytes::new(),
            value: U256::ZERO,
            nonce: None,
            gas_limit: None,
            gas_price: None,
            private: false,
        };

        assert_eq!(rpc.estimate_gas(&tx).await, Err(EstimateGasError::Reverted("STF".into())));
    }
}

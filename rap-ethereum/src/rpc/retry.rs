//! Retry logic for idempotent RPC reads
//!
//! Reads are retried with exponential backoff while the error is transient. Writes never go
//! through here: a failed broadcast needs a fresh nonce, which only the engine can hand out.

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use backoff::{exponential::ExponentialBackoffBuilder, ExponentialBackoff};
use rap_common::RpcError;

use crate::rpc::config::RPCRetryConfig;

/// Classifies errors into transient or permanent for backoff retry logic.
fn classify_error(error: RpcError) -> backoff::Error<RpcError> {
    if error.should_retry() {
        backoff::Error::transient(error)
    } else {
        backoff::Error::permanent(error)
    }
}

/// Exponential backoff plus an attempt cap.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    backoff: ExponentialBackoff,
    max_retries: usize,
}

impl From<&RPCRetryConfig> for RetryPolicy {
    fn from(config: &RPCRetryConfig) -> Self {
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(config.initial_backoff_ms))
            .with_multiplier(2.0)
            .with_max_interval(Duration::from_millis(config.max_backoff_ms))
            .with_max_elapsed_time(None)
            .build();
        Self { backoff, max_retries: config.max_retries }
    }
}

impl From<RPCRetryConfig> for RetryPolicy {
    fn from(config: RPCRetryConfig) -> Self {
        (&config).into()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RPCRetryConfig::default().into()
    }
}

impl RetryPolicy {
    /// Creates a retry policy optimized for testing (very short intervals).
    #[cfg(test)]
    pub fn for_testing(max_retries: usize) -> Self {
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(1))
            .with_multiplier(1.1)
            .with_max_interval(Duration::from_millis(5))
            .with_max_elapsed_time(None)
            .build();
        Self { backoff, max_retries }
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Executes a read with automatic retry on transient failures.
    ///
    /// Permanent errors fail immediately. Transient errors are retried until `max_retries`
    /// extra attempts have been made, after which the last error is returned.
    pub async fn retry_request<F, Fut, T>(&self, mut operation: F) -> Result<T, RpcError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, RpcError>>,
    {
        let attempts = AtomicUsize::new(0);
        backoff::future::retry(self.backoff.clone(), || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            let fut = operation();
            async move {
                fut.await.map_err(|e| {
                    if attempt >= self.max_retries {
                        backoff::Error::permanent(e)
                    } else {
                        classify_error(e)
                    }
                })
            }
        })
        .await
    }
}

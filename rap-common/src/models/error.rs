use alloy_primitives::TxHash;
use thiserror::Error;

use crate::{models::action::ActionKind, HANDLED_ERROR};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("Request error: {0}")]
    RequestError(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Node error {code}: {message}")]
    NodeError { code: i64, message: String },
    #[error("Unknown error: {0}")]
    UnknownError(String),
}

impl RpcError {
    /// Transport-level failures are worth another attempt; node-level rejections are not.
    pub fn should_retry(&self) -> bool {
        matches!(self, Self::RequestError(_) | Self::Timeout(_))
    }
}

/// Failure of an `estimate_gas` call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EstimateGasError {
    /// The simulated call reverts: broadcasting it would revert too.
    #[error("execution reverted: {0}")]
    Reverted(String),
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    /// The user or the hardware wallet declined. The signer UI already told the user.
    #[error("signature rejected: {0}")]
    Rejected(String),
    #[error("signer unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a single action that did not end in a successful submission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("failed to read nonce: {0}")]
    NonceReadFailed(String),
    #[error("gas estimation reverted: {0}")]
    EstimationRevert(String),
    #[error("broadcast failed: {0}")]
    BroadcastFailed(String),
    /// The outcome is unknown: the transaction may still land later.
    #[error("no confirmation for {tx_hash} within the timeout")]
    ConfirmationTimeout { tx_hash: TxHash },
    #[error("transaction {tx_hash} reverted on chain")]
    TransactionReverted { tx_hash: TxHash },
    #[error("signer rejected the transaction: {0}")]
    SignerRejected(String),
    #[error("failed to sign transaction: {0}")]
    SignerFailed(String),
}

impl ActionError {
    /// Only broadcast failures may be retried, and only with a fresh nonce.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BroadcastFailed(_))
    }
}

impl From<SignerError> for ActionError {
    fn from(value: SignerError) -> Self {
        match value {
            SignerError::Rejected(reason) => ActionError::SignerRejected(reason),
            SignerError::Unavailable(reason) => ActionError::SignerFailed(reason),
        }
    }
}

/// Terminal failure of a whole Rap run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RapError {
    #[error("planning failed: {0}")]
    PlanningFailed(String),
    #[error("{kind} action #{index} failed: {source}")]
    ActionFailed {
        index: usize,
        kind: ActionKind,
        #[source]
        source: ActionError,
    },
    #[error("{kind} action #{index} could not be broadcast after {attempts} attempts: {reason}")]
    BroadcastRetriesExhausted { index: usize, kind: ActionKind, attempts: u32, reason: String },
    #[error("rap cancelled before any transaction was broadcast")]
    Cancelled,
}

impl RapError {
    pub fn action_failed(index: usize, kind: ActionKind, source: ActionError) -> Self {
        RapError::ActionFailed { index, kind, source }
    }

    /// Message for the UI. Returns [`HANDLED_ERROR`] when the user was already informed.
    pub fn error_message(&self) -> String {
        match self {
            RapError::ActionFailed { source: ActionError::SignerRejected(_), .. } |
            RapError::Cancelled => HANDLED_ERROR.to_string(),
            other => other.to_string(),
        }
    }
}

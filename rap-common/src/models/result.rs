use alloy_primitives::TxHash;
use serde::{Deserialize, Serialize};

use crate::models::{error::RapError, transaction::Submission, Nonce};

/// The single externally visible outcome of a Rap run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RapResult {
    pub succeeded: bool,
    /// `Some("handled")` means a lower layer already showed the error.
    pub error_message: Option<String>,
    /// Nonce of the last transaction that reached the network, for receipt polling.
    pub nonce_of_last_submitted: Option<Nonce>,
    /// Every submission made during the run, in plan order.
    pub submissions: Vec<Submission>,
    pub rap_name: String,
}

impl RapResult {
    pub fn completed(rap_name: String, submissions: Vec<Submission>) -> Self {
        Self {
            succeeded: true,
            error_message: None,
            nonce_of_last_submitted: submissions.last().map(|s| s.nonce),
            submissions,
            rap_name,
        }
    }

    /// A failed run. Submissions made before the failure are kept: they are already on the
    /// network and the caller still has to track them.
    pub fn aborted(rap_name: String, error: &RapError, submissions: Vec<Submission>) -> Self {
        Self {
            succeeded: false,
            error_message: Some(error.error_message()),
            nonce_of_last_submitted: submissions.last().map(|s| s.nonce),
            submissions,
            rap_name,
        }
    }

    pub fn tx_hashes(&self) -> Vec<TxHash> {
        self.submissions
            .iter()
            .map(|s| s.tx_hash)
            .collect()
    }

    /// Hash of the value-transferring transaction, if the run got that far.
    pub fn final_tx_hash(&self) -> Option<TxHash> {
        if self.succeeded {
            self.submissions
                .last()
                .map(|s| s.tx_hash)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        models::{action::ActionKind, transaction::GasEstimate},
        HANDLED_ERROR,
    };

    fn submission(index: usize, nonce: Nonce) -> Submission {
        Submission {
            index,
            kind: ActionKind::Swap,
            chain_id: 1,
            tx_hash: TxHash::with_last_byte(index as u8 + 1),
            nonce,
            gas: GasEstimate::estimated(100_000),
            confirmed: false,
        }
    }

    #[test]
    fn test_completed_reports_last_nonce() {
        let result =
            RapResult::completed("unlock + swap".into(), vec![submission(0, 7), submission(1, 8)]);

        assert!(result.succeeded);
        assert_eq!(result.nonce_of_last_submitted, Some(8));
        assert_eq!(result.final_tx_hash(), Some(TxHash::with_last_byte(2)));
        assert_eq!(result.tx_hashes().len(), 2);
    }

    #[test]
    fn test_aborted_without_submissions() {
        let result = RapResult::aborted("swap".into(), &RapError::Cancelled, vec![]);

        assert_eq!(
            result,
            RapResult {
                succeeded: false,
                error_message: Some(HANDLED_ERROR.to_string()),
                nonce_of_last_submitted: None,
                submissions: vec![],
                rap_name: "swap".into(),
            }
        );
        assert_eq!(result.final_tx_hash(), None);
    }
}

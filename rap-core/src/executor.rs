use std::sync::Arc;

use metrics::counter;
use rap_common::{
    models::{
        action::{ActionDescriptor, ActionKind},
        chains,
        intent::RapSettings,
        plan::RapPlan,
        transaction::{GasEstimate, SignedTransaction, Submission, TransactionRequest},
        Nonce,
    },
    traits::{ChainRpc, Signer},
    ActionError,
};
use tracing::{debug, info, instrument, warn};

use crate::{config::EngineConfig, gas::GasEstimator, nonce::NonceSequencer};

/// What has to happen on chain before the action after this one may be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwaitPolicy {
    /// The next action depends on this one's effect: wait for a successful receipt.
    Confirmation,
    /// Wait until the node reports the transaction, so a follow-up read sees it.
    NodeAck,
    None,
}

/// A signed transaction for one action that has not been sent yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedAction {
    index: usize,
    kind: ActionKind,
    gas: GasEstimate,
    signed: SignedTransaction,
}

impl PreparedAction {
    pub fn nonce(&self) -> Nonce {
        self.signed.nonce
    }
}

/// Executes single actions of a plan.
///
/// Execution is split so the engine controls what may be interrupted and can record a
/// submission before waiting on it: [`ActionExecutor::prepare`] populates, estimates, leases a
/// nonce and signs without touching the mempool; [`ActionExecutor::broadcast`] sends;
/// [`ActionExecutor::settle`] waits for whatever the [`AwaitPolicy`] requires. A failed
/// broadcast is returned as is, never retried here.
pub struct ActionExecutor {
    rpc: Arc<dyn ChainRpc>,
    signer: Arc<dyn Signer>,
    estimator: GasEstimator,
    config: Arc<EngineConfig>,
}

impl ActionExecutor {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        signer: Arc<dyn Signer>,
        config: Arc<EngineConfig>,
    ) -> Self {
        let estimator = GasEstimator::new(rpc.clone(), config.clone());
        Self { rpc, signer, estimator, config }
    }

    pub fn await_policy(&self, plan: &RapPlan, index: usize) -> AwaitPolicy {
        let next_depends = plan
            .actions()
            .get(index + 1)
            .is_some_and(ActionDescriptor::depends_on_prior_output);
        if next_depends {
            AwaitPolicy::Confirmation
        } else if self
            .config
            .chain(plan.chain_id())
            .wait_for_node_ack
        {
            AwaitPolicy::NodeAck
        } else {
            AwaitPolicy::None
        }
    }

    /// Everything up to the broadcast. `is_final` is false for every action but the plan's
    /// last, which are priced at the fast gas price if that is higher.
    #[instrument(
        skip(self, action, nonces, settings),
        fields(kind = %action.kind(), chain_id = action.chain_id(), permit = action.permit())
    )]
    pub async fn prepare(
        &self,
        index: usize,
        action: &ActionDescriptor,
        is_final: bool,
        nonces: &mut NonceSequencer,
        settings: &RapSettings,
    ) -> Result<PreparedAction, ActionError> {
        let tx = populate(action, settings, is_final);
        let gas = self.estimator.estimate(action, &tx).await?;
        let lease = nonces
            .lease(action.from(), action.chain_id())
            .await?;
        let tx = tx
            .with_nonce(lease.nonce)
            .with_gas_limit(gas.gas_limit);

        let signed = self
            .signer
            .sign_transaction(&tx)
            .await
            .inspect_err(|err| warn!(nonce = lease.nonce, error = %err, "Signing failed"))?;
        debug!(nonce = lease.nonce, gas_limit = gas.gas_limit, "Signed action");
        Ok(PreparedAction { index, kind: action.kind(), gas, signed })
    }

    /// Sends a prepared action. Exactly one transaction reaches the network on success; on
    /// failure it may or may not have.
    #[instrument(skip_all, fields(index = prepared.index, nonce = prepared.nonce()))]
    pub async fn broadcast(&self, prepared: PreparedAction) -> Result<Submission, ActionError> {
        let PreparedAction { index, kind, gas, signed } = prepared;
        let chain = self.config.chain(signed.chain_id);
        let broadcast = self
            .rpc
            .send_raw_transaction(signed.chain_id, &signed);
        let tx_hash = match tokio::time::timeout(chain.broadcast_timeout(), broadcast).await {
            Ok(Ok(tx_hash)) => tx_hash,
            Ok(Err(err)) => {
                warn!(error = %err, "Broadcast failed");
                return Err(ActionError::BroadcastFailed(err.to_string()));
            }
            Err(_) => {
                warn!("Broadcast timed out");
                return Err(ActionError::BroadcastFailed(format!(
                    "no answer within {}ms",
                    chain.broadcast_timeout_ms
                )));
            }
        };

        counter!("rap_broadcasts_total", "kind" => kind.to_string()).increment(1);
        info!(%tx_hash, %kind, gas_limit = gas.gas_limit, "Broadcast action");
        Ok(Submission {
            index,
            kind,
            chain_id: signed.chain_id,
            tx_hash,
            nonce: signed.nonce,
            gas,
            confirmed: false,
        })
    }

    /// Waits for the condition `policy` sets on a broadcast transaction.
    #[instrument(skip_all, fields(index = submission.index, tx_hash = %submission.tx_hash))]
    pub async fn settle(
        &self,
        submission: &mut Submission,
        policy: AwaitPolicy,
    ) -> Result<(), ActionError> {
        match policy {
            AwaitPolicy::Confirmation => self.wait_for_confirmation(submission).await,
            AwaitPolicy::NodeAck => {
                self.wait_for_node_ack(submission).await;
                Ok(())
            }
            AwaitPolicy::None => Ok(()),
        }
    }

    async fn wait_for_confirmation(&self, submission: &mut Submission) -> Result<(), ActionError> {
        let chain = self.config.chain(submission.chain_id);
        let tx_hash = submission.tx_hash;
        let wait = self
            .rpc
            .wait_for_confirmation(submission.chain_id, tx_hash);
        match tokio::time::timeout(chain.confirmation_timeout(), wait).await {
            Ok(Ok(receipt)) if receipt.success => {
                debug!(block = receipt.block_number, gas_used = receipt.gas_used, "Confirmed");
                submission.confirmed = true;
                Ok(())
            }
            Ok(Ok(receipt)) => {
                warn!(block = receipt.block_number, "Transaction reverted on chain");
                Err(ActionError::TransactionReverted { tx_hash })
            }
            // The node lost track of it; the transaction may still land.
            Ok(Err(err)) => {
                warn!(error = %err, "Waiting for confirmation failed");
                Err(ActionError::ConfirmationTimeout { tx_hash })
            }
            Err(_) => {
                warn!(timeout_ms = chain.confirmation_timeout_ms, "No confirmation in time");
                Err(ActionError::ConfirmationTimeout { tx_hash })
            }
        }
    }

    async fn wait_for_node_ack(&self, submission: &Submission) {
        let chain = self.config.chain(submission.chain_id);
        for attempt in 1..=chain.node_ack_max_tries {
            match self
                .rpc
                .is_transaction_known(submission.chain_id, submission.tx_hash)
                .await
            {
                Ok(true) => {
                    debug!(attempt, "Node acknowledged transaction");
                    return;
                }
                Ok(false) => {}
                Err(err) => debug!(attempt, error = %err, "Node ack poll failed"),
            }
            if attempt < chain.node_ack_max_tries {
                tokio::time::sleep(chain.node_ack_interval()).await;
            }
        }
        warn!(tries = chain.node_ack_max_tries, "Node never acknowledged transaction");
    }
}

fn populate(
    action: &ActionDescriptor,
    settings: &RapSettings,
    is_final: bool,
) -> TransactionRequest {
    let gas_price = match (&settings.gas_price, &settings.fast_gas_price) {
        (Some(selected), Some(fast)) if !is_final => Some(selected.at_least(fast)),
        (None, Some(fast)) if !is_final => Some(fast.clone()),
        (selected, _) => selected.clone(),
    };
    TransactionRequest {
        chain_id: action.chain_id(),
        from: action.from(),
        to: action.call_target(),
        data: action.call_data().clone(),
        value: action.value(),
        nonce: None,
        gas_limit: None,
        gas_price,
        private: settings.flashbots_enabled && action.chain_id() == chains::MAINNET,
    }
}

use std::{fmt, sync::Arc};

use metrics::counter;
use rap_common::{
    models::{
        action::ActionDescriptor,
        intent::{RapIntent, RapSettings},
        plan::RapPlan,
        result::RapResult,
        transaction::Submission,
    },
    traits::{ChainRpc, QuoteProvider, Signer},
    ActionError, RapError,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    config::EngineConfig,
    executor::ActionExecutor,
    gas::GasEstimator,
    nonce::NonceSequencer,
    planner::RapPlanner,
};

/// Position of a run in its lifecycle. `Aborted` and `Completed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RapState {
    Planning,
    /// Working on the action at this index of the plan.
    Executing(usize),
    Aborted,
    Completed,
}

impl fmt::Display for RapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RapState::Planning => write!(f, "planning"),
            RapState::Executing(index) => write!(f, "executing({index})"),
            RapState::Aborted => write!(f, "aborted"),
            RapState::Completed => write!(f, "completed"),
        }
    }
}

/// Plans and runs Raps for one signer.
///
/// Every run gets its own [`NonceSequencer`], so concurrent runs for the same account each
/// start from the pending transaction count. Runs are not memoized: calling [`RapEngine::run`]
/// twice for the same intent submits twice.
pub struct RapEngine {
    signer: Arc<dyn Signer>,
    rpc: Arc<dyn ChainRpc>,
    config: Arc<EngineConfig>,
    planner: RapPlanner,
    estimator: GasEstimator,
    executor: ActionExecutor,
}

impl RapEngine {
    pub fn new(rpc: Arc<dyn ChainRpc>, signer: Arc<dyn Signer>, config: EngineConfig) -> Self {
        let config = Arc::new(config);
        Self {
            planner: RapPlanner::new(rpc.clone(), config.clone()),
            estimator: GasEstimator::new(rpc.clone(), config.clone()),
            executor: ActionExecutor::new(rpc.clone(), signer.clone(), config.clone()),
            signer,
            rpc,
            config,
        }
    }

    /// Enables claim-bridge Raps, which are sized from a fresh quote.
    pub fn with_quote_provider(mut self, quotes: Arc<dyn QuoteProvider>) -> Self {
        self.planner = self.planner.with_quote_provider(quotes);
        self
    }

    pub async fn plan(
        &self,
        intent: &RapIntent,
        settings: &RapSettings,
    ) -> Result<RapPlan, RapError> {
        self.planner
            .plan(intent, self.signer.as_ref(), settings)
            .await
    }

    /// Total gas limit the plan for `intent` would need, for fee previews.
    pub async fn estimate_gas(
        &self,
        intent: &RapIntent,
        settings: &RapSettings,
    ) -> Result<u64, RapError> {
        let plan = self.plan(intent, settings).await?;
        self.estimator
            .estimate_plan(&plan)
            .await
            .map_err(|err| RapError::PlanningFailed(format!("gas estimation failed: {err}")))
    }

    /// Plans and executes `intent`. Never fails: every outcome is reported in the result.
    ///
    /// `cancel` is honoured until the first transaction has been handed to the node. After
    /// that the run always continues to completion or abort.
    #[instrument(skip_all, fields(rap_type = %intent.rap_type(), chain_id = intent.chain_id()))]
    pub async fn run(
        &self,
        intent: &RapIntent,
        settings: &RapSettings,
        cancel: &CancellationToken,
    ) -> RapResult {
        let rap_name = intent.rap_type().to_string();
        debug!(state = %RapState::Planning, "Rap state");
        let planned = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RapError::Cancelled),
            plan = self.plan(intent, settings) => plan,
        };
        match planned {
            Ok(plan) => self.execute(&plan, settings, cancel).await,
            Err(err) => abort(rap_name, err, Vec::new()),
        }
    }

    /// Executes an already planned Rap.
    #[instrument(skip_all, fields(rap = %plan.name(), chain_id = plan.chain_id()))]
    pub async fn execute(
        &self,
        plan: &RapPlan,
        settings: &RapSettings,
        cancel: &CancellationToken,
    ) -> RapResult {
        let read_timeout = self
            .config
            .chain(plan.chain_id())
            .read_timeout();
        let mut nonces = NonceSequencer::new(self.rpc.clone(), read_timeout);
        let mut submissions: Vec<Submission> = Vec::with_capacity(plan.actions().len());

        for (index, action) in plan.actions().iter().enumerate() {
            debug!(state = %RapState::Executing(index), kind = %action.kind(), "Rap state");
            let step = self
                .execute_action(
                    plan,
                    index,
                    action,
                    &mut nonces,
                    settings,
                    cancel,
                    &mut submissions,
                )
                .await;
            if let Err(err) = step {
                return abort(plan.name(), err, submissions);
            }
        }

        counter!("rap_runs_total", "outcome" => "completed").increment(1);
        info!(state = %RapState::Completed, transactions = submissions.len(), "Rap completed");
        RapResult::completed(plan.name(), submissions)
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_action(
        &self,
        plan: &RapPlan,
        index: usize,
        action: &ActionDescriptor,
        nonces: &mut NonceSequencer,
        settings: &RapSettings,
        cancel: &CancellationToken,
        submissions: &mut Vec<Submission>,
    ) -> Result<(), RapError> {
        let cancellable = submissions.is_empty();
        let mut submission = self
            .submit_with_retry(plan, index, action, nonces, settings, cancel, cancellable)
            .await?;
        let policy = self.executor.await_policy(plan, index);
        let settled = self
            .executor
            .settle(&mut submission, policy)
            .await;
        submissions.push(submission);
        settled.map_err(|err| RapError::action_failed(index, action.kind(), err))
    }

    /// Submits `action`, retrying failed broadcasts with a fresh nonce lease each time.
    ///
    /// While `cancellable`, `cancel` interrupts anything up to the broadcast. A transaction
    /// handed to the node may land even when the call fails, so the first broadcast attempt
    /// ends cancellation for good.
    #[allow(clippy::too_many_arguments)]
    async fn submit_with_retry(
        &self,
        plan: &RapPlan,
        index: usize,
        action: &ActionDescriptor,
        nonces: &mut NonceSequencer,
        settings: &RapSettings,
        cancel: &CancellationToken,
        mut cancellable: bool,
    ) -> Result<Submission, RapError> {
        let max_attempts = self.config.broadcast_retry.max_attempts;
        let is_final = plan.is_terminal(index);
        let mut attempt = 1;
        loop {
            let prepare = self
                .executor
                .prepare(index, action, is_final, nonces, settings);
            let prepared = if cancellable {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(RapError::Cancelled),
                    prepared = prepare => prepared,
                }
            } else {
                prepare.await
            };
            let submitted = match prepared {
                Ok(prepared) => {
                    cancellable = false;
                    self.executor.broadcast(prepared).await
                }
                Err(err) => Err(err),
            };
            match submitted {
                Ok(submission) => return Ok(submission),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    counter!("rap_broadcast_retries_total").increment(1);
                    warn!(index, attempt, error = %err, "Retrying broadcast with a fresh nonce");
                    attempt += 1;
                }
                Err(ActionError::BroadcastFailed(reason)) => {
                    return Err(RapError::BroadcastRetriesExhausted {
                        index,
                        kind: action.kind(),
                        attempts: attempt,
                        reason,
                    })
                }
                Err(err) => return Err(RapError::action_failed(index, action.kind(), err)),
            }
        }
    }
}

fn abort(rap_name: String, err: RapError, submissions: Vec<Submission>) -> RapResult {
    if err == RapError::Cancelled {
        counter!("rap_runs_total", "outcome" => "cancelled").increment(1);
        info!(state = %RapState::Aborted, rap = %rap_name, "Rap cancelled");
    } else {
        counter!("rap_runs_total", "outcome" => "aborted").increment(1);
        error!(
            state = %RapState::Aborted,
            rap = %rap_name,
            submitted = submissions.len(),
            error = %err,
            "Rap aborted"
        );
    }
    RapResult::aborted(rap_name, &err, submissions)
}

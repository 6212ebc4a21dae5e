use std::sync::Arc;

use metrics::counter;
use rap_common::{
    models::{
        action::ActionDescriptor,
        plan::RapPlan,
        transaction::{GasEstimate, TransactionRequest},
    },
    traits::ChainRpc,
    ActionError, EstimateGasError,
};
use tracing::{debug, instrument, warn};

use crate::config::{ChainConfig, EngineConfig, BPS_DENOMINATOR};

/// Applies a basis point padding factor, saturating at `u64::MAX`.
pub fn pad(gas: u64, padding_bps: u64) -> u64 {
    let padded = u128::from(gas) * u128::from(padding_bps) / u128::from(BPS_DENOMINATOR);
    u64::try_from(padded).unwrap_or(u64::MAX)
}

/// Gas limits for planned actions.
///
/// A successful `estimate_gas` is padded by the per-kind factor of the chain. If the node can
/// not be asked (transport error, node error, timeout) the limit falls back to the quote's
/// suggestion or the configured units for the action kind, 1.5x for trades. A revert never
/// falls back: it is reported as [`ActionError::EstimationRevert`] so the action is not
/// broadcast.
#[derive(Clone)]
pub struct GasEstimator {
    rpc: Arc<dyn ChainRpc>,
    config: Arc<EngineConfig>,
}

impl GasEstimator {
    pub fn new(rpc: Arc<dyn ChainRpc>, config: Arc<EngineConfig>) -> Self {
        Self { rpc, config }
    }

    #[instrument(level = "debug", skip_all, fields(kind = %action.kind(), chain_id = tx.chain_id))]
    pub async fn estimate(
        &self,
        action: &ActionDescriptor,
        tx: &TransactionRequest,
    ) -> Result<GasEstimate, ActionError> {
        let chain = self.config.chain(tx.chain_id);
        let estimation = self.rpc.estimate_gas(tx);
        match tokio::time::timeout(chain.estimation_timeout(), estimation).await {
            Ok(Ok(gas)) => {
                let gas_limit = pad(gas, chain.padding_bps(action.kind()));
                debug!(gas, gas_limit, "Estimated gas");
                Ok(GasEstimate::estimated(gas_limit))
            }
            Ok(Err(EstimateGasError::Reverted(reason))) => {
                warn!(%reason, "Gas estimation reverted");
                Err(ActionError::EstimationRevert(reason))
            }
            Ok(Err(EstimateGasError::Rpc(err))) => {
                warn!(error = %err, "Gas estimation failed, using fallback limit");
                Ok(self.fallback(action, chain))
            }
            Err(_) => {
                warn!(
                    timeout_ms = chain.estimation_timeout_ms,
                    "Gas estimation timed out, using fallback limit"
                );
                Ok(self.fallback(action, chain))
            }
        }
    }

    /// Total gas limit of a plan, for fee previews.
    ///
    /// Actions depending on an earlier one cannot be simulated before it lands, so they are
    /// counted at their fallback limit.
    #[instrument(level = "debug", skip_all, fields(rap = %plan.name()))]
    pub async fn estimate_plan(&self, plan: &RapPlan) -> Result<u64, ActionError> {
        let chain = self.config.chain(plan.chain_id());
        let mut total: u64 = 0;
        for action in plan.actions() {
            let gas = if action.depends_on_prior_output() {
                fallback_limit(action, chain)
            } else {
                let tx = TransactionRequest {
                    chain_id: action.chain_id(),
                    from: action.from(),
                    to: action.call_target(),
                    data: action.call_data().clone(),
                    value: action.value(),
                    nonce: None,
                    gas_limit: None,
                    gas_price: None,
                    private: false,
                };
                self.estimate(action, &tx)
                    .await?
                    .gas_limit
            };
            total = total.saturating_add(gas);
        }
        Ok(total)
    }

    fn fallback(&self, action: &ActionDescriptor, chain: &ChainConfig) -> GasEstimate {
        counter!("rap_gas_fallbacks_total", "kind" => action.kind().to_string()).increment(1);
        GasEstimate::fallback(fallback_limit(action, chain))
    }
}

fn fallback_limit(action: &ActionDescriptor, chain: &ChainConfig) -> u64 {
    action
        .default_gas_limit()
        .unwrap_or_else(|| chain.gas_units.fallback_for(action.kind()))
}

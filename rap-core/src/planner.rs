use std::sync::Arc;

use alloy_primitives::{Address, U256};
use rap_common::{
    models::{
        action::{ActionDescriptor, ActionKind},
        intent::{
            ClaimBridgeParameters, RapIntent, RapSettings, RapType, RevokeParameters,
            SwapParameters, TokenStandard,
        },
        plan::RapPlan,
        quote::{CrosschainQuote, QuoteRequest, ResolvedQuote, SwapType},
        transaction::BlockTag,
        ChainId,
    },
    traits::{ChainRpc, QuoteProvider, Signer},
    RapError,
};
use rap_ethereum::calls;
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;

/// Slippage requested for claim bridge quotes.
const CLAIM_BRIDGE_SLIPPAGE_BPS: u32 = 200;

/// How the route gets hold of the sold token.
#[derive(Debug)]
enum TokenAccess {
    /// Native asset or an allowance that already covers the amount.
    Granted,
    Approval(ActionDescriptor),
    /// The route signs a permit itself; no approval transaction.
    Permit,
}

/// Turns a user intent into an ordered [`RapPlan`].
///
/// Planning is deterministic: the only outside inputs are the allowance and balance reads
/// (plus the quote for claim bridges), so planning the same intent twice against the same
/// chain state yields the same actions. Any failure to read the allowance aborts planning
/// rather than assuming no approval is needed.
pub struct RapPlanner {
    rpc: Arc<dyn ChainRpc>,
    quotes: Option<Arc<dyn QuoteProvider>>,
    config: Arc<EngineConfig>,
}

impl RapPlanner {
    pub fn new(rpc: Arc<dyn ChainRpc>, config: Arc<EngineConfig>) -> Self {
        Self { rpc, quotes: None, config }
    }

    /// Enables claim bridge planning, which fetches its own quotes.
    pub fn with_quote_provider(mut self, quotes: Arc<dyn QuoteProvider>) -> Self {
        self.quotes = Some(quotes);
        self
    }

    #[instrument(skip_all, fields(rap_type = %intent.rap_type(), chain_id = intent.chain_id()))]
    pub async fn plan(
        &self,
        intent: &RapIntent,
        signer: &dyn Signer,
        settings: &RapSettings,
    ) -> Result<RapPlan, RapError> {
        let from = signer.address();
        if signer.is_watch_only() {
            return Err(RapError::PlanningFailed(format!(
                "account {from} is watch-only and cannot sign"
            )));
        }

        let plan = match intent {
            RapIntent::Swap(params) | RapIntent::CrosschainSwap(params) => {
                self.plan_swap(intent.rap_type(), params, from, settings)
                    .await?
            }
            RapIntent::Bridge(params) => {
                self.plan_bridge(params, from, settings)
                    .await?
            }
            RapIntent::ClaimBridge(params) => {
                self.plan_claim_bridge(params, from, settings)
                    .await?
            }
            RapIntent::RevokeApproval(params) => plan_revoke(params, from)?,
        };
        debug!(rap = %plan.name(), actions = plan.actions().len(), "Planned rap");
        Ok(plan)
    }

    async fn plan_swap(
        &self,
        rap_type: RapType,
        params: &SwapParameters,
        from: Address,
        settings: &RapSettings,
    ) -> Result<RapPlan, RapError> {
        let quote = resolve_quote(params, from, settings)?;
        let base = quote.base();
        let chain_id = params.chain_id;

        let actions = match base.swap_type {
            SwapType::Wrap => vec![ActionDescriptor::new(
                ActionKind::Wrap,
                chain_id,
                from,
                base.buy_token_address,
                calls::encode_wrap(),
                params.sell_amount,
            )],
            // Unwrapping burns the caller's own wrapped tokens, no allowance involved.
            SwapType::Unwrap => {
                let fallback_gas = base
                    .default_gas_limit
                    .unwrap_or(self.config.chain(chain_id).gas_units.unwrap);
                vec![ActionDescriptor::new(
                    ActionKind::Swap,
                    chain_id,
                    from,
                    base.sell_token_address,
                    calls::encode_unwrap(params.sell_amount),
                    U256::ZERO,
                )
                .with_default_gas_limit(Some(fallback_gas))]
            }
            SwapType::Normal | SwapType::CrossChain => {
                let kind = if quote.is_crosschain() {
                    ActionKind::CrosschainSwap
                } else {
                    ActionKind::Swap
                };
                let access = self
                    .token_access(
                        params.asset_to_sell.is_native_asset(),
                        params.asset_to_sell.address,
                        spender(&quote),
                        params.sell_amount,
                        from,
                        chain_id,
                        settings,
                    )
                    .await?;
                let terminal = terminal(kind, &quote, chain_id, from);
                match access {
                    TokenAccess::Granted => vec![terminal],
                    TokenAccess::Approval(approval) => with_preparation(vec![approval], terminal),
                    TokenAccess::Permit => vec![terminal.with_permit()],
                }
            }
        };
        RapPlan::new(rap_type, Some(quote), actions)
    }

    async fn plan_bridge(
        &self,
        params: &SwapParameters,
        from: Address,
        settings: &RapSettings,
    ) -> Result<RapPlan, RapError> {
        let quote = resolve_quote(params, from, settings)?;
        let ResolvedQuote::CrosschainQuote(crosschain) = &quote else {
            return Err(RapError::PlanningFailed("bridge requires a crosschain quote".into()));
        };
        let chain_id = params.chain_id;
        let selling_native = params.asset_to_sell.is_native_asset();

        let mut preparation = Vec::new();
        let (token, is_native) = if selling_native && crosschain.requires_wrapped_input {
            let wrapped = self
                .config
                .chain(chain_id)
                .wrapped_native
                .ok_or_else(|| {
                    RapError::PlanningFailed(format!(
                        "bridge needs wrapped native input but chain {chain_id} has none configured"
                    ))
                })?;
            preparation.push(ActionDescriptor::new(
                ActionKind::Wrap,
                chain_id,
                from,
                wrapped,
                calls::encode_wrap(),
                params.sell_amount,
            ));
            (wrapped, false)
        } else {
            (params.asset_to_sell.address, selling_native)
        };

        let mut bridge = terminal(ActionKind::Bridge, &quote, chain_id, from);
        match self
            .token_access(
                is_native,
                token,
                spender(&quote),
                params.sell_amount,
                from,
                chain_id,
                settings,
            )
            .await?
        {
            TokenAccess::Granted => {}
            TokenAccess::Approval(approval) if preparation.is_empty() => preparation.push(approval),
            TokenAccess::Approval(approval) => {
                preparation.push(approval.depending_on_prior_output())
            }
            TokenAccess::Permit => bridge = bridge.with_permit(),
        }

        let actions = with_preparation(preparation, bridge);
        RapPlan::new(RapType::Bridge, Some(quote), actions)
    }

    /// Bridges claimed native funds, lowering the amount when the leftover balance cannot pay
    /// for the bridge transaction.
    async fn plan_claim_bridge(
        &self,
        params: &ClaimBridgeParameters,
        from: Address,
        settings: &RapSettings,
    ) -> Result<RapPlan, RapError> {
        if params.address != from {
            return Err(RapError::PlanningFailed(format!(
                "claimed funds belong to {} but the signer is {from}",
                params.address
            )));
        }
        let quotes = self.quotes.as_deref().ok_or_else(|| {
            RapError::PlanningFailed("claim bridge needs a quote provider".into())
        })?;
        let gas_price = settings
            .gas_price
            .as_ref()
            .ok_or_else(|| {
                RapError::PlanningFailed("claim bridge needs a gas price to size the bridge".into())
            })?;
        let chain_id = params.chain_id;
        let chain = self.config.chain(chain_id);

        let mut quote = self
            .claim_bridge_quote(quotes, params, params.sell_amount)
            .await?;
        let gas_limit = quote
            .quote
            .default_gas_limit
            .unwrap_or_else(|| chain.gas_units.fallback_for(ActionKind::ClaimBridge));
        let fee = U256::from(gas_price.max_fee(gas_limit));

        let read = self
            .rpc
            .get_balance(from, chain_id, BlockTag::Latest);
        let balance = match tokio::time::timeout(chain.read_timeout(), read).await {
            Ok(Ok(balance)) => balance,
            Ok(Err(err)) => {
                warn!(error = %err, "Balance read failed");
                return Err(RapError::PlanningFailed(format!("failed to read balance: {err}")));
            }
            Err(_) => {
                warn!("Balance read timed out");
                return Err(RapError::PlanningFailed("balance read timed out".into()));
            }
        };

        if balance.saturating_sub(params.sell_amount) < fee {
            if params.sell_amount < fee {
                return Err(RapError::PlanningFailed(format!(
                    "insufficient funds: claimed {} wei cannot pay the {fee} wei bridge fee",
                    params.sell_amount
                )));
            }
            let affordable = params.sell_amount - fee;
            info!(claimed = %params.sell_amount, %affordable, %fee, "Bridging less to cover gas");
            quote = self
                .claim_bridge_quote(quotes, params, affordable)
                .await?;
        }

        let bridge = ActionDescriptor::new(
            ActionKind::ClaimBridge,
            chain_id,
            from,
            quote.quote.to,
            quote.quote.data.clone(),
            quote.quote.value,
        )
        .with_default_gas_limit(quote.quote.default_gas_limit);
        let quote = ResolvedQuote::CrosschainQuote(quote);
        RapPlan::new(RapType::ClaimBridge, Some(quote), vec![bridge])
    }

    async fn claim_bridge_quote(
        &self,
        quotes: &dyn QuoteProvider,
        params: &ClaimBridgeParameters,
        sell_amount: U256,
    ) -> Result<CrosschainQuote, RapError> {
        let request = QuoteRequest {
            from: params.address,
            chain_id: params.chain_id,
            to_chain_id: params.to_chain_id,
            sell_token_address: Address::ZERO,
            buy_token_address: Address::ZERO,
            sell_amount,
            slippage_bps: CLAIM_BRIDGE_SLIPPAGE_BPS,
            swap_type: SwapType::CrossChain,
        };
        let timeout = self
            .config
            .chain(params.chain_id)
            .read_timeout();
        let response =
            match tokio::time::timeout(timeout, quotes.get_claim_bridge_quote(&request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => {
                    warn!(error = %err, "Claim bridge quote failed");
                    return Err(RapError::PlanningFailed(format!(
                        "failed to fetch claim bridge quote: {err}"
                    )));
                }
                Err(_) => {
                    return Err(RapError::PlanningFailed("claim bridge quote timed out".into()))
                }
            };
        match response.resolve() {
            Ok(ResolvedQuote::CrosschainQuote(quote)) => Ok(quote),
            Ok(ResolvedQuote::Quote(_)) => {
                Err(RapError::PlanningFailed("claim bridge requires a crosschain quote".into()))
            }
            Err(err) => Err(RapError::PlanningFailed(format!(
                "quote error {}: {}",
                err.code, err.message
            ))),
        }
    }

    /// What `spender` needs before it can pull `amount` of `token`.
    #[allow(clippy::too_many_arguments)]
    #[instrument(level = "debug", skip(self, settings))]
    async fn token_access(
        &self,
        is_native: bool,
        token: Address,
        spender: Address,
        amount: U256,
        from: Address,
        chain_id: ChainId,
        settings: &RapSettings,
    ) -> Result<TokenAccess, RapError> {
        if is_native {
            return Ok(TokenAccess::Granted);
        }
        let chain = self.config.chain(chain_id);
        let read = self
            .rpc
            .get_allowance(from, spender, token, chain_id);
        let allowance = match tokio::time::timeout(chain.read_timeout(), read).await {
            Ok(Ok(allowance)) => allowance,
            Ok(Err(err)) => {
                warn!(error = %err, "Allowance read failed");
                return Err(RapError::PlanningFailed(format!(
                    "failed to read allowance of {token} for {spender}: {err}"
                )));
            }
            Err(_) => {
                warn!("Allowance read timed out");
                return Err(RapError::PlanningFailed(format!(
                    "allowance read of {token} for {spender} timed out"
                )));
            }
        };
        if allowance >= amount {
            debug!(%allowance, "Existing allowance is sufficient");
            return Ok(TokenAccess::Granted);
        }
        if chain.allows_permit(token) {
            debug!("Token supports permit, skipping approval");
            return Ok(TokenAccess::Permit);
        }

        let (kind, value) = if settings.unlimited_approval {
            (ActionKind::Unlock, U256::MAX)
        } else {
            (ActionKind::Approve, amount)
        };
        Ok(TokenAccess::Approval(ActionDescriptor::new(
            kind,
            chain_id,
            from,
            token,
            calls::encode_approve(spender, value),
            U256::ZERO,
        )))
    }
}

/// Resolves the quote once and checks it against the signer and the caller's settings.
fn resolve_quote(
    params: &SwapParameters,
    from: Address,
    settings: &RapSettings,
) -> Result<ResolvedQuote, RapError> {
    let quote = params
        .quote
        .clone()
        .resolve()
        .map_err(|err| {
            RapError::PlanningFailed(format!("quote error {}: {}", err.code, err.message))
        })?;
    let base = quote.base();
    if base.from != from {
        return Err(RapError::PlanningFailed(format!(
            "quote was issued for {} but the signer is {from}",
            base.from
        )));
    }
    if base.chain_id != params.chain_id {
        return Err(RapError::PlanningFailed(format!(
            "quote is for chain {} but the intent is on chain {}",
            base.chain_id, params.chain_id
        )));
    }
    if let Some(source) = &settings.source {
        if &base.source != source {
            return Err(RapError::PlanningFailed(format!(
                "quote source {} does not match requested source {source}",
                base.source
            )));
        }
    }
    if base.slippage_bps > settings.max_slippage_bps {
        return Err(RapError::PlanningFailed(format!(
            "quote slippage {}bps exceeds the maximum of {}bps",
            base.slippage_bps, settings.max_slippage_bps
        )));
    }
    Ok(quote)
}

fn spender(quote: &ResolvedQuote) -> Address {
    let base = quote.base();
    if base.allowance_target.is_zero() {
        base.to
    } else {
        base.allowance_target
    }
}

fn terminal(
    kind: ActionKind,
    quote: &ResolvedQuote,
    chain_id: ChainId,
    from: Address,
) -> ActionDescriptor {
    let base = quote.base();
    ActionDescriptor::new(kind, chain_id, from, base.to, base.data.clone(), base.value)
        .with_default_gas_limit(base.default_gas_limit)
}

/// Appends the terminal action, marking it dependent when anything precedes it.
fn with_preparation(
    mut preparation: Vec<ActionDescriptor>,
    terminal: ActionDescriptor,
) -> Vec<ActionDescriptor> {
    if preparation.is_empty() {
        preparation.push(terminal);
    } else {
        preparation.push(terminal.depending_on_prior_output());
    }
    preparation
}

fn plan_revoke(params: &RevokeParameters, from: Address) -> Result<RapPlan, RapError> {
    if params.from != from {
        return Err(RapError::PlanningFailed(format!(
            "approval belongs to {} but the signer is {from}",
            params.from
        )));
    }
    let call_data = match params.standard {
        TokenStandard::Erc20 => calls::encode_revoke_erc20(params.spender),
        TokenStandard::Erc721 => calls::encode_revoke_erc721(params.spender),
    };
    let action = ActionDescriptor::new(
        ActionKind::RevokeApproval,
        params.chain_id,
        from,
        params.token,
        call_data,
        U256::ZERO,
    );
    RapPlan::new(RapType::RevokeApproval, None, vec![action])
}

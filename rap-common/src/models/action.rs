use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::models::ChainId;

/// The kind of on-chain step an action performs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ActionKind {
    /// ERC-20 approval for exactly the amount being sold.
    Approve,
    Swap,
    CrosschainSwap,
    /// ERC-20 approval for an unlimited amount.
    Unlock,
    Wrap,
    Bridge,
    /// Bridges freshly claimed funds to another chain.
    ClaimBridge,
    RevokeApproval,
}

impl ActionKind {
    /// Approvals only prepare a later action and never move value themselves.
    pub fn is_approval(&self) -> bool {
        matches!(self, ActionKind::Approve | ActionKind::Unlock)
    }

    /// Kinds allowed as the final action of a plan.
    pub fn can_terminate(&self) -> bool {
        !self.is_approval()
    }

    /// Kinds executing an aggregator route.
    pub fn is_trade(&self) -> bool {
        matches!(
            self,
            ActionKind::Swap |
                ActionKind::CrosschainSwap |
                ActionKind::Bridge |
                ActionKind::ClaimBridge
        )
    }
}

/// One planned on-chain step.
///
/// Fields are private: once the planner hands a descriptor over it can only be read. The
/// consuming `with_*` builders exist for the planner while it assembles a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    kind: ActionKind,
    chain_id: ChainId,
    from: Address,
    call_target: Address,
    call_data: Bytes,
    value: U256,
    depends_on_prior_output: bool,
    default_gas_limit: Option<u64>,
    /// The route pulls the sold token with an EIP-2612 permit instead of a prior approval.
    #[serde(default)]
    permit: bool,
}

impl ActionDescriptor {
    pub fn new(
        kind: ActionKind,
        chain_id: ChainId,
        from: Address,
        call_target: Address,
        call_data: Bytes,
        value: U256,
    ) -> Self {
        Self {
            kind,
            chain_id,
            from,
            call_target,
            call_data,
            value,
            depends_on_prior_output: false,
            default_gas_limit: None,
            permit: false,
        }
    }

    /// Marks this action as requiring the previous action's effect to be confirmed on chain.
    pub fn depending_on_prior_output(mut self) -> Self {
        self.depends_on_prior_output = true;
        self
    }

    /// Gas limit suggested by the quote, preferred over the configured fallback.
    pub fn with_default_gas_limit(mut self, gas_limit: Option<u64>) -> Self {
        self.default_gas_limit = gas_limit;
        self
    }

    pub fn with_permit(mut self) -> Self {
        self.permit = true;
        self
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn from(&self) -> Address {
        self.from
    }

    pub fn call_target(&self) -> Address {
        self.call_target
    }

    pub fn call_data(&self) -> &Bytes {
        &self.call_data
    }

    pub fn value(&self) -> U256 {
        self.value
    }

    pub fn depends_on_prior_output(&self) -> bool {
        self.depends_on_prior_output
    }

    pub fn default_gas_limit(&self) -> Option<u64> {
        self.default_gas_limit
    }

    pub fn permit(&self) -> bool {
        self.permit
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(ActionKind::CrosschainSwap.to_string(), "crosschainSwap");
        assert_eq!(ActionKind::from_str("revokeApproval").unwrap(), ActionKind::RevokeApproval);
    }

    #[test]
    fn test_approvals_cannot_terminate() {
        assert!(!ActionKind::Approve.can_terminate());
        assert!(!ActionKind::Unlock.can_terminate());
        assert!(ActionKind::Wrap.can_terminate());
        assert!(ActionKind::Bridge.can_terminate());
        assert!(ActionKind::ClaimBridge.can_terminate());
    }

    #[test]
    fn test_trade_kinds() {
        assert!(ActionKind::Swap.is_trade());
        assert!(ActionKind::ClaimBridge.is_trade());
        assert!(!ActionKind::Wrap.is_trade());
        assert!(!ActionKind::Unlock.is_trade());
    }

    #[test]
    fn test_builders() {
        let action = ActionDescriptor::new(
            ActionKind::Swap,
            1,
            Address::ZERO,
            Address::ZERO,
            Bytes::new(),
            U256::ZERO,
        )
        .depending_on_prior_output()
        .with_default_gas_limit(Some(250_000));

        assert!(action.depends_on_prior_output());
        assert_eq!(action.default_gas_limit(), Some(250_000));
    }
}

use serde::{Deserialize, Serialize};

use crate::models::{
    action::{ActionDescriptor, ActionKind},
    error::RapError,
    intent::RapType,
    quote::ResolvedQuote,
    ChainId,
};

/// An ordered, validated list of actions fulfilling one intent.
///
/// Invariants, checked by [`RapPlan::new`] and on deserialization:
/// - there is at least one action,
/// - the last action is value-transferring (never an approval),
/// - every action runs on the same chain and from the same account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedPlan")]
pub struct RapPlan {
    rap_type: RapType,
    quote: Option<ResolvedQuote>,
    actions: Vec<ActionDescriptor>,
}

#[derive(Deserialize)]
struct UncheckedPlan {
    rap_type: RapType,
    quote: Option<ResolvedQuote>,
    actions: Vec<ActionDescriptor>,
}

impl TryFrom<UncheckedPlan> for RapPlan {
    type Error = RapError;

    fn try_from(value: UncheckedPlan) -> Result<Self, Self::Error> {
        RapPlan::new(value.rap_type, value.quote, value.actions)
    }
}

impl RapPlan {
    pub fn new(
        rap_type: RapType,
        quote: Option<ResolvedQuote>,
        actions: Vec<ActionDescriptor>,
    ) -> Result<Self, RapError> {
        let Some(last) = actions.last() else {
            return Err(RapError::PlanningFailed(format!("{rap_type} plan has no actions")));
        };
        if !last.kind().can_terminate() {
            return Err(RapError::PlanningFailed(format!(
                "{rap_type} plan ends with a {} action",
                last.kind()
            )));
        }
        let first = &actions[0];
        if actions
            .iter()
            .any(|a| a.chain_id() != first.chain_id() || a.from() != first.from())
        {
            return Err(RapError::PlanningFailed(format!(
                "{rap_type} plan mixes chains or senders"
            )));
        }
        Ok(Self { rap_type, quote, actions })
    }

    pub fn rap_type(&self) -> RapType {
        self.rap_type
    }

    pub fn quote(&self) -> Option<&ResolvedQuote> {
        self.quote.as_ref()
    }

    pub fn actions(&self) -> &[ActionDescriptor] {
        &self.actions
    }

    pub fn chain_id(&self) -> ChainId {
        self.actions[0].chain_id()
    }

    /// The value-transferring action the plan exists for.
    pub fn terminal_action(&self) -> &ActionDescriptor {
        &self.actions[self.actions.len() - 1]
    }

    pub fn is_terminal(&self, index: usize) -> bool {
        index + 1 == self.actions.len()
    }

    pub fn action_kinds(&self) -> Vec<ActionKind> {
        self.actions
            .iter()
            .map(ActionDescriptor::kind)
            .collect()
    }

    /// Human readable name, e.g. `unlock + swap`.
    pub fn name(&self) -> String {
        self.actions
            .iter()
            .map(|a| a.kind().to_string())
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

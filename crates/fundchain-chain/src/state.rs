// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use fundchain_core::{ClientError, ErrorCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractAction {
    CreateCampaign,
    Invest,
    Refund,
    Vote,
    ClaimReward,
    AddUpdateDate,
    RedeemReward,
}

impl ContractAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateCampaign => "create_campaign",
            Self::Invest => "invest",
            Self::Refund => "refund",
            Self::Vote => "vote",
            Self::ClaimReward => "claim_reward",
            Self::AddUpdateDate => "add_update_date",
            Self::RedeemReward => "redeem_reward",
        }
    }
}

impl fmt::Display for ContractAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    Idle,
    Validating,
    AwaitingSignature,
    Submitted,
    Confirmed,
    Failed,
}

impl ActionState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::AwaitingSignature => "awaiting_signature",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }

    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Validating)
                | (Self::Validating, Self::AwaitingSignature)
                | (Self::AwaitingSignature, Self::Submitted)
                | (Self::Submitted, Self::Confirmed)
                | (Self::Validating | Self::AwaitingSignature | Self::Submitted, Self::Failed)
        )
    }

    pub fn transition(self, next: Self) -> Result<Self, ClientError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ClientError::internal(format!(
                "illegal action transition {} -> {}",
                self.as_str(),
                next.as_str()
            )))
        }
    }
}

type GateKey = (ContractAction, String);

/// One pending submission per (action, subject). A second attempt while the first is
/// in flight fails with `ActionPending` instead of queueing.
#[derive(Debug, Default)]
pub struct ActionGate {
    inflight: Mutex<HashMap<GateKey, ActionState>>,
}

impl ActionGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(
        self: &Arc<Self>,
        action: ContractAction,
        subject: &str,
    ) -> Result<ActionTicket, ClientError> {
        let key = (action, subject.to_string());
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(state) = inflight.get(&key) {
            return Err(ClientError::new(
                ErrorCode::ActionPending,
                format!("{action} for `{subject}` is already {}", state.as_str()),
            )
            .with_detail("action", action.as_str())
            .with_detail("subject", subject)
            .with_detail("state", state.as_str()));
        }
        let state = ActionState::Idle.transition(ActionState::Validating)?;
        inflight.insert(key.clone(), state);
        debug!(action = action.as_str(), subject, "action gate acquired");
        Ok(ActionTicket {
            gate: Arc::clone(self),
            key,
            state,
        })
    }

    /// `Idle` when nothing is in flight for the pair.
    #[must_use]
    pub fn state_of(&self, action: ContractAction, subject: &str) -> ActionState {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(action, subject.to_string()))
            .copied()
            .unwrap_or(ActionState::Idle)
    }

    #[must_use]
    pub fn is_pending(&self, action: ContractAction, subject: &str) -> bool {
        let state = self.state_of(action, subject);
        state != ActionState::Idle && !state.is_terminal()
    }

    fn publish(&self, key: &GateKey, state: ActionState) {
        if let Some(slot) = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(key)
        {
            *slot = state;
        }
    }
}

/// Held for the lifetime of one submission; dropping it frees the gate.
#[derive(Debug)]
pub struct ActionTicket {
    gate: Arc<ActionGate>,
    key: GateKey,
    state: ActionState,
}

impl ActionTicket {
    #[must_use]
    pub fn state(&self) -> ActionState {
        self.state
    }

    #[must_use]
    pub fn action(&self) -> ContractAction {
        self.key.0
    }

    pub fn advance(&mut self, next: ActionState) -> Result<(), ClientError> {
        self.state = self.state.transition(next)?;
        self.gate.publish(&self.key, self.state);
        Ok(())
    }

    /// Moves to `Failed` unless already terminal.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = ActionState::Failed;
            self.gate.publish(&self.key, self.state);
        }
    }
}

impl Drop for ActionTicket {
    fn drop(&mut self) {
        self.gate
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_legal() {
        let mut s = ActionState::Idle;
        for next in [
            ActionState::Validating,
            ActionState::AwaitingSignature,
            ActionState::Submitted,
            ActionState::Confirmed,
        ] {
            s = s.transition(next).expect("legal");
        }
        assert!(s.is_terminal());
        assert!(ActionState::Confirmed.transition(ActionState::Failed).is_err());
        assert!(ActionState::Idle.transition(ActionState::Submitted).is_err());
        assert!(ActionState::Validating.transition(ActionState::Confirmed).is_err());
    }

    #[test]
    fn gate_refuses_duplicates_until_ticket_drops() {
        let gate = Arc::new(ActionGate::new());
        let mut ticket = gate.begin(ContractAction::Vote, "c1").expect("first");
        let err = gate.begin(ContractAction::Vote, "c1").expect_err("dup");
        assert_eq!(err.code, ErrorCode::ActionPending);
        assert!(gate.begin(ContractAction::Vote, "c2").is_ok());
        assert!(gate.begin(ContractAction::Refund, "c1").is_ok());

        ticket.advance(ActionState::AwaitingSignature).expect("advance");
        assert_eq!(
            gate.state_of(ContractAction::Vote, "c1"),
            ActionState::AwaitingSignature
        );
        assert!(gate.is_pending(ContractAction::Vote, "c1"));
        drop(ticket);
        assert_eq!(gate.state_of(ContractAction::Vote, "c1"), ActionState::Idle);
        assert!(gate.begin(ContractAction::Vote, "c1").is_ok());
    }
}

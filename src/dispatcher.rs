use crate::{
    contract::{
        ContractError,
        RoundsContract,
    },
    round::{
        BetSide,
        RoundOutcome,
    },
    state::{
        AppState,
        NotificationLevel,
        Update,
    },
};
use ethers::types::{
    H256,
    U256,
};
use std::{
    fmt,
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
};
use tracing::{
    error,
    info,
};

/// Each kind owns its own in-flight flag.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ActionKind {
    SetBettableStatus,
    DeclareResult,
    BetRed,
    BetBlue,
    GenesisStartRound,
}

impl ActionKind {
    pub fn label(self) -> &'static str {
        match self {
            ActionKind::SetBettableStatus => "Set Status",
            ActionKind::DeclareResult => "Declare Winner",
            ActionKind::BetRed => "Bet Red",
            ActionKind::BetBlue => "Bet Blue",
            ActionKind::GenesisStartRound => "Genesis Start Round",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Action {
    SetBettableStatus(bool),
    DeclareResult {
        outcome: RoundOutcome,
        round_id: U256,
    },
    PlaceBet {
        side: BetSide,
        round_id: U256,
        amount: U256,
    },
    GenesisStartRound,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::SetBettableStatus(_) => ActionKind::SetBettableStatus,
            Action::DeclareResult { .. } => ActionKind::DeclareResult,
            Action::PlaceBet {
                side: BetSide::Red, ..
            } => ActionKind::BetRed,
            Action::PlaceBet {
                side: BetSide::Blue,
                ..
            } => ActionKind::BetBlue,
            Action::GenesisStartRound => ActionKind::GenesisStartRound,
        }
    }

    /// Line appended to the transaction log once the transaction is mined.
    pub fn log_description(&self) -> String {
        match self {
            Action::SetBettableStatus(open) => format!("Set Bettable Status: {open}"),
            Action::DeclareResult { outcome, .. } => {
                format!("Declared Winner: {}", outcome.index())
            }
            Action::PlaceBet {
                side,
                round_id,
                amount,
            } => format!("Bet{side}: {amount} for Game: {round_id}"),
            Action::GenesisStartRound => String::from("Genesis Round Started"),
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self.kind() {
            ActionKind::SetBettableStatus => "Status Updated Successfully!",
            ActionKind::DeclareResult => "Winner Declared Successfully!",
            ActionKind::BetRed => "Bet on Red Successful!",
            ActionKind::BetBlue => "Bet on Blue Successful!",
            ActionKind::GenesisStartRound => "Genesis Round Started Successfully!",
        }
    }

    pub fn failure_message(&self) -> &'static str {
        match self.kind() {
            ActionKind::SetBettableStatus => "Status Update Failed!",
            ActionKind::DeclareResult => "Winner Declaration Failed, Game Still Open!",
            ActionKind::BetRed => "Failed to Bet on Red!",
            ActionKind::BetBlue => "Failed to Bet on Blue!",
            ActionKind::GenesisStartRound => "Failed to Start Genesis Round!",
        }
    }
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{kind} failed")]
    Contract {
        kind: ActionKind,
        #[source]
        source: ContractError,
    },
}

/// Submits user actions to the contract and reports their outcome on the
/// application's update channel.
pub struct ActionDispatcher<C> {
    contract: Arc<C>,
    updates: mpsc::UnboundedSender<Update>,
}

impl<C> Clone for ActionDispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            contract: self.contract.clone(),
            updates: self.updates.clone(),
        }
    }
}

/// Clears the action's in-flight flag on every exit path, unwinding included.
struct SettleGuard<'a> {
    kind: ActionKind,
    updates: &'a mpsc::UnboundedSender<Update>,
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        let _ = self.updates.send(Update::ActionSettled(self.kind));
    }
}

impl<C: RoundsContract> ActionDispatcher<C> {
    pub fn new(contract: Arc<C>, updates: mpsc::UnboundedSender<Update>) -> Self {
        Self { contract, updates }
    }

    /// Marks the action in flight and spawns its submission.
    ///
    /// Returns `None`, with a warning notification, when an action of the
    /// same kind is still pending.
    pub fn submit(
        &self,
        state: &mut AppState,
        action: Action,
    ) -> Option<JoinHandle<Result<H256, ActionError>>> {
        let kind = action.kind();
        if !state.begin_action(kind) {
            state.notify(
                NotificationLevel::Warning,
                format!("{kind} is already pending"),
            );
            return None;
        }
        let dispatcher = self.clone();
        Some(tokio::spawn(async move { dispatcher.dispatch(action).await }))
    }

    /// Sends one transaction and waits for it to be mined.
    ///
    /// The caller is expected to have marked the action in flight; an
    /// [`Update::ActionSettled`] is always emitted when this returns.
    pub async fn dispatch(&self, action: Action) -> Result<H256, ActionError> {
        let kind = action.kind();
        let _settle = SettleGuard {
            kind,
            updates: &self.updates,
        };
        info!(action = %kind, "submitting action");
        let submitted = match &action {
            Action::SetBettableStatus(open) => {
                self.contract.set_bettable_status(*open).await
            }
            Action::DeclareResult { outcome, round_id } => {
                self.contract.execute_round(*outcome, *round_id).await
            }
            Action::PlaceBet {
                side,
                round_id,
                amount,
            } => self.contract.bet(*side, *round_id, *amount).await,
            Action::GenesisStartRound => self.contract.genesis_start_round().await,
        };
        match submitted {
            Ok(tx_hash) => {
                info!(action = %kind, tx_hash = %format!("{tx_hash:#x}"), "action confirmed");
                let _ = self.updates.send(Update::ActionSucceeded {
                    kind,
                    description: action.log_description(),
                    message: action.success_message().to_string(),
                });
                Ok(tx_hash)
            }
            Err(source) => {
                error!(action = %kind, error = %source, "action failed");
                let _ = self.updates.send(Update::ActionFailed {
                    kind,
                    message: action.failure_message().to_string(),
                });
                Err(ActionError::Contract { kind, source })
            }
        }
    }
}

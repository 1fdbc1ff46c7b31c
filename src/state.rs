use crate::{
    dispatcher::ActionKind,
    explorer::ExplorerTransaction,
    round::Round,
};
use chrono::{
    DateTime,
    Local,
};
use ethers::types::U256;
use std::collections::{
    BTreeSet,
    VecDeque,
};

pub const NOTIFICATION_DEPTH: usize = 5;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NotificationLevel {
    Success,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub raised_at: DateTime<Local>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogEntry {
    Action(String),
    Transaction(ExplorerTransaction),
}

impl LogEntry {
    pub fn description(&self) -> String {
        match self {
            LogEntry::Action(description) => description.clone(),
            LogEntry::Transaction(tx) => format!(
                "Hash: {} From: {} To: {} Value: {}",
                tx.hash,
                tx.from,
                tx.to,
                tx.display_value()
            ),
        }
    }
}

/// In-memory history shown under the round panels; lost on exit.
#[derive(Clone, Debug, Default)]
pub struct TransactionLog {
    entries: Vec<LogEntry>,
}

impl TransactionLog {
    pub fn push_action(&mut self, description: impl Into<String>) {
        self.entries.push(LogEntry::Action(description.into()));
    }

    pub fn replace_with_history(&mut self, transactions: Vec<ExplorerTransaction>) {
        self.entries = transactions
            .into_iter()
            .map(LogEntry::Transaction)
            .collect();
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything that can change the application state. Produced by the
/// poller and by dispatched actions, consumed by [`AppState::apply`].
#[derive(Clone, Debug)]
pub enum Update {
    CurrentRound(U256),
    Round(Round),
    SearchedRound(Round),
    History(Vec<ExplorerTransaction>),
    ChainId(u64),
    ActionSucceeded {
        kind: ActionKind,
        description: String,
        message: String,
    },
    ActionFailed {
        kind: ActionKind,
        message: String,
    },
    ActionSettled(ActionKind),
}

/// Follow-up work requested by an update.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Effect {
    RefreshRound,
    RefreshHistory,
}

#[derive(Clone, Debug)]
pub struct AppState {
    pub expected_chain_id: u64,
    pub network_name: String,
    pub current_round: Option<U256>,
    pub round: Option<Round>,
    pub searched_round: Option<Round>,
    pub log: TransactionLog,
    pub chain_id: Option<u64>,
    pub last_synced: Option<DateTime<Local>>,
    pub read_only: bool,
    notifications: VecDeque<Notification>,
    in_flight: BTreeSet<ActionKind>,
}

impl AppState {
    pub fn new(expected_chain_id: u64, network_name: impl Into<String>) -> Self {
        Self {
            expected_chain_id,
            network_name: network_name.into(),
            current_round: None,
            round: None,
            searched_round: None,
            log: TransactionLog::default(),
            chain_id: None,
            last_synced: None,
            read_only: false,
            notifications: VecDeque::new(),
            in_flight: BTreeSet::new(),
        }
    }

    /// Marks `kind` in flight; false if it already was.
    pub fn begin_action(&mut self, kind: ActionKind) -> bool {
        self.in_flight.insert(kind)
    }

    pub fn is_in_flight(&self, kind: ActionKind) -> bool {
        self.in_flight.contains(&kind)
    }

    pub fn in_flight(&self) -> impl Iterator<Item = ActionKind> + '_ {
        self.in_flight.iter().copied()
    }

    pub fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) {
        self.notifications.push_back(Notification {
            level,
            message: message.into(),
            raised_at: Local::now(),
        });
        while self.notifications.len() > NOTIFICATION_DEPTH {
            self.notifications.pop_front();
        }
    }

    pub fn notifications(&self) -> impl DoubleEndedIterator<Item = &Notification> {
        self.notifications.iter()
    }

    pub fn apply(&mut self, update: Update) -> Vec<Effect> {
        match update {
            Update::CurrentRound(id) => {
                self.current_round = Some(id);
                Vec::new()
            }
            Update::Round(round) => {
                self.last_synced = Some(Local::now());
                if self.round.as_ref() == Some(&round) {
                    return Vec::new();
                }
                self.round = Some(round);
                vec![Effect::RefreshHistory]
            }
            Update::SearchedRound(round) => {
                self.searched_round = Some(round);
                Vec::new()
            }
            Update::History(transactions) => {
                if !transactions.is_empty() {
                    self.log.replace_with_history(transactions);
                }
                Vec::new()
            }
            Update::ChainId(chain_id) => {
                let previous = self.chain_id.replace(chain_id);
                if chain_id != self.expected_chain_id && previous != Some(chain_id) {
                    let message = format!(
                        "Please connect to {} (chain {})",
                        self.network_name, self.expected_chain_id
                    );
                    self.notify(NotificationLevel::Warning, message);
                }
                Vec::new()
            }
            Update::ActionSucceeded {
                description,
                message,
                ..
            } => {
                self.log.push_action(description);
                self.notify(NotificationLevel::Success, message);
                vec![Effect::RefreshRound]
            }
            Update::ActionFailed { message, .. } => {
                self.notify(NotificationLevel::Error, message);
                Vec::new()
            }
            Update::ActionSettled(kind) => {
                self.in_flight.remove(&kind);
                Vec::new()
            }
        }
    }
}

use crate::{
    contract::RoundsContract,
    explorer::TransactionHistory,
    fetcher::fetch_round,
    state::Update,
};
use ethers::types::{
    Address,
    U256,
};
use std::{
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{
        self,
        MissedTickBehavior,
    },
};
use tracing::{
    info,
    warn,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_CHAIN_CHECK_TICKS: u32 = 6;

#[derive(Clone, Debug)]
pub struct PollerSettings {
    pub interval: Duration,
    /// Contract whose explorer history is fetched.
    pub contract_address: Address,
    /// The chain id is re-read every this many ticks.
    pub chain_check_ticks: u32,
}

impl PollerSettings {
    pub fn new(interval: Duration, contract_address: Address) -> Self {
        Self {
            interval,
            contract_address,
            chain_check_ticks: DEFAULT_CHAIN_CHECK_TICKS,
        }
    }
}

enum PollerCommand {
    RefreshNow,
    Search(U256),
    FetchHistory,
    Shutdown,
}

type UpdateSender = mpsc::UnboundedSender<Update>;

/// Periodic reader of the current round; lives as long as the display.
pub struct RoundPoller {
    commands: mpsc::UnboundedSender<PollerCommand>,
    handle: Option<JoinHandle<()>>,
}

impl RoundPoller {
    pub fn start<C, H>(
        contract: Arc<C>,
        history: Option<H>,
        settings: PollerSettings,
        updates: UpdateSender,
    ) -> Self
    where
        C: RoundsContract,
        H: TransactionHistory,
    {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(poll_worker(
            contract, history, settings, command_rx, updates,
        ));
        Self {
            commands,
            handle: Some(handle),
        }
    }

    /// Reads the current round right away and restarts the schedule.
    pub fn refresh(&self) {
        self.send(PollerCommand::RefreshNow);
    }

    pub fn search(&self, id: U256) {
        self.send(PollerCommand::Search(id));
    }

    pub fn fetch_history(&self) {
        self.send(PollerCommand::FetchHistory);
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the worker and waits for it to exit.
    pub async fn stop(mut self) {
        self.send(PollerCommand::Shutdown);
        if let Some(handle) = self.handle.take()
            && let Err(err) = handle.await
        {
            warn!(?err, "round poller task failed");
        }
    }

    fn send(&self, command: PollerCommand) {
        if self.commands.send(command).is_err() {
            warn!("round poller is not running");
        }
    }
}

impl Drop for RoundPoller {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn poll_worker<C, H>(
    contract: Arc<C>,
    history: Option<H>,
    settings: PollerSettings,
    mut commands: mpsc::UnboundedReceiver<PollerCommand>,
    updates: UpdateSender,
) where
    C: RoundsContract,
    H: TransactionHistory,
{
    let mut ticker = time::interval(settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let chain_check_ticks = settings.chain_check_ticks.max(1);
    let mut ticks: u32 = 0;
    info!(interval = ?settings.interval, "round poller started");

    loop {
        let delivered = tokio::select! {
            _ = ticker.tick() => {
                let checked = if ticks % chain_check_ticks == 0 {
                    check_chain(contract.as_ref(), &updates).await
                } else {
                    true
                };
                ticks = ticks.wrapping_add(1);
                checked && sync_current_round(contract.as_ref(), &updates).await
            }
            cmd = commands.recv() => {
                match cmd {
                    None | Some(PollerCommand::Shutdown) => break,
                    Some(PollerCommand::RefreshNow) => {
                        let delivered = sync_current_round(contract.as_ref(), &updates).await;
                        ticker.reset();
                        delivered
                    }
                    Some(PollerCommand::Search(id)) => {
                        search_round(contract.as_ref(), id, &updates).await
                    }
                    Some(PollerCommand::FetchHistory) => match &history {
                        Some(history) => {
                            fetch_history(history, settings.contract_address, &updates).await
                        }
                        None => true,
                    },
                }
            }
        };
        if !delivered {
            warn!("update receiver dropped");
            break;
        }
    }
    info!("round poller stopped");
}

/// Returns false once nobody listens for updates anymore.
async fn sync_current_round<C: RoundsContract>(contract: &C, updates: &UpdateSender) -> bool {
    let id = match contract.current_round().await {
        Ok(id) => id,
        Err(err) => {
            warn!(error = %err, "reading current round failed");
            return true;
        }
    };
    if updates.send(Update::CurrentRound(id)).is_err() {
        return false;
    }
    match fetch_round(contract, id).await {
        Ok(round) => updates.send(Update::Round(round)).is_ok(),
        Err(err) => {
            warn!(error = %err, round = %id, "fetching round failed");
            true
        }
    }
}

async fn search_round<C: RoundsContract>(
    contract: &C,
    id: U256,
    updates: &UpdateSender,
) -> bool {
    match fetch_round(contract, id).await {
        Ok(round) => updates.send(Update::SearchedRound(round)).is_ok(),
        Err(err) => {
            warn!(error = %err, round = %id, "fetching searched round failed");
            true
        }
    }
}

async fn check_chain<C: RoundsContract>(contract: &C, updates: &UpdateSender) -> bool {
    match contract.chain_id().await {
        Ok(chain_id) => updates.send(Update::ChainId(chain_id)).is_ok(),
        Err(err) => {
            warn!(error = %err, "reading chain id failed");
            true
        }
    }
}

async fn fetch_history<H: TransactionHistory>(
    history: &H,
    address: Address,
    updates: &UpdateSender,
) -> bool {
    match history.transactions(address).await {
        Ok(transactions) if transactions.is_empty() => {
            warn!("explorer returned no transactions");
            true
        }
        Ok(transactions) => updates.send(Update::History(transactions)).is_ok(),
        Err(err) => {
            warn!(error = %err, "fetching transaction history failed");
            true
        }
    }
}

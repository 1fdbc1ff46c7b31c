use crate::{
    amounts,
    config::{
        AppConfig,
        WalletConfig,
    },
    contract::{
        EvmRoundsContract,
        RoundsContract,
    },
    dispatcher::{
        Action,
        ActionDispatcher,
    },
    explorer::ExplorerClient,
    fetcher,
    poller::{
        PollerSettings,
        RoundPoller,
    },
    state::{
        AppState,
        Effect,
        NotificationLevel,
        Update,
    },
    ui,
    wallets,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use ethers::{
    middleware::SignerMiddleware,
    providers::{
        Http,
        Provider,
    },
    signers::Signer,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{
    info,
    warn,
};

/// Connects to the contract and runs the terminal client until the user quits.
pub async fn run_app(config: AppConfig) -> Result<()> {
    let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
        .wrap_err_with(|| format!("Invalid RPC url {}", config.rpc_url))?;
    let history = config
        .explorer
        .as_ref()
        .map(|explorer| ExplorerClient::new(explorer.url.clone(), explorer.api_key.clone()))
        .transpose()
        .wrap_err("Failed to build explorer client")?;
    if history.is_none() {
        info!("no explorer API key configured; transaction history disabled");
    }

    match &config.wallet {
        WalletConfig::Keystore { name, dir } => {
            let descriptor = wallets::find_wallet(dir, name)?;
            let wallet = wallets::unlock_wallet(&descriptor, config.expected_chain_id)?;
            info!(address = ?wallet.address(), "wallet unlocked");
            let signer = SignerMiddleware::new(provider, wallet);
            let contract =
                EvmRoundsContract::new(config.contract_address, Arc::new(signer), true)?;
            let state = AppState::new(config.expected_chain_id, config.network_name());
            run_with_contract(contract, history, &config, state).await
        }
        WalletConfig::ReadOnly => {
            let contract =
                EvmRoundsContract::new(config.contract_address, Arc::new(provider), false)?;
            let mut state = AppState::new(config.expected_chain_id, config.network_name());
            state.read_only = true;
            state.notify(
                NotificationLevel::Warning,
                "No wallet selected; running read-only",
            );
            run_with_contract(contract, history, &config, state).await
        }
    }
}

async fn run_with_contract<C: RoundsContract>(
    contract: C,
    history: Option<ExplorerClient>,
    config: &AppConfig,
    state: AppState,
) -> Result<()> {
    let contract = Arc::new(contract);
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let settings = PollerSettings::new(config.poll_interval, config.contract_address);
    let poller = RoundPoller::start(contract.clone(), history, settings, updates_tx.clone());
    let dispatcher = ActionDispatcher::new(contract, updates_tx);

    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    info!("Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(
        state,
        &poller,
        &dispatcher,
        updates_rx,
        &mut ui_state,
        &mut input_events,
    )
    .await;
    ui::terminal_exit()?;
    poller.stop().await;
    res
}

async fn run_loop<C: RoundsContract>(
    mut state: AppState,
    poller: &RoundPoller,
    dispatcher: &ActionDispatcher<C>,
    mut updates: mpsc::UnboundedReceiver<Update>,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
) -> Result<()> {
    info!("Running app loop");
    ui::draw(ui_state, &state).wrap_err("initial draw failed")?;

    loop {
        tokio::select! {
            maybe_update = updates.recv() => {
                let Some(update) = maybe_update else {
                    warn!("update channel closed");
                    break;
                };
                for effect in state.apply(update) {
                    match effect {
                        Effect::RefreshRound => poller.refresh(),
                        Effect::RefreshHistory => poller.fetch_history(),
                    }
                }
                ui::draw(ui_state, &state).wrap_err("draw after update failed")?;
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            raw_ev = ui::next_raw_event(input_events) => {
                let event = raw_ev?;
                let Some(ev) = ui::interpret_event(ui_state, event) else {
                    continue;
                };
                if !handle_user_event(&mut state, poller, dispatcher, ev) {
                    break;
                }
                ui::draw(ui_state, &state).wrap_err("draw after input failed")?;
            }
        }
    }
    Ok(())
}

/// Turns a user intent into poller commands or a dispatched action.
///
/// Returns false when the user asked to quit.
pub fn handle_user_event<C: RoundsContract>(
    state: &mut AppState,
    poller: &RoundPoller,
    dispatcher: &ActionDispatcher<C>,
    event: ui::UserEvent,
) -> bool {
    let action = match event {
        ui::UserEvent::Quit => return false,
        ui::UserEvent::Redraw => return true,
        ui::UserEvent::Refresh => {
            poller.refresh();
            return true;
        }
        ui::UserEvent::Search(raw) => {
            match fetcher::parse_round_id(&raw) {
                Ok(id) => poller.search(id),
                Err(err) => state.notify(NotificationLevel::Error, err.to_string()),
            }
            return true;
        }
        ui::UserEvent::SetBettableStatus(open) => Action::SetBettableStatus(open),
        ui::UserEvent::DeclareResult(outcome) => match state.current_round {
            Some(round_id) => Action::DeclareResult { outcome, round_id },
            None => {
                state.notify(NotificationLevel::Error, "Current round not loaded yet");
                return true;
            }
        },
        ui::UserEvent::GenesisStartRound => Action::GenesisStartRound,
        ui::UserEvent::PlaceBet {
            side,
            round_id,
            amount,
        } => {
            let round_id = match fetcher::parse_round_id(&round_id) {
                Ok(id) => id,
                Err(err) => {
                    state.notify(NotificationLevel::Error, err.to_string());
                    return true;
                }
            };
            let amount = match amounts::to_base_units(&amount) {
                Ok(amount) => amount,
                Err(err) => {
                    state.notify(NotificationLevel::Error, err.to_string());
                    return true;
                }
            };
            Action::PlaceBet {
                side,
                round_id,
                amount,
            }
        }
    };
    // The handle is dropped; outcome arrives on the update channel.
    let _ = dispatcher.submit(state, action);
    true
}

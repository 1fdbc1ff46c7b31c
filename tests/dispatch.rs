#![allow(non_snake_case)]
use ethers::types::{
    Address,
    U256,
};
use fight_betting::{
    amounts::to_base_units,
    contract::{
        ContractError,
        EvmRoundsContract,
    },
    dispatcher::{
        Action,
        ActionDispatcher,
        ActionError,
        ActionKind,
    },
    round::{
        BetSide,
        RoundOutcome,
    },
    state::{
        AppState,
        Effect,
        NotificationLevel,
        Update,
    },
    test_helpers::{
        FakeCall,
        FakeRoundsContract,
        WriteBehavior,
    },
};
use std::sync::Arc;
use tokio::sync::mpsc;

const CHAIN_ID: u64 = 421613;

struct Harness {
    contract: FakeRoundsContract,
    dispatcher: ActionDispatcher<FakeRoundsContract>,
    updates: mpsc::UnboundedReceiver<Update>,
    state: AppState,
}

impl Harness {
    fn new() -> Self {
        let contract = FakeRoundsContract::new(CHAIN_ID);
        let (tx, updates) = mpsc::unbounded_channel();
        let dispatcher = ActionDispatcher::new(Arc::new(contract.clone()), tx);
        Self {
            contract,
            dispatcher,
            updates,
            state: AppState::new(CHAIN_ID, "Goerli Arb Testnet"),
        }
    }

    fn apply_updates(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        while let Ok(update) = self.updates.try_recv() {
            effects.extend(self.state.apply(update));
        }
        effects
    }

    fn notifications(&self) -> Vec<(NotificationLevel, String)> {
        self.state
            .notifications()
            .map(|n| (n.level, n.message.clone()))
            .collect()
    }
}

#[tokio::test]
async fn submit__confirmed_bet__logs_and_requests_refresh() {
    // given
    let mut h = Harness::new();
    let amount = to_base_units("1.5").unwrap();
    let action = Action::PlaceBet {
        side: BetSide::Red,
        round_id: U256::from(3u64),
        amount,
    };

    // when
    let handle = h.dispatcher.submit(&mut h.state, action).unwrap();
    assert!(h.state.is_in_flight(ActionKind::BetRed));
    handle.await.unwrap().unwrap();
    let effects = h.apply_updates();

    // then
    assert_eq!(effects, vec![Effect::RefreshRound]);
    assert_eq!(
        h.contract.calls(),
        vec![FakeCall::Bet(BetSide::Red, U256::from(3u64), amount)]
    );
    assert_eq!(
        h.state.log.entries()[0].description(),
        "BetRed: 1500000000000000000 for Game: 3"
    );
    assert_eq!(
        h.notifications(),
        vec![(NotificationLevel::Success, "Bet on Red Successful!".to_string())]
    );
    assert!(!h.state.is_in_flight(ActionKind::BetRed));
}

#[tokio::test]
async fn submit__reverted_transaction__notifies_and_clears_flag() {
    // given
    let mut h = Harness::new();
    h.contract.set_write_behavior(WriteBehavior::Revert);

    // when
    let handle = h
        .dispatcher
        .submit(&mut h.state, Action::SetBettableStatus(true))
        .unwrap();
    let result = handle.await.unwrap();
    let effects = h.apply_updates();

    // then
    assert!(matches!(
        result,
        Err(ActionError::Contract {
            kind: ActionKind::SetBettableStatus,
            source: ContractError::Reverted { .. },
        })
    ));
    assert!(effects.is_empty());
    assert!(h.state.log.is_empty());
    assert_eq!(
        h.notifications(),
        vec![(NotificationLevel::Error, "Status Update Failed!".to_string())]
    );
    assert!(!h.state.is_in_flight(ActionKind::SetBettableStatus));
}

#[tokio::test]
async fn submit__panicking_contract__still_clears_flag() {
    // given
    let mut h = Harness::new();
    h.contract.set_write_behavior(WriteBehavior::Panic);

    // when
    let handle = h
        .dispatcher
        .submit(&mut h.state, Action::GenesisStartRound)
        .unwrap();
    let joined = handle.await;
    h.apply_updates();

    // then
    assert!(joined.unwrap_err().is_panic());
    assert!(h.notifications().is_empty());
    assert!(!h.state.is_in_flight(ActionKind::GenesisStartRound));
}

#[tokio::test]
async fn submit__same_kind_pending__is_rejected() {
    // given
    let mut h = Harness::new();
    let bet = |side| Action::PlaceBet {
        side,
        round_id: U256::one(),
        amount: U256::exp10(18),
    };
    let first = h.dispatcher.submit(&mut h.state, bet(BetSide::Red)).unwrap();

    // when
    let duplicate = h.dispatcher.submit(&mut h.state, bet(BetSide::Red));
    let other_side = h.dispatcher.submit(&mut h.state, bet(BetSide::Blue));

    // then
    assert!(duplicate.is_none());
    assert_eq!(
        h.notifications(),
        vec![(NotificationLevel::Warning, "Bet Red is already pending".to_string())]
    );
    first.await.unwrap().unwrap();
    other_side.unwrap().await.unwrap().unwrap();
    h.apply_updates();
    assert_eq!(h.state.in_flight().count(), 0);
    assert_eq!(h.contract.count(|call| matches!(call, FakeCall::Bet(..))), 2);
}

#[tokio::test]
async fn dispatch__declare_result__calls_execute_round_with_index() {
    let mut h = Harness::new();
    let action = Action::DeclareResult {
        outcome: RoundOutcome::Blue,
        round_id: U256::from(12u64),
    };

    h.dispatcher.dispatch(action).await.unwrap();
    h.apply_updates();

    assert_eq!(
        h.contract.calls(),
        vec![FakeCall::ExecuteRound(RoundOutcome::Blue, U256::from(12u64))]
    );
    assert_eq!(h.state.log.entries()[0].description(), "Declared Winner: 1");
}

#[tokio::test]
async fn dispatch__read_only_contract__fails_with_missing_signer() {
    // given
    let (provider, _mock) = ethers::providers::Provider::mocked();
    let contract =
        EvmRoundsContract::new(Address::repeat_byte(0x41), Arc::new(provider), false).unwrap();
    let (tx, mut updates) = mpsc::unbounded_channel();
    let dispatcher = ActionDispatcher::new(Arc::new(contract), tx);
    let mut state = AppState::new(CHAIN_ID, "Goerli Arb Testnet");

    // when
    let result = dispatcher
        .submit(&mut state, Action::SetBettableStatus(false))
        .unwrap()
        .await
        .unwrap();
    while let Ok(update) = updates.try_recv() {
        state.apply(update);
    }

    // then
    assert!(matches!(
        result,
        Err(ActionError::Contract {
            source: ContractError::MissingSigner { .. },
            ..
        })
    ));
    assert!(!state.is_in_flight(ActionKind::SetBettableStatus));
    assert_eq!(
        state.notifications().last().map(|n| n.message.as_str()),
        Some("Status Update Failed!")
    );
}

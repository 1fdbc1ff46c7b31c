use crate::{
    contract::{
        ContractError,
        RoundsContract,
    },
    explorer::{
        ExplorerError,
        ExplorerTransaction,
        TransactionHistory,
    },
    round::{
        BetSide,
        RoundOutcome,
    },
};
use ethers::{
    abi::Token,
    types::{
        Address,
        H256,
        U256,
    },
};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
    },
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FakeCall {
    CurrentRound,
    Rounds(U256),
    ChainId,
    SetBettableStatus(bool),
    ExecuteRound(RoundOutcome, U256),
    Bet(BetSide, U256, U256),
    GenesisStartRound,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WriteBehavior {
    #[default]
    Confirm,
    Revert,
    Panic,
}

#[derive(Debug, Default)]
struct FakeState {
    current_round: Option<U256>,
    records: HashMap<U256, Vec<Token>>,
    chain_id: u64,
    writes: WriteBehavior,
    calls: Vec<FakeCall>,
}

/// In-memory contract recording every call it receives.
///
/// Reads of an unset current round or an unknown record fail like an
/// unreachable node would.
#[derive(Clone, Debug, Default)]
pub struct FakeRoundsContract {
    state: Arc<Mutex<FakeState>>,
}

impl FakeRoundsContract {
    pub fn new(chain_id: u64) -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().chain_id = chain_id;
        fake
    }

    pub fn set_current_round(&self, id: u64) {
        self.state.lock().unwrap().current_round = Some(U256::from(id));
    }

    pub fn set_record(&self, id: u64, record: Vec<Token>) {
        self.state
            .lock()
            .unwrap()
            .records
            .insert(U256::from(id), record);
    }

    pub fn set_write_behavior(&self, behavior: WriteBehavior) {
        self.state.lock().unwrap().writes = behavior;
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, matches: impl Fn(&FakeCall) -> bool) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| matches(call))
            .count()
    }

    fn record_call(&self, call: FakeCall) -> WriteBehavior {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state.writes
    }

    fn write(&self, method: &'static str, call: FakeCall) -> Result<H256, ContractError> {
        let tx_hash = H256::from_low_u64_be(self.calls().len() as u64 + 1);
        match self.record_call(call) {
            WriteBehavior::Confirm => Ok(tx_hash),
            WriteBehavior::Revert => Err(ContractError::Reverted { method, tx_hash }),
            WriteBehavior::Panic => panic!("{method} blew up"),
        }
    }
}

impl RoundsContract for FakeRoundsContract {
    async fn current_round(&self) -> Result<U256, ContractError> {
        self.record_call(FakeCall::CurrentRound);
        self.state
            .lock()
            .unwrap()
            .current_round
            .ok_or_else(|| ContractError::call("currentRound", "node unreachable"))
    }

    async fn rounds(&self, id: U256) -> Result<Vec<Token>, ContractError> {
        self.record_call(FakeCall::Rounds(id));
        self.state
            .lock()
            .unwrap()
            .records
            .get(&id)
            .cloned()
            .ok_or_else(|| ContractError::call("rounds", "node unreachable"))
    }

    async fn chain_id(&self) -> Result<u64, ContractError> {
        self.record_call(FakeCall::ChainId);
        Ok(self.state.lock().unwrap().chain_id)
    }

    async fn set_bettable_status(&self, open: bool) -> Result<H256, ContractError> {
        self.write("_setBettableStatus", FakeCall::SetBettableStatus(open))
    }

    async fn execute_round(
        &self,
        outcome: RoundOutcome,
        round_id: U256,
    ) -> Result<H256, ContractError> {
        self.write("executeRound", FakeCall::ExecuteRound(outcome, round_id))
    }

    async fn bet(
        &self,
        side: BetSide,
        round_id: U256,
        amount: U256,
    ) -> Result<H256, ContractError> {
        let method = match side {
            BetSide::Red => "betRed",
            BetSide::Blue => "betBlue",
        };
        self.write(method, FakeCall::Bet(side, round_id, amount))
    }

    async fn genesis_start_round(&self) -> Result<H256, ContractError> {
        self.write("genesisStartRound", FakeCall::GenesisStartRound)
    }
}

/// Builds a `rounds(id)` tuple with amounts given in wei.
pub fn round_record(
    id: u64,
    total: &str,
    red: &str,
    blue: &str,
    is_open: bool,
    result: u8,
) -> Vec<Token> {
    let wei = |raw: &str| Token::Uint(U256::from_dec_str(raw).unwrap());
    vec![
        Token::Uint(U256::from(id)),
        Token::Uint(U256::zero()),
        wei(total),
        wei(red),
        wei(blue),
        Token::Uint(U256::from(2u64)),
        Token::Bool(is_open),
        Token::Uint(U256::from(result)),
    ]
}

#[derive(Clone, Debug, Default)]
pub struct FakeHistory {
    transactions: Arc<Mutex<Vec<ExplorerTransaction>>>,
    requests: Arc<Mutex<Vec<Address>>>,
}

impl FakeHistory {
    pub fn with_transactions(transactions: Vec<ExplorerTransaction>) -> Self {
        Self {
            transactions: Arc::new(Mutex::new(transactions)),
            requests: Arc::default(),
        }
    }

    pub fn requests(&self) -> Vec<Address> {
        self.requests.lock().unwrap().clone()
    }
}

impl TransactionHistory for FakeHistory {
    async fn transactions(
        &self,
        address: Address,
    ) -> Result<Vec<ExplorerTransaction>, ExplorerError> {
        self.requests.lock().unwrap().push(address);
        Ok(self.transactions.lock().unwrap().clone())
    }
}

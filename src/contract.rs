use crate::round::{
    BetSide,
    RoundOutcome,
};
use ethers::{
    abi::{
        Abi,
        Token,
        Tokenize,
        parse_abi,
    },
    contract::Contract,
    providers::Middleware,
    types::{
        Address,
        H256,
        U64,
        U256,
    },
};
use std::{
    fmt,
    future::Future,
    sync::Arc,
};
use thiserror::Error;

/// Human-readable ABI of the betting contract, limited to what the client uses.
pub const ROUNDS_ABI: [&str; 7] = [
    "function currentRound() external view returns (uint256)",
    "function rounds(uint256) external view returns (uint256, uint256, uint256, uint256, uint256, uint256, bool, uint8)",
    "function _setBettableStatus(bool) external",
    "function executeRound(uint8, uint256) external",
    "function betRed(uint256, uint256) external",
    "function betBlue(uint256, uint256) external",
    "function genesisStartRound() external",
];

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("`{method}` call failed: {reason}")]
    Call { method: &'static str, reason: String },
    #[error("`{method}` submission failed: {reason}")]
    Submit { method: &'static str, reason: String },
    #[error("`{method}` transaction {tx_hash:#x} reverted")]
    Reverted { method: &'static str, tx_hash: H256 },
    #[error("`{method}` transaction was dropped before confirmation")]
    Dropped { method: &'static str },
    #[error("`{method}` needs a wallet; the client is running read-only")]
    MissingSigner { method: &'static str },
    #[error("invalid contract ABI: {0}")]
    Abi(String),
}

impl ContractError {
    pub fn call(method: &'static str, err: impl fmt::Display) -> Self {
        ContractError::Call {
            method,
            reason: err.to_string(),
        }
    }

    pub fn submit(method: &'static str, err: impl fmt::Display) -> Self {
        ContractError::Submit {
            method,
            reason: err.to_string(),
        }
    }
}

/// Remote betting contract as seen by the client: two reads, five writes
/// and the chain id of the node it is reached through.
///
/// Writes resolve once the transaction is mined, yielding its hash.
pub trait RoundsContract: Send + Sync + 'static {
    fn current_round(&self) -> impl Future<Output = Result<U256, ContractError>> + Send;

    /// Raw `rounds(id)` tuple, flattened into its fields.
    fn rounds(
        &self,
        id: U256,
    ) -> impl Future<Output = Result<Vec<Token>, ContractError>> + Send;

    fn chain_id(&self) -> impl Future<Output = Result<u64, ContractError>> + Send;

    fn set_bettable_status(
        &self,
        open: bool,
    ) -> impl Future<Output = Result<H256, ContractError>> + Send;

    fn execute_round(
        &self,
        outcome: RoundOutcome,
        round_id: U256,
    ) -> impl Future<Output = Result<H256, ContractError>> + Send;

    fn bet(
        &self,
        side: BetSide,
        round_id: U256,
        amount: U256,
    ) -> impl Future<Output = Result<H256, ContractError>> + Send;

    fn genesis_start_round(
        &self,
    ) -> impl Future<Output = Result<H256, ContractError>> + Send;
}

/// ethers-rs binding of [`RoundsContract`].
///
/// `M` is either a bare provider (read-only) or a signer middleware.
pub struct EvmRoundsContract<M> {
    contract: Contract<M>,
    can_sign: bool,
}

impl<M> Clone for EvmRoundsContract<M> {
    fn clone(&self) -> Self {
        Self {
            contract: self.contract.clone(),
            can_sign: self.can_sign,
        }
    }
}

impl<M: Middleware + 'static> EvmRoundsContract<M> {
    pub fn new(
        address: Address,
        client: Arc<M>,
        can_sign: bool,
    ) -> Result<Self, ContractError> {
        let abi: Abi =
            parse_abi(&ROUNDS_ABI).map_err(|e| ContractError::Abi(e.to_string()))?;
        Ok(Self {
            contract: Contract::new(address, abi, client),
            can_sign,
        })
    }

    async fn transact<T: Tokenize>(
        &self,
        method: &'static str,
        args: T,
    ) -> Result<H256, ContractError> {
        if !self.can_sign {
            return Err(ContractError::MissingSigner { method });
        }
        let call = self
            .contract
            .method::<_, ()>(method, args)
            .map_err(|e| ContractError::Abi(e.to_string()))?;
        let pending = call
            .send()
            .await
            .map_err(|e| ContractError::submit(method, e))?;
        let tx_hash = pending.tx_hash();
        tracing::info!(method, tx_hash = %format!("{tx_hash:#x}"), "transaction submitted");
        let receipt = pending
            .await
            .map_err(|e| ContractError::submit(method, e))?
            .ok_or(ContractError::Dropped { method })?;
        if receipt.status == Some(U64::zero()) {
            return Err(ContractError::Reverted { method, tx_hash });
        }
        Ok(tx_hash)
    }
}

impl<M: Middleware + 'static> RoundsContract for EvmRoundsContract<M> {
    async fn current_round(&self) -> Result<U256, ContractError> {
        self.contract
            .method::<_, U256>("currentRound", ())
            .map_err(|e| ContractError::Abi(e.to_string()))?
            .call()
            .await
            .map_err(|e| ContractError::call("currentRound", e))
    }

    async fn rounds(&self, id: U256) -> Result<Vec<Token>, ContractError> {
        let token = self
            .contract
            .method::<_, Token>("rounds", id)
            .map_err(|e| ContractError::Abi(e.to_string()))?
            .call()
            .await
            .map_err(|e| ContractError::call("rounds", e))?;
        Ok(match token {
            Token::Tuple(fields) => fields,
            other => vec![other],
        })
    }

    async fn chain_id(&self) -> Result<u64, ContractError> {
        let chain_id = self
            .contract
            .client()
            .get_chainid()
            .await
            .map_err(|e| ContractError::call("eth_chainId", e))?;
        Ok(chain_id.low_u64())
    }

    async fn set_bettable_status(&self, open: bool) -> Result<H256, ContractError> {
        self.transact("_setBettableStatus", open).await
    }

    async fn execute_round(
        &self,
        outcome: RoundOutcome,
        round_id: U256,
    ) -> Result<H256, ContractError> {
        self.transact("executeRound", (outcome.index(), round_id))
            .await
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
        self.transact(method, (round_id, amount)).await
    }

    async fn genesis_start_round(&self) -> Result<H256, ContractError> {
        self.transact("genesisStartRound", ()).await
    }
}

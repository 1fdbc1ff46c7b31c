use crate::{
    contract::{
        ContractError,
        RoundsContract,
    },
    round::{
        RecordError,
        Round,
    },
};
use ethers::types::U256;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("`{0}` is not a round number")]
    InvalidRoundId(String),
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error("malformed round record: {0}")]
    Malformed(#[from] RecordError),
}

/// Parses a user supplied round number (unsigned decimal).
pub fn parse_round_id(raw: &str) -> Result<U256, FetchError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FetchError::InvalidRoundId(raw.to_string()));
    }
    U256::from_dec_str(trimmed).map_err(|_| FetchError::InvalidRoundId(raw.to_string()))
}

/// Reads `rounds(id)` once and converts it into a display [`Round`].
pub async fn fetch_round<C: RoundsContract>(
    contract: &C,
    id: U256,
) -> Result<Round, FetchError> {
    let record = contract.rounds(id).await?;
    let round = Round::from_record(&record)?;
    Ok(round)
}

pub async fn fetch_round_str<C: RoundsContract>(
    contract: &C,
    raw_id: &str,
) -> Result<Round, FetchError> {
    let id = parse_round_id(raw_id)?;
    fetch_round(contract, id).await
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn parse_round_id__accepts_padded_decimal() {
        assert_eq!(parse_round_id(" 42 ").unwrap(), U256::from(42u64));
    }

    #[test]
    fn parse_round_id__rejects_non_numeric_input() {
        for raw in ["", "abc", "-1", "4.2", "0x2a"] {
            assert!(
                matches!(parse_round_id(raw), Err(FetchError::InvalidRoundId(_))),
                "{raw} should be rejected"
            );
        }
    }
}

use crate::amounts::display_amount;
use ethers::{
    abi::Token,
    types::U256,
};
use std::fmt;
use thiserror::Error;

/// Number of values returned by the contract's `rounds(id)` getter.
pub const ROUND_RECORD_FIELDS: usize = 8;

/// Display copy of one on-chain round.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Round {
    pub id_game: String,
    pub total_amount_bet: String,
    pub red_amount: String,
    pub blue_amount: String,
    pub odds_amount: String,
    pub is_open: bool,
    pub result: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("round record has {found} fields, expected {ROUND_RECORD_FIELDS}")]
    TooShort { found: usize },
    #[error("round record field {index} ({name}) is not a {expected}")]
    FieldType {
        index: usize,
        name: &'static str,
        expected: &'static str,
    },
}

impl Round {
    /// Builds a round from the raw `rounds(id)` tuple:
    /// `(idGame, _, totalAmountBet, redAmount, blueAmount, oddsAmount, isOpen, result)`.
    pub fn from_record(record: &[Token]) -> Result<Self, RecordError> {
        if record.len() < ROUND_RECORD_FIELDS {
            return Err(RecordError::TooShort {
                found: record.len(),
            });
        }
        Ok(Self {
            id_game: uint_field(record, 0, "idGame")?.to_string(),
            total_amount_bet: display_amount(uint_field(record, 2, "totalAmountBet")?),
            red_amount: display_amount(uint_field(record, 3, "redAmount")?),
            blue_amount: display_amount(uint_field(record, 4, "blueAmount")?),
            odds_amount: uint_field(record, 5, "oddsAmount")?.to_string(),
            is_open: bool_field(record, 6, "isOpen")?,
            result: uint_field(record, 7, "result")?.to_string(),
        })
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_open { "OPEN" } else { "CLOSED" }
    }

    pub fn outcome(&self) -> Option<RoundOutcome> {
        self.result.parse::<u8>().ok().and_then(RoundOutcome::from_index)
    }
}

fn uint_field(
    record: &[Token],
    index: usize,
    name: &'static str,
) -> Result<U256, RecordError> {
    record[index]
        .clone()
        .into_uint()
        .ok_or(RecordError::FieldType {
            index,
            name,
            expected: "uint",
        })
}

fn bool_field(
    record: &[Token],
    index: usize,
    name: &'static str,
) -> Result<bool, RecordError> {
    record[index]
        .clone()
        .into_bool()
        .ok_or(RecordError::FieldType {
            index,
            name,
            expected: "bool",
        })
}

/// Result values accepted by `executeRound`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RoundOutcome {
    Red,
    Blue,
    Draw,
}

impl RoundOutcome {
    pub const ALL: [RoundOutcome; 3] =
        [RoundOutcome::Red, RoundOutcome::Blue, RoundOutcome::Draw];

    pub fn index(self) -> u8 {
        match self {
            RoundOutcome::Red => 0,
            RoundOutcome::Blue => 1,
            RoundOutcome::Draw => 2,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|outcome| outcome.index() == index)
    }

    pub fn next(self) -> Self {
        Self::from_index((self.index() + 1) % 3).unwrap_or(self)
    }

    pub fn prev(self) -> Self {
        Self::from_index((self.index() + 2) % 3).unwrap_or(self)
    }
}

impl fmt::Display for RoundOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoundOutcome::Red => "RED",
            RoundOutcome::Blue => "BLUE",
            RoundOutcome::Draw => "DRAW",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BetSide {
    Red,
    Blue,
}

impl BetSide {
    pub fn toggle(self) -> Self {
        match self {
            BetSide::Red => BetSide::Blue,
            BetSide::Blue => BetSide::Red,
        }
    }
}

impl fmt::Display for BetSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetSide::Red => write!(f, "Red"),
            BetSide::Blue => write!(f, "Blue"),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn record(id: u64, total: &str, red: &str, blue: &str) -> Vec<Token> {
        vec![
            Token::Uint(U256::from(id)),
            Token::Uint(U256::from(1_700_000_000u64)),
            Token::Uint(U256::from_dec_str(total).unwrap()),
            Token::Uint(U256::from_dec_str(red).unwrap()),
            Token::Uint(U256::from_dec_str(blue).unwrap()),
            Token::Uint(U256::from(2u64)),
            Token::Bool(true),
            Token::Uint(U256::from(1u64)),
        ]
    }

    #[test]
    fn from_record__valid_record__formats_monetary_fields() {
        // given
        let raw = record(
            7,
            "1234000000000000000000",
            "1500000000000000000",
            "1232500000000000000000",
        );

        // when
        let round = Round::from_record(&raw).unwrap();

        // then
        let expected = Round {
            id_game: "7".into(),
            total_amount_bet: "1,234".into(),
            red_amount: "1.5".into(),
            blue_amount: "1,232.5".into(),
            odds_amount: "2".into(),
            is_open: true,
            result: "1".into(),
        };
        assert_eq!(expected, round);
        assert_eq!(round.outcome(), Some(RoundOutcome::Blue));
        assert_eq!(round.status_label(), "OPEN");
    }

    #[test]
    fn from_record__short_record__is_rejected() {
        let mut raw = record(1, "0", "0", "0");
        raw.truncate(5);

        let err = Round::from_record(&raw).unwrap_err();

        assert_eq!(err, RecordError::TooShort { found: 5 });
    }

    #[test]
    fn from_record__wrong_field_type__names_the_field() {
        let mut raw = record(1, "0", "0", "0");
        raw[6] = Token::Uint(U256::one());

        let err = Round::from_record(&raw).unwrap_err();

        assert_eq!(
            err,
            RecordError::FieldType {
                index: 6,
                name: "isOpen",
                expected: "bool",
            }
        );
    }

    #[test]
    fn round_outcome__cycles_through_all_values() {
        assert_eq!(RoundOutcome::Red.next(), RoundOutcome::Blue);
        assert_eq!(RoundOutcome::Draw.next(), RoundOutcome::Red);
        assert_eq!(RoundOutcome::Red.prev(), RoundOutcome::Draw);
        assert_eq!(RoundOutcome::from_index(3), None);
    }
}

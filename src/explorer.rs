use crate::amounts::display_amount;
use ethers::types::{
    Address,
    U256,
};
use reqwest::StatusCode;
use serde::Deserialize;
use std::future::Future;
use thiserror::Error;

pub const DEFAULT_EXPLORER_URL: &str = "https://api-testnet.polygonscan.com";

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("explorer request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("explorer responded with {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("explorer returned an error: {message} ({detail})")]
    Api { message: String, detail: String },
    #[error("invalid explorer payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One entry of the explorer's `txlist` for the contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExplorerTransaction {
    pub hash: String,
    pub from: String,
    pub to: String,
    /// Native value in wei as reported by the explorer.
    pub value: String,
}

impl ExplorerTransaction {
    pub fn display_value(&self) -> String {
        match U256::from_dec_str(&self.value) {
            Ok(wei) => display_amount(wei),
            Err(_) => self.value.clone(),
        }
    }
}

/// Source of the contract's transaction history.
pub trait TransactionHistory: Send + Sync + 'static {
    fn transactions(
        &self,
        address: Address,
    ) -> impl Future<Output = Result<Vec<ExplorerTransaction>, ExplorerError>> + Send;
}

/// Etherscan-compatible block explorer client.
#[derive(Clone)]
pub struct ExplorerClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl ExplorerClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ExplorerError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            base_url,
            api_key: api_key.into(),
            http,
        })
    }

    pub async fn txlist(
        &self,
        address: Address,
    ) -> Result<Vec<ExplorerTransaction>, ExplorerError> {
        let url = format!("{}/api", self.base_url);
        let address = format!("{address:#x}");
        let res = self
            .http
            .get(url)
            .query(&[
                ("module", "account"),
                ("action", "txlist"),
                ("address", address.as_str()),
                ("startblock", "0"),
                ("endblock", "99999999"),
                ("sort", "asc"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;
        let status = res.status();
        let bytes = res.bytes().await?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            return Err(ExplorerError::Status { status, body });
        }
        parse_txlist(&bytes)
    }
}

impl TransactionHistory for ExplorerClient {
    async fn transactions(
        &self,
        address: Address,
    ) -> Result<Vec<ExplorerTransaction>, ExplorerError> {
        self.txlist(address).await
    }
}

/// Decodes a `txlist` response body.
///
/// The explorer signals failures with `status: "0"` and puts the reason in
/// `result` as a string, so `result` is only decoded as a list on success.
pub fn parse_txlist(bytes: &[u8]) -> Result<Vec<ExplorerTransaction>, ExplorerError> {
    let dto: TxListResponseDto = serde_json::from_slice(bytes)?;
    if dto.status != "1" {
        let detail = match dto.result {
            serde_json::Value::String(detail) => detail,
            other => other.to_string(),
        };
        return Err(ExplorerError::Api {
            message: dto.message,
            detail,
        });
    }
    let transactions: Vec<TransactionDto> = serde_json::from_value(dto.result)?;
    Ok(transactions.into_iter().map(Into::into).collect())
}

#[derive(Deserialize)]
struct TxListResponseDto {
    status: String,
    #[serde(default)]
    message: String,
    result: serde_json::Value,
}

#[derive(Deserialize)]
struct TransactionDto {
    hash: String,
    from: String,
    #[serde(default)]
    to: String,
    value: String,
}

impl From<TransactionDto> for ExplorerTransaction {
    fn from(dto: TransactionDto) -> Self {
        Self {
            hash: dto.hash,
            from: dto.from,
            to: dto.to,
            value: dto.value,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn parse_txlist__success__keeps_hash_parties_and_value() {
        // given
        let body = br#"{
            "status": "1",
            "message": "OK",
            "result": [
                {
                    "blockNumber": "100",
                    "hash": "0xabc",
                    "from": "0x1111",
                    "to": "0x41c3eb04fe81ae149b868f3645da03a8b3bed9fc",
                    "value": "2500000000000000000",
                    "gas": "21000"
                }
            ]
        }"#;

        // when
        let txs = parse_txlist(body).unwrap();

        // then
        let expected = vec![ExplorerTransaction {
            hash: "0xabc".into(),
            from: "0x1111".into(),
            to: "0x41c3eb04fe81ae149b868f3645da03a8b3bed9fc".into(),
            value: "2500000000000000000".into(),
        }];
        assert_eq!(expected, txs);
        assert_eq!(txs[0].display_value(), "2.5");
    }

    #[test]
    fn parse_txlist__api_error__surfaces_message_and_detail() {
        let body = br#"{"status":"0","message":"NOTOK","result":"Invalid API Key"}"#;

        let err = parse_txlist(body).unwrap_err();

        match err {
            ExplorerError::Api { message, detail } => {
                assert_eq!(message, "NOTOK");
                assert_eq!(detail, "Invalid API Key");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn parse_txlist__garbage__is_a_decode_error() {
        let err = parse_txlist(b"<html>").unwrap_err();
        assert!(matches!(err, ExplorerError::Decode(_)));
    }

    #[test]
    fn display_value__non_numeric__falls_back_to_raw() {
        let tx = ExplorerTransaction {
            hash: "0x1".into(),
            from: "0x2".into(),
            to: String::new(),
            value: "n/a".into(),
        };
        assert_eq!(tx.display_value(), "n/a");
    }
}

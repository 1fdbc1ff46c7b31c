use crate::{
    explorer::DEFAULT_EXPLORER_URL,
    wallets,
};
use clap::Parser;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use ethers::types::Address;
use std::{
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

pub const DEFAULT_RPC_URL: &str = "https://goerli-rollup.arbitrum.io/rpc";
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x41c3eB04fE81aE149B868F3645dA03a8b3Bed9FC";
pub const ARBITRUM_GOERLI_CHAIN_ID: u64 = 421613;
pub const DEFAULT_LOG_DIR: &str = ".logs";

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Terminal client for the fight betting contract")]
pub struct Cli {
    /// JSON-RPC endpoint of the network the contract lives on
    #[arg(long, default_value = DEFAULT_RPC_URL)]
    pub rpc_url: String,

    /// Betting contract address
    #[arg(long, default_value = DEFAULT_CONTRACT_ADDRESS)]
    pub contract: String,

    /// Chain id the client expects the RPC to report
    #[arg(long, default_value_t = ARBITRUM_GOERLI_CHAIN_ID)]
    pub chain_id: u64,

    /// Seconds between current-round reads
    #[arg(long, default_value_t = 5)]
    pub poll_secs: u64,

    /// Etherscan-compatible explorer API base URL
    #[arg(long, default_value = DEFAULT_EXPLORER_URL)]
    pub explorer_url: String,

    /// Explorer API key; transaction history is disabled without one
    #[arg(long, env = "EXPLORER_API_KEY", hide_env_values = true)]
    pub explorer_api_key: Option<String>,

    /// Keystore to sign transactions with; read-only when omitted
    #[arg(long)]
    pub wallet: Option<String>,

    /// Keystore directory (defaults to ~/.foundry/keystores)
    #[arg(long)]
    pub wallet_dir: Option<String>,

    /// Directory for the rolling log file
    #[arg(long, default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExplorerConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletConfig {
    ReadOnly,
    Keystore { name: String, dir: PathBuf },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub rpc_url: String,
    pub contract_address: Address,
    pub expected_chain_id: u64,
    pub poll_interval: Duration,
    pub explorer: Option<ExplorerConfig>,
    pub wallet: WalletConfig,
    pub log_dir: PathBuf,
}

impl AppConfig {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let contract_address = Address::from_str(cli.contract.trim())
            .map_err(|e| eyre!("Invalid contract address '{}': {e}", cli.contract))?;
        if cli.poll_secs == 0 {
            return Err(eyre!("--poll-secs must be at least 1"));
        }
        let explorer = cli
            .explorer_api_key
            .filter(|key| !key.trim().is_empty())
            .map(|api_key| ExplorerConfig {
                url: cli.explorer_url.clone(),
                api_key,
            });
        let wallet = match cli.wallet {
            Some(name) => WalletConfig::Keystore {
                name,
                dir: wallets::resolve_wallet_dir(cli.wallet_dir.as_deref())
                    .wrap_err("Failed to resolve keystore directory")?,
            },
            None => WalletConfig::ReadOnly,
        };
        Ok(Self {
            rpc_url: cli.rpc_url,
            contract_address,
            expected_chain_id: cli.chain_id,
            poll_interval: Duration::from_secs(cli.poll_secs),
            explorer,
            wallet,
            log_dir: cli.log_dir,
        })
    }

    pub fn network_name(&self) -> String {
        network_name(self.expected_chain_id)
    }
}

pub fn network_name(chain_id: u64) -> String {
    match chain_id {
        1 => String::from("Ethereum Mainnet"),
        5 => String::from("Goerli"),
        42161 => String::from("Arbitrum One"),
        421613 => String::from("Goerli Arb Testnet"),
        31337 => String::from("Local Node"),
        other => format!("chain {other}"),
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["fight-betting"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn from_cli__defaults__target_goerli_arbitrum_read_only() {
        let mut cli = parse(&[]);
        cli.explorer_api_key = None;

        let config = AppConfig::from_cli(cli).unwrap();

        assert_eq!(
            config.contract_address,
            Address::from_str(DEFAULT_CONTRACT_ADDRESS).unwrap()
        );
        assert_eq!(config.expected_chain_id, ARBITRUM_GOERLI_CHAIN_ID);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.wallet, WalletConfig::ReadOnly);
        assert_eq!(config.explorer, None);
        assert_eq!(config.network_name(), "Goerli Arb Testnet");
    }

    #[test]
    fn from_cli__wallet_and_explorer__are_resolved() {
        let cli = parse(&[
            "--wallet",
            "operator",
            "--wallet-dir",
            "/tmp/keys",
            "--explorer-api-key",
            "KEY",
            "--poll-secs",
            "2",
        ]);

        let config = AppConfig::from_cli(cli).unwrap();

        assert_eq!(
            config.wallet,
            WalletConfig::Keystore {
                name: "operator".into(),
                dir: PathBuf::from("/tmp/keys"),
            }
        );
        assert_eq!(
            config.explorer,
            Some(ExplorerConfig {
                url: DEFAULT_EXPLORER_URL.into(),
                api_key: "KEY".into(),
            })
        );
        assert_eq!(config.poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn from_cli__bad_address_or_zero_interval__is_rejected() {
        assert!(AppConfig::from_cli(parse(&["--contract", "0x1234"])).is_err());
        assert!(AppConfig::from_cli(parse(&["--poll-secs", "0"])).is_err());
    }
}

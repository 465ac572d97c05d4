use anyhow::{format_err, Result};
use configparser::ini::Ini;
use solana_sdk::pubkey::Pubkey;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::token_data::TokenListEntry;

const SECTION: &str = "Global";
const DEFAULT_SETTLE_DELAY_MS: u64 = 1_000;
const DEFAULT_CLUSTER: &str = "mainnet-beta";
const DEFAULT_TOKEN_MANAGER_PROGRAM: &str = "mgr99QFMYByTqGPWmNqunV7vBLmWWXdSrHUfV8Jf3JM";

#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    pub http_url: String,
    pub ws_url: String,
    /// Absent when running without a wallet.
    pub payer_path: Option<String>,
    pub stake_pool: Option<Pubkey>,
    pub stake_pool_program: Pubkey,
    pub reward_distributor_program: Pubkey,
    /// Owner of the receipt mints created for stake entries.
    pub token_manager_program: Pubkey,
    pub token_list_path: Option<String>,
    /// Collection size, used for the percent-staked figure. Zero when unknown.
    pub max_staked: u64,
    pub settle_delay: Duration,
    pub cluster: String,
}

fn required(config: &Ini, key: &str) -> Result<String> {
    optional(config, key).ok_or_else(|| format_err!("{} must not be empty", key))
}

fn optional(config: &Ini, key: &str) -> Option<String> {
    config
        .get(SECTION, key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_pubkey(key: &str, value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value).map_err(|_| format_err!("{} is not a valid public key: {}", key, value))
}

pub fn load_cfg(client_config: &str) -> Result<ClientConfig> {
    let mut config = Ini::new();
    config
        .load(client_config)
        .map_err(|e| format_err!("failed to load {}: {}", client_config, e))?;
    parse_cfg(&config)
}

pub fn parse_cfg(config: &Ini) -> Result<ClientConfig> {
    let http_url = required(config, "http_url")?;
    let ws_url = required(config, "ws_url")?;
    let stake_pool_program = parse_pubkey(
        "stake_pool_program",
        &required(config, "stake_pool_program")?,
    )?;
    let reward_distributor_program = parse_pubkey(
        "reward_distributor_program",
        &required(config, "reward_distributor_program")?,
    )?;
    let token_manager_program = parse_pubkey(
        "token_manager_program",
        &optional(config, "token_manager_program")
            .unwrap_or_else(|| DEFAULT_TOKEN_MANAGER_PROGRAM.to_string()),
    )?;
    let stake_pool = optional(config, "stake_pool")
        .map(|value| parse_pubkey("stake_pool", &value))
        .transpose()?;
    let max_staked = optional(config, "max_staked")
        .map(|value| value.parse::<u64>())
        .transpose()
        .map_err(|e| format_err!("max_staked: {}", e))?
        .unwrap_or(0);
    let settle_delay_ms = optional(config, "settle_delay_ms")
        .map(|value| value.parse::<u64>())
        .transpose()
        .map_err(|e| format_err!("settle_delay_ms: {}", e))?
        .unwrap_or(DEFAULT_SETTLE_DELAY_MS);

    Ok(ClientConfig {
        http_url,
        ws_url,
        payer_path: optional(config, "payer_path"),
        stake_pool,
        stake_pool_program,
        reward_distributor_program,
        token_manager_program,
        token_list_path: optional(config, "token_list_path"),
        max_staked,
        settle_delay: Duration::from_millis(settle_delay_ms),
        cluster: optional(config, "cluster").unwrap_or_else(|| DEFAULT_CLUSTER.to_string()),
    })
}

pub fn load_token_list(path: impl AsRef<Path>) -> Result<Vec<TokenListEntry>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format_err!("failed to read token list {}: {}", path.display(), e))?;
    Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "[Global]\n\
        http_url = http://127.0.0.1:8899\n\
        ws_url = ws://127.0.0.1:8900\n\
        stake_pool_program = stkBL96RZkjY5ine4TvPihGqW8UHJfch2cokjAPzV8i\n\
        reward_distributor_program = rwdNPNPS6zNvtF6FMvaxPRjzu2eC51mXaDT9rmWsojp\n";

    fn ini(text: &str) -> Ini {
        let mut config = Ini::new();
        config.read(text.to_string()).unwrap();
        config
    }

    #[test]
    fn optional_keys_default() {
        let config = parse_cfg(&ini(BASE)).unwrap();
        assert_eq!(config.payer_path, None);
        assert_eq!(config.stake_pool, None);
        assert_eq!(config.max_staked, 0);
        assert_eq!(config.settle_delay, Duration::from_millis(1_000));
        assert_eq!(config.cluster, "mainnet-beta");
        assert_eq!(
            config.token_manager_program.to_string(),
            DEFAULT_TOKEN_MANAGER_PROGRAM
        );
    }

    #[test]
    fn reads_wallet_and_pool() {
        let text = format!(
            "{}payer_path = ~/.config/solana/id.json\nstake_pool = {}\nmax_staked = 10000\nsettle_delay_ms = 0\n",
            BASE,
            Pubkey::new_unique()
        );
        let config = parse_cfg(&ini(&text)).unwrap();
        assert_eq!(config.payer_path.as_deref(), Some("~/.config/solana/id.json"));
        assert!(config.stake_pool.is_some());
        assert_eq!(config.max_staked, 10_000);
        assert!(config.settle_delay.is_zero());
    }

    #[test]
    fn missing_or_bad_keys_are_errors() {
        let err = parse_cfg(&ini("[Global]\nhttp_url = x\n")).unwrap_err();
        assert!(err.to_string().contains("ws_url"));
        let text = BASE.replace("stkBL96RZkjY5ine4TvPihGqW8UHJfch2cokjAPzV8i", "not-a-key");
        assert!(parse_cfg(&ini(&text)).is_err());
    }
}

//! Terminal rendering of pool, wallet and staked token state.

use solana_sdk::pubkey::Pubkey;

use crate::cache::Cached;
use crate::data::{PoolData, PoolDataSource};
use crate::rewards::{daily_reward_rate, RewardsView};
use crate::token_data::{allowed_tokens, short_pubkey, MintInfo, StakePoolData, TokenData};
use crate::units::{
    format_natural, percent_staked, seconds_to_duration, to_precision, BALANCE_PLACES,
    EARNINGS_PLACES, RATE_SIGNIFICANT_FIGURES,
};

const MAINNET: &str = "mainnet-beta";

/// Explorer link for an address on `cluster`.
pub fn pubkey_url(pubkey: &Pubkey, cluster: &str) -> String {
    if cluster.is_empty() || cluster == MAINNET {
        format!("https://explorer.solana.com/address/{}", pubkey)
    } else {
        format!(
            "https://explorer.solana.com/address/{}?cluster={}",
            pubkey, cluster
        )
    }
}

pub fn pool_summary<D: PoolDataSource>(data: &PoolData<D>, max_staked: u64) -> Vec<String> {
    let mut lines = Vec::new();
    if !data.stake_pool.loaded() {
        lines.push("Loading pool info...".to_string());
        return lines;
    }
    if data.pool().is_none() {
        lines.push("Stake pool not found".to_string());
        return lines;
    }

    match data.pool_entries.data() {
        Some(entries) => {
            lines.push(format!("Total Staked: {}", entries.len()));
            if let Some(percent) = percent_staked(entries.len(), max_staked) {
                lines.push(format!("Percent Staked: {}%", percent));
            }
        }
        None => lines.push("Loading pool info...".to_string()),
    }

    let reward_mint = data.reward_mint_info.data().and_then(Option::as_ref);
    if let (Some(distributor), Some(mint)) = (data.distributor(), reward_mint) {
        let rate = daily_reward_rate(distributor, mint.decimals);
        lines.push(format!(
            "Rewards Rate: {} {} / Day",
            to_precision(rate, RATE_SIGNIFICANT_FIGURES),
            mint.display_name()
        ));
        match data.rewards.data().and_then(Option::as_ref) {
            Some(rewards) => lines.push(format!(
                "Earnings: {} {}",
                format_natural(rewards.claimable_rewards, mint.decimals, EARNINGS_PLACES),
                mint.display_name()
            )),
            None => lines.push("Loading rewards...".to_string()),
        }
    }
    lines
}

fn token_line(token: &TokenData, amount: u64) -> String {
    let mint = token.mint().map(|mint| mint.to_string()).unwrap_or_default();
    if token.is_fungible() {
        let symbol = token.symbol().unwrap_or_default();
        format!(
            "{} {} {} {}",
            mint,
            token.display_name(),
            format_natural(amount, token.decimals(), BALANCE_PLACES),
            symbol
        )
        .trim_end()
        .to_string()
    } else {
        format!("{} {}", mint, token.display_name())
    }
}

pub fn wallet_tokens(
    connected: bool,
    tokens: &Cached<Vec<TokenData>>,
    pool: Option<&StakePoolData>,
    show_fungible: bool,
) -> Vec<String> {
    if !connected {
        return vec!["Connect a wallet (payer_path) to view tokens.".to_string()];
    }
    let Some(tokens) = tokens.data() else {
        return vec!["Loading tokens...".to_string()];
    };
    let allowed = allowed_tokens(pool, tokens, show_fungible);
    if allowed.is_empty() {
        return vec!["No allowed tokens found in wallet.".to_string()];
    }
    allowed
        .into_iter()
        .map(|token| token_line(token, token.source_amount()))
        .collect()
}

pub fn staked_tokens(
    connected: bool,
    tokens: &Cached<Vec<TokenData>>,
    rewards: Option<&RewardsView>,
    reward_mint: Option<&MintInfo>,
) -> Vec<String> {
    if !connected {
        return vec!["Connect a wallet (payer_path) to view staked tokens.".to_string()];
    }
    let Some(tokens) = tokens.data() else {
        return vec!["Loading staked tokens...".to_string()];
    };
    if tokens.is_empty() {
        return vec!["No tokens currently staked.".to_string()];
    }
    let mut lines = vec![format!("View Staked Tokens ({})", tokens.len())];
    for token in tokens {
        let mut line = token_line(token, token.staked_amount());
        let reward = token
            .mint()
            .and_then(|mint| rewards.and_then(|rewards| rewards.reward_map.get(&mint)));
        if let (Some(reward), Some(mint)) = (reward, reward_mint) {
            line.push_str(&format!(
                " | {} {} | next reward in {}",
                format_natural(reward.claimable, mint.decimals, EARNINGS_PLACES),
                mint.display_name(),
                seconds_to_duration(reward.next_reward_in)
            ));
        }
        if let Some(entry) = &token.stake_entry {
            line.push_str(&format!(" ({})", short_pubkey(&entry.pubkey)));
        }
        lines.push(line);
    }
    lines
}

//! View models assembled from wallet token accounts and pool accounts.

use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;

/// A wallet-held SPL token account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenAccountInfo {
    pub pubkey: Pubkey,
    pub mint: Pubkey,
    pub owner: Pubkey,
    /// Raw units.
    pub amount: u64,
    pub decimals: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Creator {
    pub address: Pubkey,
    pub verified: bool,
    pub share: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Collection {
    pub verified: bool,
    pub key: Pubkey,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NftMetadata {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub creators: Vec<Creator>,
    pub collection: Option<Collection>,
}

/// One record of a token list registry file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenListEntry {
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    #[serde(default, rename = "logoURI")]
    pub logo_uri: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakeEntryData {
    pub pubkey: Pubkey,
    pub pool: Pubkey,
    pub original_mint: Pubkey,
    /// Raw units currently staked.
    pub amount: u64,
    pub last_staker: Pubkey,
    pub last_staked_at: i64,
    pub total_stake_seconds: u128,
    pub cooldown_start_seconds: Option<i64>,
}

impl StakeEntryData {
    pub fn is_staked(&self) -> bool {
        self.last_staker != Pubkey::default()
    }
}

/// Everything the client knows about one token of interest.
///
/// Records are owned by the caches in [`crate::data`] and are replaced on every
/// refetch. Nothing the user enters is stored on them; staking amounts live in
/// [`crate::selection::Selection`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenData {
    pub token_account: Option<TokenAccountInfo>,
    pub metadata: Option<NftMetadata>,
    pub token_list_data: Option<TokenListEntry>,
    pub stake_entry: Option<StakeEntryData>,
    pub stake_authorized: bool,
    pub mint_info: Option<MintInfo>,
}

impl TokenData {
    /// The mint identity used to key selections: the token account mint for
    /// wallet tokens, the original mint for staked tokens.
    pub fn mint(&self) -> Option<Pubkey> {
        self.token_account
            .as_ref()
            .map(|account| account.mint)
            .or_else(|| self.stake_entry.as_ref().map(|entry| entry.original_mint))
    }

    pub fn source_amount(&self) -> u64 {
        self.token_account.as_ref().map_or(0, |account| account.amount)
    }

    pub fn staked_amount(&self) -> u64 {
        self.stake_entry.as_ref().map_or(0, |entry| entry.amount)
    }

    /// Precision used when converting user amounts. The token list wins over
    /// the on-chain mint because it is what the user sees.
    pub fn decimals(&self) -> u8 {
        self.token_list_data
            .as_ref()
            .map(|entry| entry.decimals)
            .or_else(|| self.mint_info.as_ref().map(|info| info.decimals))
            .or_else(|| self.token_account.as_ref().map(|account| account.decimals))
            .unwrap_or(0)
    }

    /// Decided by the mint alone, never by how much of it this wallet holds.
    pub fn is_fungible(&self) -> bool {
        self.mint_info.as_ref().map_or(false, MintInfo::is_fungible)
    }

    pub fn display_name(&self) -> String {
        if let Some(entry) = &self.token_list_data {
            return entry.name.clone();
        }
        if let Some(metadata) = &self.metadata {
            if !metadata.name.is_empty() {
                return metadata.name.clone();
            }
        }
        self.mint().map(|mint| short_pubkey(&mint)).unwrap_or_default()
    }

    pub fn symbol(&self) -> Option<&str> {
        self.token_list_data
            .as_ref()
            .map(|entry| entry.symbol.as_str())
            .or_else(|| self.metadata.as_ref().map(|metadata| metadata.symbol.as_str()))
            .filter(|symbol| !symbol.is_empty())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RewardDistributorKind {
    Mint,
    Treasury,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakePoolData {
    pub pubkey: Pubkey,
    pub identifier: u64,
    pub authority: Pubkey,
    pub requires_creators: Vec<Pubkey>,
    pub requires_collections: Vec<Pubkey>,
    pub requires_authorization: bool,
    pub overlay_text: String,
    pub image_uri: String,
    pub reset_on_stake: bool,
    pub total_staked: u32,
    pub cooldown_seconds: Option<u32>,
    pub min_stake_seconds: Option<u32>,
    pub end_date: Option<i64>,
}

impl StakePoolData {
    pub fn is_gated(&self) -> bool {
        !self.requires_creators.is_empty()
            || !self.requires_collections.is_empty()
            || self.requires_authorization
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewardDistributorData {
    pub pubkey: Pubkey,
    pub stake_pool: Pubkey,
    pub kind: RewardDistributorKind,
    pub authority: Pubkey,
    pub reward_mint: Pubkey,
    /// Raw reward units paid per `reward_duration_seconds` of staking.
    pub reward_amount: u64,
    pub reward_duration_seconds: u128,
    pub rewards_issued: u128,
    pub max_supply: Option<u64>,
    pub default_multiplier: u64,
    pub multiplier_decimals: u8,
    pub max_reward_seconds_received: Option<u128>,
}

impl RewardDistributorData {
    /// The multiplier as a plain factor, e.g. 150 with two decimals is 1.5.
    pub fn multiplier_factor(&self, multiplier: u64) -> f64 {
        multiplier as f64 / 10f64.powi(self.multiplier_decimals as i32)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewardEntryData {
    pub pubkey: Pubkey,
    pub stake_entry: Pubkey,
    pub reward_distributor: Pubkey,
    pub reward_seconds_received: u128,
    pub multiplier: u64,
}

/// Fungible mints get one stake entry per staker; the rest share one entry.
pub fn is_fungible_mint(supply: u64, decimals: u8) -> bool {
    supply > 1 || decimals > 0
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintInfo {
    pub mint: Pubkey,
    pub decimals: u8,
    pub supply: u64,
    pub token_list_data: Option<TokenListEntry>,
}

impl MintInfo {
    pub fn is_fungible(&self) -> bool {
        is_fungible_mint(self.supply, self.decimals)
    }

    pub fn display_name(&self) -> &str {
        self.token_list_data
            .as_ref()
            .map(|entry| entry.name.as_str())
            .unwrap_or("???")
    }
}

pub fn short_pubkey(pubkey: &Pubkey) -> String {
    let text = pubkey.to_string();
    if text.len() <= 8 {
        return text;
    }
    format!("{}..{}", &text[..4], &text[text.len() - 4..])
}

/// Wallet tokens that may be staked into `pool`, restricted to either the
/// fungible or the non-fungible view.
pub fn allowed_tokens<'a>(
    pool: Option<&StakePoolData>,
    tokens: &'a [TokenData],
    show_fungible: bool,
) -> Vec<&'a TokenData> {
    tokens
        .iter()
        .filter(|token| token.source_amount() > 0)
        .filter(|token| token.is_fungible() == show_fungible)
        .filter(|token| pool.map_or(true, |pool| is_allowed(pool, token)))
        .collect()
}

fn is_allowed(pool: &StakePoolData, token: &TokenData) -> bool {
    if !pool.is_gated() {
        return true;
    }
    if pool.requires_authorization && token.stake_authorized {
        return true;
    }
    let Some(metadata) = &token.metadata else {
        return false;
    };
    let creator_match = metadata
        .creators
        .iter()
        .any(|creator| creator.verified && pool.requires_creators.contains(&creator.address));
    let collection_match = metadata.collection.as_ref().map_or(false, |collection| {
        collection.verified && pool.requires_collections.contains(&collection.key)
    });
    creator_match || collection_match
}

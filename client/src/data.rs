//! Reads pool, wallet and reward state, and keeps it in per-session caches.

use anchor_lang::AccountDeserialize;
use anyhow::Result;
use serde::Deserialize;
use solana_account_decoder::{UiAccountData, UiAccountEncoding, UiDataSliceConfig};
use solana_client::{
    rpc_client::RpcClient,
    rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig},
    rpc_filter::{Memcmp, RpcFilterType},
    rpc_request::TokenAccountsFilter,
    rpc_response::RpcKeyedAccount,
};
use solana_sdk::{account::Account, program_pack::Pack, pubkey::Pubkey};
use spl_associated_token_account::get_associated_token_address;
use std::collections::HashMap;
use std::rc::Rc;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cache::{CacheKind, CacheRefresher, Cached};
use crate::instructions::accounts::{
    decode_metadata, RewardDistributor, RewardEntry, StakeAuthorizationRecord, StakeEntry,
    StakePool, STAKE_ENTRY_DISCRIMINATOR, STAKE_ENTRY_LAST_STAKER_OFFSET,
    STAKE_ENTRY_POOL_OFFSET,
};
use crate::instructions::rpc::get_token_balance;
use crate::instructions::utils::{
    deserialize_anchor_account, fetch_anchor_account, get_metadata_address,
    get_mint_stake_entry_address, get_reward_distributor_address, get_reward_entry_address,
    get_stake_authorization_address,
};
use crate::rewards::{compute_rewards, RewardsView};
use crate::token_data::{
    MintInfo, NftMetadata, RewardDistributorData, RewardDistributorKind, RewardEntryData,
    StakeEntryData, StakePoolData, TokenAccountInfo, TokenData, TokenListEntry,
};

const MAX_MULTIPLE_ACCOUNTS: usize = 100;

/// Read access to everything the views and handlers need.
pub trait PoolDataSource {
    fn stake_pool(&self, stake_pool: &Pubkey) -> Result<Option<StakePoolData>>;

    /// Non-empty token accounts of `owner`, joined with their stake entry in
    /// `stake_pool` when one exists.
    fn wallet_tokens(
        &self,
        owner: &Pubkey,
        stake_pool: Option<&StakePoolData>,
    ) -> Result<Vec<TokenData>>;

    /// Entries in `stake_pool` last staked by `owner`.
    fn staked_tokens(&self, owner: &Pubkey, stake_pool: &Pubkey) -> Result<Vec<TokenData>>;

    fn pool_entries(&self, stake_pool: &Pubkey) -> Result<Vec<Pubkey>>;

    fn reward_distributor(&self, stake_pool: &Pubkey) -> Result<Option<RewardDistributorData>>;

    fn mint_info(&self, mint: &Pubkey) -> Result<MintInfo>;

    fn stake_entry_for_mint(
        &self,
        stake_pool: &Pubkey,
        mint: &Pubkey,
        staker: &Pubkey,
    ) -> Result<Option<StakeEntryData>>;

    fn reward_entries(
        &self,
        reward_distributor: &Pubkey,
        stake_entries: &[Pubkey],
    ) -> Result<Vec<Option<RewardEntryData>>>;

    /// Reward tokens held by the distributor.
    fn treasury_balance(&self, reward_distributor: &RewardDistributorData) -> Result<u64>;

    fn unix_timestamp(&self) -> Result<i64>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParsedTokenAmount {
    amount: String,
    decimals: u8,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParsedTokenAccount {
    mint: String,
    owner: String,
    token_amount: ParsedTokenAmount,
}

fn parse_token_account(keyed: &RpcKeyedAccount) -> Result<Option<TokenAccountInfo>> {
    let UiAccountData::Json(parsed) = &keyed.account.data else {
        return Ok(None);
    };
    let Some(info) = parsed.parsed.get("info") else {
        return Ok(None);
    };
    let info: ParsedTokenAccount = serde_json::from_value(info.clone())?;
    Ok(Some(TokenAccountInfo {
        pubkey: Pubkey::from_str(&keyed.pubkey)?,
        mint: Pubkey::from_str(&info.mint)?,
        owner: Pubkey::from_str(&info.owner)?,
        amount: info.token_amount.amount.parse()?,
        decimals: info.token_amount.decimals,
    }))
}

pub struct RpcDataSource {
    rpc_client: Rc<RpcClient>,
    stake_pool_program: Pubkey,
    reward_distributor_program: Pubkey,
    token_list: HashMap<Pubkey, TokenListEntry>,
}

impl RpcDataSource {
    pub fn new(
        rpc_client: Rc<RpcClient>,
        stake_pool_program: Pubkey,
        reward_distributor_program: Pubkey,
        token_list: Vec<TokenListEntry>,
    ) -> Self {
        let token_list = token_list
            .into_iter()
            .filter_map(|entry| Pubkey::from_str(&entry.address).ok().map(|mint| (mint, entry)))
            .collect();
        Self {
            rpc_client,
            stake_pool_program,
            reward_distributor_program,
            token_list,
        }
    }

    fn get_multiple_accounts(&self, addresses: &[Pubkey]) -> Result<Vec<Option<Account>>> {
        let mut accounts = Vec::with_capacity(addresses.len());
        for chunk in addresses.chunks(MAX_MULTIPLE_ACCOUNTS) {
            accounts.extend(self.rpc_client.get_multiple_accounts(chunk)?);
        }
        Ok(accounts)
    }

    fn stake_entry_accounts(&self, filters: Vec<RpcFilterType>, with_data: bool) -> Result<Vec<(Pubkey, Account)>> {
        let mut all_filters = vec![RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
            0,
            &STAKE_ENTRY_DISCRIMINATOR,
        ))];
        all_filters.extend(filters);
        let config = RpcProgramAccountsConfig {
            filters: Some(all_filters),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                data_slice: (!with_data).then_some(UiDataSliceConfig {
                    offset: 0,
                    length: 0,
                }),
                ..RpcAccountInfoConfig::default()
            },
            ..RpcProgramAccountsConfig::default()
        };
        Ok(self
            .rpc_client
            .get_program_accounts_with_config(&self.stake_pool_program, config)?)
    }

    /// Mint state for each of `mints`, `None` where the account is missing or
    /// is not a mint.
    fn mint_infos(&self, mints: &[Pubkey]) -> Result<Vec<Option<MintInfo>>> {
        let accounts = self.get_multiple_accounts(mints)?;
        Ok(mints
            .iter()
            .zip(accounts)
            .map(|(mint, account)| {
                let state = spl_token::state::Mint::unpack(&account?.data).ok()?;
                Some(MintInfo {
                    mint: *mint,
                    decimals: state.decimals,
                    supply: state.supply,
                    token_list_data: self.token_list.get(mint).cloned(),
                })
            })
            .collect())
    }

    fn metadata_from_account(account: Option<&Account>) -> Option<NftMetadata> {
        let account = account?;
        match decode_metadata(&account.data) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                println!("skipping undecodable metadata: {:#}", e);
                None
            }
        }
    }

    fn decode_stake_entry(address: Pubkey, account: Option<&Account>) -> Option<StakeEntryData> {
        let account = account?;
        deserialize_anchor_account::<StakeEntry>(account)
            .ok()
            .map(|entry| entry.into_data(address))
    }
}

impl PoolDataSource for RpcDataSource {
    fn stake_pool(&self, stake_pool: &Pubkey) -> Result<Option<StakePoolData>> {
        Ok(fetch_anchor_account::<StakePool>(&self.rpc_client, stake_pool)?
            .map(|pool| pool.into_data(*stake_pool)))
    }

    fn wallet_tokens(
        &self,
        owner: &Pubkey,
        stake_pool: Option<&StakePoolData>,
    ) -> Result<Vec<TokenData>> {
        let keyed_accounts = self
            .rpc_client
            .get_token_accounts_by_owner(owner, TokenAccountsFilter::ProgramId(spl_token::id()))?;
        let mut tokens = Vec::new();
        for keyed in &keyed_accounts {
            let Some(account) = parse_token_account(keyed)? else {
                continue;
            };
            if account.amount == 0 {
                continue;
            }
            tokens.push(TokenData {
                token_list_data: self.token_list.get(&account.mint).cloned(),
                token_account: Some(account),
                ..TokenData::default()
            });
        }

        let mint_ids: Vec<Pubkey> = tokens.iter().filter_map(TokenData::mint).collect();
        let mint_infos = self.mint_infos(&mint_ids)?;
        let mut tokens: Vec<TokenData> = tokens
            .into_iter()
            .zip(mint_infos)
            .filter_map(|(mut token, info)| {
                if info.is_none() {
                    println!("skipping token account with unreadable mint: {:?}", token.mint());
                }
                token.mint_info = Some(info?);
                Some(token)
            })
            .collect();
        let mints: Vec<MintInfo> = tokens.iter().filter_map(|token| token.mint_info.clone()).collect();

        let metadata_addresses: Vec<Pubkey> =
            mints.iter().map(|info| get_metadata_address(&info.mint)).collect();
        let metadata_accounts = self.get_multiple_accounts(&metadata_addresses)?;
        for (token, account) in tokens.iter_mut().zip(&metadata_accounts) {
            token.metadata = Self::metadata_from_account(account.as_ref());
        }

        let Some(pool) = stake_pool else {
            return Ok(tokens);
        };
        let entry_addresses: Vec<Pubkey> = mints
            .iter()
            .map(|info| {
                get_mint_stake_entry_address(&self.stake_pool_program, &pool.pubkey, info, owner)
            })
            .collect();
        let entry_accounts = self.get_multiple_accounts(&entry_addresses)?;
        for ((token, address), account) in tokens.iter_mut().zip(&entry_addresses).zip(&entry_accounts) {
            token.stake_entry = Self::decode_stake_entry(*address, account.as_ref());
        }

        if pool.requires_authorization {
            let record_addresses: Vec<Pubkey> = mints
                .iter()
                .map(|info| {
                    get_stake_authorization_address(&self.stake_pool_program, &pool.pubkey, &info.mint)
                })
                .collect();
            let records = self.get_multiple_accounts(&record_addresses)?;
            for (token, record) in tokens.iter_mut().zip(&records) {
                token.stake_authorized = record.as_ref().map_or(false, |account| {
                    deserialize_anchor_account::<StakeAuthorizationRecord>(account).is_ok()
                });
            }
        }
        Ok(tokens)
    }

    fn staked_tokens(&self, owner: &Pubkey, stake_pool: &Pubkey) -> Result<Vec<TokenData>> {
        let accounts = self.stake_entry_accounts(
            vec![
                RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
                    STAKE_ENTRY_POOL_OFFSET,
                    stake_pool.as_ref(),
                )),
                RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
                    STAKE_ENTRY_LAST_STAKER_OFFSET,
                    owner.as_ref(),
                )),
            ],
            true,
        )?;
        let mut tokens: Vec<TokenData> = accounts
            .iter()
            .filter_map(|(address, account)| Self::decode_stake_entry(*address, Some(account)))
            .map(|entry| TokenData {
                token_list_data: self.token_list.get(&entry.original_mint).cloned(),
                stake_entry: Some(entry),
                ..TokenData::default()
            })
            .collect();

        let mints: Vec<Pubkey> = tokens.iter().filter_map(TokenData::mint).collect();
        let metadata_addresses: Vec<Pubkey> = mints.iter().map(get_metadata_address).collect();
        let metadata_accounts = self.get_multiple_accounts(&metadata_addresses)?;
        let mint_infos = self.mint_infos(&mints)?;
        for ((token, account), info) in tokens.iter_mut().zip(&metadata_accounts).zip(mint_infos) {
            token.metadata = Self::metadata_from_account(account.as_ref());
            token.mint_info = info;
        }
        Ok(tokens)
    }

    fn pool_entries(&self, stake_pool: &Pubkey) -> Result<Vec<Pubkey>> {
        let accounts = self.stake_entry_accounts(
            vec![RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
                STAKE_ENTRY_POOL_OFFSET,
                stake_pool.as_ref(),
            ))],
            false,
        )?;
        Ok(accounts.into_iter().map(|(address, _)| address).collect())
    }

    fn reward_distributor(&self, stake_pool: &Pubkey) -> Result<Option<RewardDistributorData>> {
        let address = get_reward_distributor_address(&self.reward_distributor_program, stake_pool);
        Ok(fetch_anchor_account::<RewardDistributor>(&self.rpc_client, &address)?
            .map(|distributor| distributor.into_data(address)))
    }

    fn mint_info(&self, mint: &Pubkey) -> Result<MintInfo> {
        let account = self.rpc_client.get_account(mint)?;
        let state = spl_token::state::Mint::unpack(&account.data)?;
        Ok(MintInfo {
            mint: *mint,
            decimals: state.decimals,
            supply: state.supply,
            token_list_data: self.token_list.get(mint).cloned(),
        })
    }

    fn stake_entry_for_mint(
        &self,
        stake_pool: &Pubkey,
        mint: &Pubkey,
        staker: &Pubkey,
    ) -> Result<Option<StakeEntryData>> {
        let info = self.mint_info(mint)?;
        let address =
            get_mint_stake_entry_address(&self.stake_pool_program, stake_pool, &info, staker);
        Ok(fetch_anchor_account::<StakeEntry>(&self.rpc_client, &address)?
            .map(|entry| entry.into_data(address)))
    }

    fn reward_entries(
        &self,
        reward_distributor: &Pubkey,
        stake_entries: &[Pubkey],
    ) -> Result<Vec<Option<RewardEntryData>>> {
        let addresses: Vec<Pubkey> = stake_entries
            .iter()
            .map(|entry| {
                get_reward_entry_address(&self.reward_distributor_program, reward_distributor, entry)
            })
            .collect();
        let accounts = self.get_multiple_accounts(&addresses)?;
        Ok(addresses
            .into_iter()
            .zip(accounts)
            .map(|(address, account)| {
                let account = account?;
                let mut data: &[u8] = &account.data;
                RewardEntry::try_deserialize(&mut data)
                    .ok()
                    .map(|entry| entry.into_data(address))
            })
            .collect())
    }

    fn treasury_balance(&self, reward_distributor: &RewardDistributorData) -> Result<u64> {
        get_token_balance(
            &self.rpc_client,
            &get_associated_token_address(&reward_distributor.pubkey, &reward_distributor.reward_mint),
        )
    }

    fn unix_timestamp(&self) -> Result<i64> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?;
        Ok(now.as_secs() as i64)
    }
}

/// The caches behind one session: everything derived from one wallet and one
/// pool.
pub struct PoolData<D> {
    source: D,
    wallet: Option<Pubkey>,
    stake_pool_id: Pubkey,
    pub stake_pool: Cached<Option<StakePoolData>>,
    pub wallet_tokens: Cached<Vec<TokenData>>,
    pub staked_tokens: Cached<Vec<TokenData>>,
    pub pool_entries: Cached<Vec<Pubkey>>,
    pub reward_distributor: Cached<Option<RewardDistributorData>>,
    pub reward_mint_info: Cached<Option<MintInfo>>,
    pub rewards: Cached<Option<RewardsView>>,
}

impl<D: PoolDataSource> PoolData<D> {
    pub fn new(source: D, wallet: Option<Pubkey>, stake_pool_id: Pubkey) -> Self {
        Self {
            source,
            wallet,
            stake_pool_id,
            stake_pool: Cached::default(),
            wallet_tokens: Cached::default(),
            staked_tokens: Cached::default(),
            pool_entries: Cached::default(),
            reward_distributor: Cached::default(),
            reward_mint_info: Cached::default(),
            rewards: Cached::default(),
        }
    }

    pub fn source(&self) -> &D {
        &self.source
    }

    /// The pool, once loaded and found.
    pub fn pool(&self) -> Option<&StakePoolData> {
        self.stake_pool.data().and_then(Option::as_ref)
    }

    pub fn distributor(&self) -> Option<&RewardDistributorData> {
        self.reward_distributor.data().and_then(Option::as_ref)
    }

    pub fn refresh_stake_pool(&mut self, force: bool) -> Result<()> {
        let (source, id) = (&self.source, self.stake_pool_id);
        self.stake_pool.refresh(force, || source.stake_pool(&id))
    }

    pub fn refresh_wallet_tokens(&mut self, force: bool) -> Result<()> {
        let pool = self.stake_pool.data().cloned().flatten();
        let (source, wallet) = (&self.source, self.wallet);
        self.wallet_tokens.refresh(force, || match wallet {
            Some(owner) => source.wallet_tokens(&owner, pool.as_ref()),
            None => Ok(Vec::new()),
        })
    }

    pub fn refresh_staked_tokens(&mut self, force: bool) -> Result<()> {
        let (source, wallet, id) = (&self.source, self.wallet, self.stake_pool_id);
        self.staked_tokens.refresh(force, || match wallet {
            Some(owner) => source.staked_tokens(&owner, &id),
            None => Ok(Vec::new()),
        })
    }

    pub fn refresh_pool_entries(&mut self, force: bool) -> Result<()> {
        let (source, id) = (&self.source, self.stake_pool_id);
        self.pool_entries.refresh(force, || source.pool_entries(&id))
    }

    pub fn refresh_reward_distributor(&mut self, force: bool) -> Result<()> {
        let (source, id) = (&self.source, self.stake_pool_id);
        self.reward_distributor
            .refresh(force, || source.reward_distributor(&id))?;
        let reward_mint = self.distributor().map(|distributor| distributor.reward_mint);
        let source = &self.source;
        self.reward_mint_info.refresh(force, || {
            reward_mint.map(|mint| source.mint_info(&mint)).transpose()
        })
    }

    fn fetch_rewards(&self) -> Result<Option<RewardsView>> {
        let Some(distributor) = self.distributor() else {
            return Ok(None);
        };
        let stake_entries: Vec<StakeEntryData> = self
            .staked_tokens
            .data()
            .map(|tokens| tokens.iter().filter_map(|token| token.stake_entry.clone()).collect())
            .unwrap_or_default();
        let keys: Vec<Pubkey> = stake_entries.iter().map(|entry| entry.pubkey).collect();
        let reward_entries = self.source.reward_entries(&distributor.pubkey, &keys)?;
        let remaining = match distributor.kind {
            RewardDistributorKind::Treasury => {
                Some(self.source.treasury_balance(distributor)? as u128)
            }
            RewardDistributorKind::Mint => distributor
                .max_supply
                .map(|max| (max as u128).saturating_sub(distributor.rewards_issued)),
        };
        let now = self.source.unix_timestamp()?;
        let pairs: Vec<_> = stake_entries.into_iter().zip(reward_entries).collect();
        Ok(Some(compute_rewards(distributor, &pairs, now, remaining)))
    }

    pub fn refresh_rewards(&mut self, force: bool) -> Result<()> {
        let result = self.fetch_rewards();
        self.rewards.refresh(force, move || result)
    }

    /// Initial load of every cache. Failures are printed; whatever loaded is
    /// still rendered.
    pub fn load_all(&mut self) {
        let steps: [(&str, fn(&mut Self, bool) -> Result<()>); 6] = [
            ("stake pool", Self::refresh_stake_pool),
            ("wallet tokens", Self::refresh_wallet_tokens),
            ("staked tokens", Self::refresh_staked_tokens),
            ("pool entries", Self::refresh_pool_entries),
            ("reward distributor", Self::refresh_reward_distributor),
            ("rewards", Self::refresh_rewards),
        ];
        for (name, step) in steps {
            if let Err(e) = step(self, false) {
                println!("failed to load {}: {:#}", name, e);
            }
        }
    }
}

impl<D: PoolDataSource> CacheRefresher for PoolData<D> {
    fn refresh(&mut self, kind: CacheKind, force: bool) -> Result<()> {
        match kind {
            CacheKind::WalletTokens => self.refresh_wallet_tokens(force),
            CacheKind::StakedTokens => self.refresh_staked_tokens(force),
            CacheKind::PoolEntries => self.refresh_pool_entries(force),
            CacheKind::Rewards => self.refresh_rewards(force),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::token_data::tests::{pool, staked_token, wallet_token};
    use std::cell::Cell;

    /// In-memory data source with a fixed clock.
    #[derive(Default)]
    pub struct StaticSource {
        pub pool: Option<StakePoolData>,
        pub wallet: Vec<TokenData>,
        pub staked: Vec<TokenData>,
        pub distributor: Option<RewardDistributorData>,
        pub reward_entries: Vec<RewardEntryData>,
        pub treasury: u64,
        pub now: i64,
        pub wallet_reads: Cell<usize>,
        pub fail_reward_entries: bool,
    }

    impl PoolDataSource for StaticSource {
        fn stake_pool(&self, _stake_pool: &Pubkey) -> Result<Option<StakePoolData>> {
            Ok(self.pool.clone())
        }

        fn wallet_tokens(&self, _owner: &Pubkey, _pool: Option<&StakePoolData>) -> Result<Vec<TokenData>> {
            self.wallet_reads.set(self.wallet_reads.get() + 1);
            Ok(self.wallet.clone())
        }

        fn staked_tokens(&self, _owner: &Pubkey, _stake_pool: &Pubkey) -> Result<Vec<TokenData>> {
            Ok(self.staked.clone())
        }

        fn pool_entries(&self, _stake_pool: &Pubkey) -> Result<Vec<Pubkey>> {
            Ok(self
                .staked
                .iter()
                .filter_map(|token| token.stake_entry.as_ref().map(|entry| entry.pubkey))
                .collect())
        }

        fn reward_distributor(&self, _stake_pool: &Pubkey) -> Result<Option<RewardDistributorData>> {
            Ok(self.distributor.clone())
        }

        fn mint_info(&self, mint: &Pubkey) -> Result<MintInfo> {
            Ok(MintInfo {
                mint: *mint,
                decimals: 6,
                supply: 1_000_000_000,
                token_list_data: None,
            })
        }

        fn stake_entry_for_mint(
            &self,
            _stake_pool: &Pubkey,
            mint: &Pubkey,
            _staker: &Pubkey,
        ) -> Result<Option<StakeEntryData>> {
            Ok(self
                .staked
                .iter()
                .filter_map(|token| token.stake_entry.clone())
                .find(|entry| &entry.original_mint == mint))
        }

        fn reward_entries(
            &self,
            _reward_distributor: &Pubkey,
            stake_entries: &[Pubkey],
        ) -> Result<Vec<Option<RewardEntryData>>> {
            if self.fail_reward_entries {
                return Err(anyhow::format_err!("connection reset"));
            }
            Ok(stake_entries
                .iter()
                .map(|stake_entry| {
                    self.reward_entries
                        .iter()
                        .find(|entry| &entry.stake_entry == stake_entry)
                        .cloned()
                })
                .collect())
        }

        fn treasury_balance(&self, _reward_distributor: &RewardDistributorData) -> Result<u64> {
            Ok(self.treasury)
        }

        fn unix_timestamp(&self) -> Result<i64> {
            Ok(self.now)
        }
    }

    pub fn distributor(kind: RewardDistributorKind) -> RewardDistributorData {
        RewardDistributorData {
            pubkey: Pubkey::new_unique(),
            stake_pool: Pubkey::new_unique(),
            kind,
            authority: Pubkey::new_unique(),
            reward_mint: Pubkey::new_unique(),
            reward_amount: 1_000_000,
            reward_duration_seconds: 86_400,
            rewards_issued: 0,
            max_supply: None,
            default_multiplier: 100,
            multiplier_decimals: 2,
            max_reward_seconds_received: None,
        }
    }

    #[test]
    fn disconnected_wallet_loads_empty_lists() {
        let source = StaticSource {
            pool: Some(pool()),
            wallet: vec![wallet_token(Pubkey::new_unique(), 1, 0)],
            ..StaticSource::default()
        };
        let mut data = PoolData::new(source, None, Pubkey::new_unique());
        data.load_all();
        assert!(data.pool().is_some());
        assert_eq!(data.wallet_tokens.data().map(Vec::len), Some(0));
        assert_eq!(data.source().wallet_reads.get(), 0);
        assert_eq!(data.rewards.data(), Some(&None));
    }

    #[test]
    fn treasury_rewards_are_capped_by_balance() {
        let mut staked = staked_token(Pubkey::new_unique(), 1);
        if let Some(entry) = staked.stake_entry.as_mut() {
            entry.last_staked_at = 0;
        }
        let source = StaticSource {
            pool: Some(pool()),
            staked: vec![staked],
            distributor: Some(distributor(RewardDistributorKind::Treasury)),
            treasury: 1_500_000,
            now: 86_400 * 3,
            ..StaticSource::default()
        };
        let mut data = PoolData::new(source, Some(Pubkey::new_unique()), Pubkey::new_unique());
        data.load_all();
        let rewards = data.rewards.data().cloned().flatten().unwrap();
        assert_eq!(rewards.claimable_rewards, 1_500_000);
        assert_eq!(data.reward_mint_info.data().cloned().flatten().unwrap().decimals, 6);
        assert_eq!(data.pool_entries.data().map(Vec::len), Some(1));
    }

    #[test]
    fn refresher_dispatches_by_kind() {
        let source = StaticSource {
            pool: Some(pool()),
            ..StaticSource::default()
        };
        let mut data = PoolData::new(source, Some(Pubkey::new_unique()), Pubkey::new_unique());
        CacheRefresher::refresh(&mut data, CacheKind::WalletTokens, true).unwrap();
        CacheRefresher::refresh(&mut data, CacheKind::WalletTokens, false).unwrap();
        assert_eq!(data.source().wallet_reads.get(), 2);
        assert_eq!(data.wallet_tokens.fetches(), 2);
    }

    #[test]
    fn parses_json_token_accounts() {
        use solana_account_decoder::{parse_account_data::ParsedAccount, UiAccount};

        let mint = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let keyed = RpcKeyedAccount {
            pubkey: Pubkey::new_unique().to_string(),
            account: UiAccount {
                lamports: 2_039_280,
                data: UiAccountData::Json(ParsedAccount {
                    program: "spl-token".to_string(),
                    parsed: serde_json::json!({
                        "type": "account",
                        "info": {
                            "mint": mint.to_string(),
                            "owner": owner.to_string(),
                            "state": "initialized",
                            "tokenAmount": {
                                "amount": "2500",
                                "decimals": 2,
                                "uiAmount": 25.0,
                                "uiAmountString": "25"
                            }
                        }
                    }),
                    space: 165,
                }),
                owner: spl_token::id().to_string(),
                executable: false,
                rent_epoch: 0,
                space: Some(165),
            },
        };
        let account = parse_token_account(&keyed).unwrap().unwrap();
        assert_eq!(account.mint, mint);
        assert_eq!(account.owner, owner);
        assert_eq!(account.amount, 2_500);
        assert_eq!(account.decimals, 2);
    }
}

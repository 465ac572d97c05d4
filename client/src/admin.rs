//! Pool operator actions. Each one submits a single transaction and reports
//! its own outcome.

use anyhow::{format_err, Result};
use chrono::DateTime;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::str::FromStr;

use crate::batch::WalletSession;
use crate::data::PoolDataSource;
use crate::instructions::stake_pool_instructions::{UpdatePoolIx, UpdateRewardDistributorIx};
use crate::notify::{Notification, Notifier};
use crate::sdk::PreparedTransaction;
use crate::token_data::{MintInfo, RewardDistributorData, RewardDistributorKind, StakePoolData};
use crate::units::{format_natural, natural_from_decimal, try_parse_input};
use crate::view::pubkey_url;

const NONE: &str = "[None]";

/// Fields left unset keep the pool's and distributor's current values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolUpdate {
    pub overlay_text: Option<String>,
    pub image_uri: Option<String>,
    pub requires_collections: Option<Vec<Pubkey>>,
    pub requires_creators: Option<Vec<Pubkey>>,
    pub requires_authorization: Option<bool>,
    pub authority: Option<Pubkey>,
    pub reset_on_stake: Option<bool>,
    pub cooldown_seconds: Option<u32>,
    pub min_stake_seconds: Option<u32>,
    pub end_date: Option<i64>,
    /// Decimal units of the reward mint.
    pub reward_amount: Option<String>,
    pub reward_duration_seconds: Option<u128>,
    pub default_multiplier: Option<u64>,
    pub multiplier_decimals: Option<u8>,
    pub max_reward_seconds_received: Option<u128>,
}

impl PoolUpdate {
    fn touches_distributor(&self) -> bool {
        self.reward_amount.is_some()
            || self.reward_duration_seconds.is_some()
            || self.default_multiplier.is_some()
            || self.multiplier_decimals.is_some()
            || self.max_reward_seconds_received.is_some()
    }

    fn pool_ix(&self, pool: &StakePoolData) -> UpdatePoolIx {
        UpdatePoolIx {
            requires_collections: self
                .requires_collections
                .clone()
                .unwrap_or_else(|| pool.requires_collections.clone()),
            requires_creators: self
                .requires_creators
                .clone()
                .unwrap_or_else(|| pool.requires_creators.clone()),
            requires_authorization: self
                .requires_authorization
                .unwrap_or(pool.requires_authorization),
            overlay_text: self
                .overlay_text
                .clone()
                .unwrap_or_else(|| pool.overlay_text.clone()),
            image_uri: self
                .image_uri
                .clone()
                .unwrap_or_else(|| pool.image_uri.clone()),
            authority: self.authority.unwrap_or(pool.authority),
            reset_on_stake: self.reset_on_stake.unwrap_or(pool.reset_on_stake),
            cooldown_seconds: self.cooldown_seconds.or(pool.cooldown_seconds),
            min_stake_seconds: self.min_stake_seconds.or(pool.min_stake_seconds),
            end_date: self.end_date.or(pool.end_date),
        }
    }

    fn distributor_ix(
        &self,
        distributor: &RewardDistributorData,
        reward_mint_decimals: u8,
    ) -> Result<UpdateRewardDistributorIx> {
        let reward_amount = match &self.reward_amount {
            Some(input) => natural_from_decimal(input, reward_mint_decimals)
                .map_err(|e| format_err!("Invalid reward amount: {}", e))?,
            None => distributor.reward_amount,
        };
        Ok(UpdateRewardDistributorIx {
            default_multiplier: self
                .default_multiplier
                .unwrap_or(distributor.default_multiplier),
            multiplier_decimals: self
                .multiplier_decimals
                .unwrap_or(distributor.multiplier_decimals),
            reward_amount,
            reward_duration_seconds: self
                .reward_duration_seconds
                .unwrap_or(distributor.reward_duration_seconds),
            max_reward_seconds_received: self
                .max_reward_seconds_received
                .or(distributor.max_reward_seconds_received),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReclaimAmount {
    /// Everything the distributor holds.
    Max,
    /// Decimal units of the reward mint.
    Amount(String),
}

impl FromStr for ReclaimAmount {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("max") {
            return Ok(ReclaimAmount::Max);
        }
        if s.is_empty() {
            return Err(format_err!("Invalid reclaim funds amount"));
        }
        Ok(ReclaimAmount::Amount(s.to_string()))
    }
}

/// Parses a comma separated list of mints. Every entry must be a valid public
/// key; blanks are skipped.
pub fn parse_mint_list(input: &str) -> Result<Vec<Pubkey>> {
    let mints = input
        .split(',')
        .map(str::trim)
        .filter(|mint| !mint.is_empty())
        .map(|mint| Pubkey::from_str(mint).map_err(|_| format_err!("Invalid mint: {}", mint)))
        .collect::<Result<Vec<_>>>()?;
    if mints.is_empty() {
        return Err(format_err!("No mints given"));
    }
    Ok(mints)
}

/// Parses `MINT=MULTIPLIER` pairs. The multiplier is the raw integer, scaled
/// by the distributor's multiplier decimals.
pub fn parse_multiplier(pair: &str) -> Result<(Pubkey, u64)> {
    let (mint, multiplier) = pair
        .split_once('=')
        .ok_or_else(|| format_err!("Expected MINT=MULTIPLIER, got {}", pair))?;
    let mint = Pubkey::from_str(mint.trim()).map_err(|_| format_err!("Invalid mint: {}", mint))?;
    let multiplier = multiplier
        .trim()
        .parse::<u64>()
        .map_err(|_| format_err!("Invalid multiplier for {}: {}", mint, multiplier))?;
    Ok((mint, multiplier))
}

/// The admin page over one pool.
pub struct Admin<'a> {
    session: Option<WalletSession<'a>>,
    stake_pool: Option<StakePoolData>,
    reward_distributor: Option<RewardDistributorData>,
    reward_mint: Option<MintInfo>,
    source: &'a dyn PoolDataSource,
    notifier: &'a mut dyn Notifier,
}

impl<'a> Admin<'a> {
    pub fn new(
        session: Option<WalletSession<'a>>,
        stake_pool: Option<StakePoolData>,
        reward_distributor: Option<RewardDistributorData>,
        reward_mint: Option<MintInfo>,
        source: &'a dyn PoolDataSource,
        notifier: &'a mut dyn Notifier,
    ) -> Self {
        Self {
            session,
            stake_pool,
            reward_distributor,
            reward_mint,
            source,
            notifier,
        }
    }

    fn reward_mint_decimals(&self) -> u8 {
        self.reward_mint.as_ref().map_or(0, |mint| mint.decimals)
    }

    /// Current pool and reward distributor parameters, one per line.
    pub fn show_pool_parameters(&self, cluster: &str) -> Vec<String> {
        let Some(pool) = &self.stake_pool else {
            return vec!["Stake pool not found".to_string()];
        };
        let keys = |addresses: &[Pubkey]| {
            if addresses.is_empty() {
                NONE.to_string()
            } else {
                addresses
                    .iter()
                    .map(|key| pubkey_url(key, cluster))
                    .collect::<Vec<_>>()
                    .join(" ")
            }
        };
        let or_none = |value: Option<String>| value.unwrap_or_else(|| NONE.to_string());

        let mut lines = vec![
            format!(
                "Overlay Text: {}",
                or_none(Some(pool.overlay_text.clone()).filter(|text| !text.is_empty()))
            ),
            format!("Collection Addresses: {}", keys(&pool.requires_collections)),
            format!("Creator Addresses: {}", keys(&pool.requires_creators)),
            format!("Requires Authorization: {}", pool.requires_authorization),
            format!(
                "Cooldown Period Seconds: {}",
                or_none(pool.cooldown_seconds.filter(|s| *s > 0).map(|s| s.to_string()))
            ),
            format!(
                "Minimum Stake Seconds: {}",
                or_none(pool.min_stake_seconds.filter(|s| *s > 0).map(|s| s.to_string()))
            ),
            format!("End Date: {}", or_none(pool.end_date.map(format_date))),
        ];

        if let Some(distributor) = &self.reward_distributor {
            lines.extend([
                format!(
                    "Reward Distributor: {}",
                    pubkey_url(&distributor.pubkey, cluster)
                ),
                format!(
                    "Reward Duration Seconds: {}",
                    distributor.reward_duration_seconds
                ),
                format!(
                    "Reward Amount: {}",
                    or_none(self.reward_mint.as_ref().map(|mint| {
                        format_natural(
                            distributor.reward_amount,
                            mint.decimals,
                            mint.decimals as usize,
                        )
                    }))
                ),
                format!(
                    "Maximum reward seconds: {}",
                    or_none(distributor.max_reward_seconds_received.map(|s| s.to_string()))
                ),
                format!(
                    "Default Multiplier: {}",
                    or_none(
                        Some(distributor.default_multiplier)
                            .filter(|m| *m > 0)
                            .map(|m| m.to_string())
                    )
                ),
                format!(
                    "Multiplier Decimals: {}",
                    or_none(
                        Some(distributor.multiplier_decimals)
                            .filter(|d| *d > 0)
                            .map(|d| d.to_string())
                    )
                ),
                format!(
                    "For a 1x multiplier enter {}, for 2x enter {}",
                    10u64.saturating_pow(distributor.multiplier_decimals as u32),
                    2 * 10u64.saturating_pow(distributor.multiplier_decimals as u32)
                ),
            ]);
        }
        lines
    }

    /// Checks the wallet and pool, builds with `build`, submits, and reports
    /// the result.
    fn submit(
        &mut self,
        success: &str,
        failure: &str,
        build: impl FnOnce(&Self, WalletSession<'a>, &StakePoolData) -> Result<PreparedTransaction>,
    ) -> Result<Signature> {
        let result = (|| {
            let session = self
                .session
                .ok_or_else(|| format_err!("Wallet not connected"))?;
            let pool = self
                .stake_pool
                .as_ref()
                .ok_or_else(|| format_err!("Stake pool not found"))?;
            let transaction = build(self, session, pool)?;
            session.executor.execute(&transaction)
        })();
        match &result {
            Ok(signature) => {
                println!("{}", signature);
                self.notifier.notify(Notification::success(success));
            }
            Err(e) => self
                .notifier
                .notify(Notification::error(format!("{}: {:#}", failure, e))),
        }
        result
    }

    pub fn authorize_mints(&mut self, input: &str) -> Result<Signature> {
        self.submit(
            "Successfully authorized mints",
            "Error authorizing mints",
            |_, session, pool| {
                let mints = parse_mint_list(input)?;
                session.sdk.authorize_mints(&pool.pubkey, &mints)
            },
        )
    }

    pub fn set_multipliers(&mut self, multipliers: &[(Pubkey, u64)]) -> Result<Signature> {
        self.submit(
            "Successfully set multipliers",
            "Error setting multipliers",
            |admin, session, pool| {
                if admin.reward_distributor.is_none() {
                    return Err(format_err!("Reward Distributor not found"));
                }
                if multipliers.is_empty() {
                    return Err(format_err!("No multipliers given"));
                }
                session.sdk.set_multipliers(&pool.pubkey, multipliers)
            },
        )
    }

    pub fn update_pool(&mut self, update: &PoolUpdate) -> Result<Signature> {
        self.submit(
            "Successfully updated stake pool",
            "Error updating stake pool",
            |admin, session, pool| {
                let distributor_ix = match &admin.reward_distributor {
                    Some(distributor) if update.touches_distributor() => {
                        Some(update.distributor_ix(distributor, admin.reward_mint_decimals())?)
                    }
                    _ => None,
                };
                session
                    .sdk
                    .update_pool(&pool.pubkey, update.pool_ix(pool), distributor_ix)
            },
        )
    }

    /// Withdraws reward tokens from a treasury distributor.
    pub fn reclaim_funds(&mut self, amount: &ReclaimAmount) -> Result<Signature> {
        self.submit(
            "Successfully reclaimed funds",
            "Error reclaiming funds",
            |admin, session, pool| {
                let distributor = admin
                    .reward_distributor
                    .as_ref()
                    .ok_or_else(|| format_err!("Reward Distributor not found"))?;
                if distributor.kind != RewardDistributorKind::Treasury {
                    return Err(format_err!(
                        "Reclaim funds is only available for treasury reward distributors"
                    ));
                }
                let raw = match amount {
                    ReclaimAmount::Max => admin.source.treasury_balance(distributor)?,
                    ReclaimAmount::Amount(input) => {
                        try_parse_input(input, admin.reward_mint_decimals())
                            .ok_or_else(|| format_err!("Invalid reclaim funds amount"))?
                    }
                };
                session.sdk.reclaim_funds(&pool.pubkey, raw)
            },
        )
    }

    /// The reward multiplier applied to `mint`, as a plain factor.
    pub fn lookup_multiplier(&mut self, mint: &str) -> Result<f64> {
        let result = self.find_multiplier(mint);
        if let Err(e) = &result {
            self.notifier.notify(Notification::error(e.to_string()));
        }
        result
    }

    fn find_multiplier(&self, mint: &str) -> Result<f64> {
        let session = self
            .session
            .ok_or_else(|| format_err!("Wallet not connected"))?;
        let pool = self
            .stake_pool
            .as_ref()
            .ok_or_else(|| format_err!("Stake pool not found"))?;
        let distributor = self
            .reward_distributor
            .as_ref()
            .ok_or_else(|| format_err!("Reward Distributor not found"))?;
        let not_found = || format_err!("Invalid mint ID or no reward entry for mint");

        let mint = Pubkey::from_str(mint.trim()).map_err(|_| not_found())?;
        let stake_entry = self
            .source
            .stake_entry_for_mint(&pool.pubkey, &mint, &session.wallet)
            .map_err(|_| not_found())?
            .ok_or_else(not_found)?;
        let reward_entry = self
            .source
            .reward_entries(&distributor.pubkey, &[stake_entry.pubkey])
            .map_err(|_| not_found())?
            .into_iter()
            .next()
            .flatten()
            .ok_or_else(not_found)?;
        Ok(distributor.multiplier_factor(reward_entry.multiplier))
    }
}

/// `YYYY-MM-DD` (UTC) for a unix timestamp.
fn format_date(timestamp: i64) -> String {
    match DateTime::from_timestamp(timestamp, 0) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => timestamp.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::tests::{FakeExecutor, FakeSdk};
    use crate::data::tests::{distributor, StaticSource};
    use crate::notify::Severity;
    use crate::token_data::tests::{pool, staked_token};
    use crate::token_data::RewardEntryData;

    struct Harness {
        sdk: FakeSdk,
        executor: FakeExecutor,
        source: StaticSource,
        notifications: Vec<Notification>,
        wallet: Pubkey,
    }

    impl Harness {
        fn new(source: StaticSource) -> Self {
            Self {
                sdk: FakeSdk::default(),
                executor: FakeExecutor::default(),
                source,
                notifications: Vec::new(),
                wallet: Pubkey::new_unique(),
            }
        }

        fn admin(&mut self, kind: Option<RewardDistributorKind>) -> Admin<'_> {
            let session = WalletSession {
                wallet: self.wallet,
                sdk: &self.sdk,
                executor: &self.executor,
            };
            Admin::new(
                Some(session),
                Some(pool()),
                kind.map(distributor),
                Some(MintInfo {
                    mint: Pubkey::new_unique(),
                    decimals: 6,
                    supply: 0,
                    token_list_data: None,
                }),
                &self.source,
                &mut self.notifications,
            )
        }
    }

    #[test]
    fn mint_list_must_be_all_valid() {
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        assert_eq!(parse_mint_list(&format!("{}, {},", a, b)).unwrap(), vec![a, b]);
        assert!(parse_mint_list(&format!("{},nope", a)).is_err());
        assert!(parse_mint_list(" , ").is_err());
    }

    #[test]
    fn multiplier_pairs() {
        let mint = Pubkey::new_unique();
        assert_eq!(parse_multiplier(&format!("{}=150", mint)).unwrap(), (mint, 150));
        assert!(parse_multiplier(&format!("{}=1.5", mint)).is_err());
        assert!(parse_multiplier("150").is_err());
    }

    #[test]
    fn authorize_submits_one_transaction() {
        let mut harness = Harness::new(StaticSource::default());
        let mints = [Pubkey::new_unique(), Pubkey::new_unique()];
        let input = format!("{},{}", mints[0], mints[1]);
        harness.admin(None).authorize_mints(&input).unwrap();
        assert_eq!(*harness.sdk.authorized.borrow(), mints.to_vec());
        assert_eq!(harness.executor.submitted.borrow().len(), 1);
        assert_eq!(harness.notifications[0].message, "Successfully authorized mints");
    }

    #[test]
    fn bad_mint_list_is_reported_without_submission() {
        let mut harness = Harness::new(StaticSource::default());
        assert!(harness.admin(None).authorize_mints("xyz").is_err());
        assert!(harness.executor.submitted.borrow().is_empty());
        assert_eq!(harness.notifications[0].severity, Severity::Error);
        assert!(harness.notifications[0]
            .message
            .starts_with("Error authorizing mints: "));
    }

    #[test]
    fn multipliers_need_a_distributor() {
        let mut harness = Harness::new(StaticSource::default());
        let pairs = [(Pubkey::new_unique(), 200)];
        assert!(harness.admin(None).set_multipliers(&pairs).is_err());
        harness
            .admin(Some(RewardDistributorKind::Mint))
            .set_multipliers(&pairs)
            .unwrap();
        assert_eq!(*harness.sdk.multipliers.borrow(), pairs.to_vec());
    }

    #[test]
    fn update_prefills_current_values() {
        let mut harness = Harness::new(StaticSource::default());
        let update = PoolUpdate {
            overlay_text: Some("STAKED".to_string()),
            reward_amount: Some("2.5".to_string()),
            ..PoolUpdate::default()
        };
        harness
            .admin(Some(RewardDistributorKind::Mint))
            .update_pool(&update)
            .unwrap();
        let updates = harness.sdk.pool_updates.borrow();
        let (pool_ix, distributor_ix) = &updates[0];
        assert_eq!(pool_ix.overlay_text, "STAKED");
        assert!(!pool_ix.requires_authorization);
        let distributor_ix = distributor_ix.as_ref().unwrap();
        assert_eq!(distributor_ix.reward_amount, 2_500_000);
        assert_eq!(distributor_ix.reward_duration_seconds, 86_400);
        assert_eq!(distributor_ix.multiplier_decimals, 2);
    }

    #[test]
    fn pool_only_update_leaves_distributor_alone() {
        let mut harness = Harness::new(StaticSource::default());
        let update = PoolUpdate {
            requires_authorization: Some(true),
            ..PoolUpdate::default()
        };
        harness
            .admin(Some(RewardDistributorKind::Mint))
            .update_pool(&update)
            .unwrap();
        let updates = harness.sdk.pool_updates.borrow();
        assert!(updates[0].0.requires_authorization);
        assert!(updates[0].1.is_none());
    }

    #[test]
    fn reclaim_is_treasury_only() {
        let mut harness = Harness::new(StaticSource {
            treasury: 42_000_000,
            ..StaticSource::default()
        });
        assert!(harness
            .admin(Some(RewardDistributorKind::Mint))
            .reclaim_funds(&ReclaimAmount::Max)
            .is_err());
        harness
            .admin(Some(RewardDistributorKind::Treasury))
            .reclaim_funds(&ReclaimAmount::Max)
            .unwrap();
        harness
            .admin(Some(RewardDistributorKind::Treasury))
            .reclaim_funds(&"1.5".parse().unwrap())
            .unwrap();
        assert_eq!(*harness.sdk.reclaimed.borrow(), vec![42_000_000, 1_500_000]);
        assert_eq!("MAX".parse::<ReclaimAmount>().unwrap(), ReclaimAmount::Max);
    }

    #[test]
    fn lookup_reports_scaled_multiplier() {
        let mint = Pubkey::new_unique();
        let staked = staked_token(mint, 1);
        let stake_entry = staked.stake_entry.clone().unwrap();
        let mut source = StaticSource {
            staked: vec![staked],
            ..StaticSource::default()
        };
        source.reward_entries.push(RewardEntryData {
            pubkey: Pubkey::new_unique(),
            stake_entry: stake_entry.pubkey,
            reward_distributor: Pubkey::new_unique(),
            reward_seconds_received: 0,
            multiplier: 150,
        });
        let mut harness = Harness::new(source);
        let factor = harness
            .admin(Some(RewardDistributorKind::Mint))
            .lookup_multiplier(&mint.to_string())
            .unwrap();
        assert!((factor - 1.5).abs() < 1e-9);

        let missing = harness
            .admin(Some(RewardDistributorKind::Mint))
            .lookup_multiplier(&Pubkey::new_unique().to_string());
        assert!(missing.is_err());
        assert_eq!(
            harness.notifications.last().unwrap().message,
            "Invalid mint ID or no reward entry for mint"
        );
    }

    #[test]
    fn shows_none_for_absent_values() {
        let mut harness = Harness::new(StaticSource::default());
        let lines = harness
            .admin(Some(RewardDistributorKind::Treasury))
            .show_pool_parameters("devnet");
        assert_eq!(lines[0], "Overlay Text: [None]");
        assert_eq!(lines[1], "Collection Addresses: [None]");
        assert!(lines.contains(&"End Date: [None]".to_string()));
        assert!(lines.contains(&"Reward Amount: 1.000000".to_string()));
        assert!(lines.contains(&"Maximum reward seconds: [None]".to_string()));
    }

    #[test]
    fn dates_render_in_utc() {
        assert_eq!(format_date(0), "1970-01-01");
        assert_eq!(format_date(1_700_000_000), "2023-11-14");
        assert_eq!(format_date(951_782_400), "2000-02-29");
        assert_eq!(format_date(i64::MAX), i64::MAX.to_string());
    }

    #[test]
    fn reward_entry_read_failure_is_reported_as_lookup_failure() {
        let mint = Pubkey::new_unique();
        let source = StaticSource {
            staked: vec![staked_token(mint, 1)],
            fail_reward_entries: true,
            ..StaticSource::default()
        };
        let mut harness = Harness::new(source);
        let result = harness
            .admin(Some(RewardDistributorKind::Mint))
            .lookup_multiplier(&mint.to_string());
        assert_eq!(
            result.unwrap_err().to_string(),
            "Invalid mint ID or no reward entry for mint"
        );
        assert_eq!(harness.notifications.len(), 1);
        assert_eq!(harness.notifications[0].severity, Severity::Error);
    }
}

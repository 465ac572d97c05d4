//! Client-side estimate of pending rewards, used only for display. The reward
//! distributor program decides what a claim actually pays.

use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;

use crate::token_data::{RewardDistributorData, RewardEntryData, StakeEntryData};
use crate::units::decimal_from_natural;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MintReward {
    pub claimable: u64,
    /// Seconds until the next reward period completes.
    pub next_reward_in: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RewardsView {
    pub claimable_rewards: u64,
    pub reward_map: HashMap<Pubkey, MintReward>,
}

/// Reward tokens per day for one staked unit at the default multiplier, in
/// decimal units of the reward mint.
pub fn daily_reward_rate(distributor: &RewardDistributorData, reward_mint_decimals: u8) -> f64 {
    if distributor.reward_duration_seconds == 0 {
        return 0.0;
    }
    decimal_from_natural(distributor.reward_amount, reward_mint_decimals)
        / distributor.reward_duration_seconds as f64
        * SECONDS_PER_DAY
}

/// Estimates what each stake entry could claim at `now`.
///
/// `remaining` caps the total: the treasury balance for treasury distributors,
/// the unissued supply for capped mint distributors.
pub fn compute_rewards(
    distributor: &RewardDistributorData,
    entries: &[(StakeEntryData, Option<RewardEntryData>)],
    now: i64,
    remaining: Option<u128>,
) -> RewardsView {
    let duration = distributor.reward_duration_seconds;
    let scale = 10u128.saturating_pow(distributor.multiplier_decimals as u32).max(1);
    let mut budget = remaining;
    let mut view = RewardsView::default();

    for (stake_entry, reward_entry) in entries {
        if duration == 0 {
            view.reward_map
                .insert(stake_entry.original_mint, MintReward::default());
            continue;
        }
        let multiplier = reward_entry
            .as_ref()
            .map_or(distributor.default_multiplier, |entry| entry.multiplier) as u128;
        let received = reward_entry
            .as_ref()
            .map_or(0, |entry| entry.reward_seconds_received);

        let elapsed = if stake_entry.is_staked() && now > stake_entry.last_staked_at {
            (now - stake_entry.last_staked_at) as u128
        } else {
            0
        };
        let mut total_seconds = stake_entry.total_stake_seconds.saturating_add(elapsed);
        if let Some(max) = distributor.max_reward_seconds_received {
            total_seconds = total_seconds.min(max);
        }

        let periods = total_seconds.saturating_sub(received) / duration;
        let mut claimable = periods
            .saturating_mul(distributor.reward_amount as u128)
            .saturating_mul(stake_entry.amount.max(1) as u128)
            .saturating_mul(multiplier)
            / scale;
        if let Some(left) = budget.as_mut() {
            claimable = claimable.min(*left);
            *left -= claimable;
        }
        let claimable = u64::try_from(claimable).unwrap_or(u64::MAX);

        let next_reward_in = (duration - total_seconds % duration) as u64;
        view.claimable_rewards = view.claimable_rewards.saturating_add(claimable);
        view.reward_map.insert(
            stake_entry.original_mint,
            MintReward {
                claimable,
                next_reward_in,
            },
        );
    }
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_data::RewardDistributorKind;

    fn distributor() -> RewardDistributorData {
        RewardDistributorData {
            pubkey: Pubkey::new_unique(),
            stake_pool: Pubkey::new_unique(),
            kind: RewardDistributorKind::Mint,
            authority: Pubkey::new_unique(),
            reward_mint: Pubkey::new_unique(),
            reward_amount: 1_000,
            reward_duration_seconds: 60,
            rewards_issued: 0,
            max_supply: None,
            default_multiplier: 1,
            multiplier_decimals: 0,
            max_reward_seconds_received: None,
        }
    }

    fn entry(last_staked_at: i64, total: u128) -> StakeEntryData {
        StakeEntryData {
            pubkey: Pubkey::new_unique(),
            pool: Pubkey::new_unique(),
            original_mint: Pubkey::new_unique(),
            amount: 1,
            last_staker: Pubkey::new_unique(),
            last_staked_at,
            total_stake_seconds: total,
            cooldown_start_seconds: None,
        }
    }

    #[test]
    fn whole_periods_only() {
        let stake = entry(1_000, 0);
        let view = compute_rewards(&distributor(), &[(stake.clone(), None)], 1_150, None);
        let reward = view.reward_map[&stake.original_mint];
        assert_eq!(reward.claimable, 2_000);
        assert_eq!(reward.next_reward_in, 30);
        assert_eq!(view.claimable_rewards, 2_000);
    }

    #[test]
    fn multiplier_and_received_seconds_apply() {
        let mut distributor = distributor();
        distributor.multiplier_decimals = 2;
        let stake = entry(0, 0);
        let reward_entry = RewardEntryData {
            pubkey: Pubkey::new_unique(),
            stake_entry: stake.pubkey,
            reward_distributor: distributor.pubkey,
            reward_seconds_received: 60,
            multiplier: 150,
        };
        let view = compute_rewards(&distributor, &[(stake, Some(reward_entry))], 180, None);
        assert_eq!(view.claimable_rewards, 3_000);
    }

    #[test]
    fn budget_caps_total() {
        let a = entry(0, 0);
        let b = entry(0, 0);
        let view = compute_rewards(&distributor(), &[(a, None), (b.clone(), None)], 600, Some(12_000));
        assert_eq!(view.claimable_rewards, 12_000);
        assert_eq!(view.reward_map[&b.original_mint].claimable, 2_000);
    }

    #[test]
    fn daily_rate() {
        let mut distributor = distributor();
        distributor.reward_amount = 1_000_000;
        distributor.reward_duration_seconds = 86_400;
        assert!((daily_reward_rate(&distributor, 6) - 1.0).abs() < 1e-9);
        distributor.reward_duration_seconds = 0;
        assert_eq!(daily_reward_rate(&distributor, 6), 0.0);
    }
}

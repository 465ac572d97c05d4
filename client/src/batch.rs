//! Sequential stake / unstake / claim-rewards over the current selection, one
//! transaction per token.

use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::fmt;
use std::time::Duration;

use anyhow::Result;

use crate::cache::{refresh_then_settle, CacheKind, CacheRefresher};
use crate::notify::{Notification, Notifier};
use crate::sdk::{StakingSdk, TransactionExecutor};
use crate::selection::{SelectedToken, Selection};
use crate::token_data::{StakePoolData, TokenData};
use crate::units::natural_from_decimal;

/// Most tokens a single claim may be asked for.
pub const MAX_CLAIM_BATCH: usize = 4;

pub const INVALID_AMOUNT: &str = "Invalid amount chosen for token";
pub const FUNGIBLE_RESTAKE: &str = "Fungible tokens already staked in the pool. Staked tokens need to be unstaked and then restaked together with the new tokens.";

const STAKE_REFRESH: [CacheKind; 3] = [
    CacheKind::WalletTokens,
    CacheKind::StakedTokens,
    CacheKind::PoolEntries,
];
const CLAIM_REFRESH: [CacheKind; 2] = [CacheKind::Rewards, CacheKind::StakedTokens];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchAction {
    Stake,
    Unstake,
    ClaimRewards,
}

impl BatchAction {
    fn success_message(&self, position: usize, total: usize) -> String {
        let verb = match self {
            BatchAction::Stake => "staked",
            BatchAction::Unstake => "unstaked",
            BatchAction::ClaimRewards => "claimed rewards",
        };
        format!("Successfully {} {}/{}", verb, position, total)
    }

    fn refresh_kinds(&self) -> &'static [CacheKind] {
        match self {
            BatchAction::Stake | BatchAction::Unstake => &STAKE_REFRESH,
            BatchAction::ClaimRewards => &CLAIM_REFRESH,
        }
    }
}

impl fmt::Display for BatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BatchAction::Stake => "stake",
            BatchAction::Unstake => "unstake",
            BatchAction::ClaimRewards => "claim rewards",
        };
        f.write_str(name)
    }
}

/// What happens to the rest of a batch after an item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchPolicy {
    /// Stop after the first item that did not succeed.
    StopOnFirstFailure,
    /// Process every item regardless of earlier outcomes.
    ContinueOnFailure,
    /// Process the first item only, whatever its outcome.
    FirstItemOnly,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemOutcome {
    Succeeded { signatures: Vec<Signature> },
    /// Validation refused the item; nothing was submitted for it.
    Rejected { reason: String },
    /// A missing record or a failed transaction.
    Failed { error: String },
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Succeeded { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemResult {
    pub mint: Pubkey,
    pub outcome: ItemOutcome,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchReport {
    pub action: BatchAction,
    /// Size of the selection the batch was started with.
    pub total: usize,
    /// One result per processed item, in selection order.
    pub results: Vec<ItemResult>,
    /// Set when the batch refused to start.
    pub aborted: Option<String>,
}

impl BatchReport {
    fn aborted(action: BatchAction, total: usize, reason: &str) -> Self {
        Self {
            action,
            total,
            results: Vec::new(),
            aborted: Some(reason.to_string()),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.results
            .iter()
            .filter(|result| result.outcome.is_success())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// 1-based position of the last processed item when items were left
    /// unprocessed.
    pub fn stopped_at(&self) -> Option<usize> {
        if self.aborted.is_some() || self.results.len() >= self.total {
            return None;
        }
        Some(self.results.len())
    }

    pub fn is_success(&self) -> bool {
        self.aborted.is_none() && self.failed() == 0
    }
}

/// Runs `process` over `items` in order, applying `policy` after each one.
/// Returns the outcome of every processed item.
pub fn run_sequential<T>(
    items: &[T],
    policy: BatchPolicy,
    mut process: impl FnMut(usize, &T) -> ItemOutcome,
) -> Vec<ItemOutcome> {
    let mut outcomes = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let outcome = process(index, item);
        let stop = match policy {
            BatchPolicy::StopOnFirstFailure => !outcome.is_success(),
            BatchPolicy::ContinueOnFailure => false,
            BatchPolicy::FirstItemOnly => true,
        };
        outcomes.push(outcome);
        if stop {
            break;
        }
    }
    outcomes
}

/// The signing side of a batch: present only when a wallet is connected.
#[derive(Clone, Copy)]
pub struct WalletSession<'a> {
    pub wallet: Pubkey,
    pub sdk: &'a dyn StakingSdk,
    pub executor: &'a dyn TransactionExecutor,
}

/// One flag per action, raised while its batch runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct LoadingFlags {
    stake: bool,
    unstake: bool,
    claim_rewards: bool,
}

impl LoadingFlags {
    fn set(&mut self, action: BatchAction, value: bool) {
        match action {
            BatchAction::Stake => self.stake = value,
            BatchAction::Unstake => self.unstake = value,
            BatchAction::ClaimRewards => self.claim_rewards = value,
        }
    }

    /// What the busy action shows in place of its button.
    fn label(&self) -> Option<&'static str> {
        if self.stake {
            Some("Staking")
        } else if self.unstake {
            Some("Unstaking")
        } else if self.claim_rewards {
            Some("Claiming rewards")
        } else {
            None
        }
    }
}

pub struct BatchRunner<'a> {
    session: Option<WalletSession<'a>>,
    stake_pool: Option<StakePoolData>,
    notifier: &'a mut dyn Notifier,
    refresher: &'a mut dyn CacheRefresher,
    settle_delay: Duration,
    loading: LoadingFlags,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        session: Option<WalletSession<'a>>,
        stake_pool: Option<StakePoolData>,
        notifier: &'a mut dyn Notifier,
        refresher: &'a mut dyn CacheRefresher,
        settle_delay: Duration,
    ) -> Self {
        Self {
            session,
            stake_pool,
            notifier,
            refresher,
            settle_delay,
            loading: LoadingFlags::default(),
        }
    }

    /// Stakes every selected wallet token. `tokens` is the wallet token cache
    /// the selection was made from.
    pub fn stake(
        &mut self,
        selection: &mut Selection,
        tokens: &[TokenData],
        policy: BatchPolicy,
    ) -> BatchReport {
        let items = selection.unstaked().to_vec();
        let report = self.run(BatchAction::Stake, &items, policy, |runner, session, pool, item| {
            runner.stake_item(session, pool, item, tokens)
        });
        selection.clear();
        report
    }

    /// Unstakes every selected staked token. `tokens` is the staked token
    /// cache the selection was made from.
    pub fn unstake(
        &mut self,
        selection: &mut Selection,
        tokens: &[TokenData],
        policy: BatchPolicy,
    ) -> BatchReport {
        let items = selection.staked().to_vec();
        let report = self.run(BatchAction::Unstake, &items, policy, |_, session, pool, mint| {
            with_stake_entry(tokens, mint, || {
                println!("Unstaking...");
                let transaction = session.sdk.unstake(&pool.pubkey, mint)?;
                let signature = session.executor.execute(&transaction)?;
                println!("Successfully unstaked: {}", signature);
                Ok(vec![signature])
            })
        });
        selection.clear();
        report
    }

    /// Claims rewards for the selected staked tokens. At most
    /// [`MAX_CLAIM_BATCH`] may be selected, and only the first one is
    /// processed per invocation.
    pub fn claim_rewards(&mut self, selection: &mut Selection, tokens: &[TokenData]) -> BatchReport {
        let items = selection.staked().to_vec();
        if items.len() > MAX_CLAIM_BATCH {
            let message = format!("Limit of {} tokens at a time reached", MAX_CLAIM_BATCH);
            self.notifier.notify(Notification::error(message.clone()));
            selection.clear();
            return BatchReport::aborted(BatchAction::ClaimRewards, items.len(), &message);
        }
        let report = self.run(
            BatchAction::ClaimRewards,
            &items,
            BatchPolicy::FirstItemOnly,
            |_, session, pool, mint| {
                with_stake_entry(tokens, mint, || {
                    println!("Claiming rewards...");
                    let transaction = session.sdk.claim_rewards(&pool.pubkey, mint)?;
                    let signature = session.executor.execute(&transaction)?;
                    println!("Successfully claimed rewards: {}", signature);
                    Ok(vec![signature])
                })
            },
        );
        selection.clear();
        report
    }

    fn run<T: Clone + Keyed>(
        &mut self,
        action: BatchAction,
        items: &[T],
        policy: BatchPolicy,
        mut process: impl FnMut(&Self, WalletSession<'a>, &StakePoolData, &T) -> ItemOutcome,
    ) -> BatchReport {
        let total = items.len();
        if items.is_empty() {
            self.notifier.notify(Notification::error("No tokens selected"));
            return BatchReport::aborted(action, total, "No tokens selected");
        }
        let Some(session) = self.session else {
            self.notifier.notify(Notification::error("Wallet not connected"));
            return BatchReport::aborted(action, total, "Wallet not connected");
        };
        let Some(pool) = self.stake_pool.clone() else {
            self.notifier.notify(Notification::error("No stake pool detected"));
            return BatchReport::aborted(action, total, "No stake pool detected");
        };

        self.loading.set(action, true);
        if let Some(label) = self.loading.label() {
            self.notifier
                .notify(Notification::info(format!("{}... ({} selected)", label, total)));
        }
        let outcomes = run_sequential(items, policy, |index, item| {
            let outcome = process(self, session, &pool, item);
            self.report_item(action, index + 1, total, &outcome);
            outcome
        });
        self.loading.set(action, false);

        BatchReport {
            action,
            total,
            results: items
                .iter()
                .zip(outcomes)
                .map(|(item, outcome)| ItemResult {
                    mint: item.mint(),
                    outcome,
                })
                .collect(),
            aborted: None,
        }
    }

    fn report_item(&mut self, action: BatchAction, position: usize, total: usize, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Succeeded { .. } => {
                self.notifier
                    .notify(Notification::success(action.success_message(position, total)));
                refresh_then_settle(self.refresher, action.refresh_kinds(), self.settle_delay);
            }
            ItemOutcome::Rejected { reason } => {
                self.notifier.notify(Notification::error(reason.clone()));
            }
            ItemOutcome::Failed { error } => {
                self.notifier
                    .notify(Notification::error(format!("Transaction failed: {}", error)));
            }
        }
    }

    fn stake_item(
        &self,
        session: WalletSession<'a>,
        pool: &StakePoolData,
        selected: &SelectedToken,
        tokens: &[TokenData],
    ) -> ItemOutcome {
        let token = tokens.iter().find(|token| {
            token.token_account.as_ref().map(|account| account.mint) == Some(selected.mint)
        });
        let Some((token, account)) =
            token.and_then(|token| token.token_account.as_ref().map(|account| (token, account)))
        else {
            return failed("Token account not set");
        };

        if account.amount > 1 && selected.amount_to_stake.is_none() {
            return rejected(INVALID_AMOUNT);
        }
        if token.staked_amount() > 0 {
            return rejected(FUNGIBLE_RESTAKE);
        }
        let amount = match selected.amount_to_stake.as_deref() {
            Some(input) => match natural_from_decimal(input, token.decimals()) {
                Ok(amount) if amount > 0 => Some(amount),
                _ => return rejected(INVALID_AMOUNT),
            },
            None => None,
        };

        let result = (|| -> Result<Vec<Signature>> {
            let mut signatures = Vec::new();
            println!("Creating stake entry and stake mint...");
            let init = session
                .sdk
                .create_stake_entry_and_stake_mint(&pool.pubkey, &account.mint)?;
            if !init.is_empty() {
                signatures.push(session.executor.execute(&init)?);
            }
            println!("Successfully created stake entry and stake mint");
            println!("Staking...");
            let transaction = session
                .sdk
                .stake(&pool.pubkey, &account.mint, &account.pubkey, amount)?;
            let signature = session.executor.execute(&transaction)?;
            println!("Successfully staked: {}", signature);
            signatures.push(signature);
            Ok(signatures)
        })();
        into_outcome(result)
    }
}

/// Selection items carry the mint they were picked by.
trait Keyed {
    fn mint(&self) -> Pubkey;
}

impl Keyed for SelectedToken {
    fn mint(&self) -> Pubkey {
        self.mint
    }
}

impl Keyed for Pubkey {
    fn mint(&self) -> Pubkey {
        *self
    }
}

fn with_stake_entry(
    tokens: &[TokenData],
    mint: &Pubkey,
    submit: impl FnOnce() -> Result<Vec<Signature>>,
) -> ItemOutcome {
    let has_entry = tokens.iter().any(|token| {
        token
            .stake_entry
            .as_ref()
            .map_or(false, |entry| &entry.original_mint == mint)
    });
    if !has_entry {
        return failed("No stake entry for token");
    }
    into_outcome(submit())
}

fn into_outcome(result: Result<Vec<Signature>>) -> ItemOutcome {
    match result {
        Ok(signatures) => ItemOutcome::Succeeded { signatures },
        Err(e) => failed(&format!("{:#}", e)),
    }
}

fn rejected(reason: &str) -> ItemOutcome {
    ItemOutcome::Rejected {
        reason: reason.to_string(),
    }
}

fn failed(error: &str) -> ItemOutcome {
    ItemOutcome::Failed {
        error: error.to_string(),
    }
}

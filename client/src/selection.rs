//! The user's current picks, keyed by mint and kept apart from cached records.

use crate::notify::{Notification, Notifier};
use crate::token_data::TokenData;
use crate::units::natural_from_decimal;
use solana_sdk::pubkey::Pubkey;

/// A wallet token picked for staking, with the amount typed for fungibles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedToken {
    pub mint: Pubkey,
    pub amount_to_stake: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct Selection {
    unstaked: Vec<SelectedToken>,
    staked: Vec<Pubkey>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unstaked(&self) -> &[SelectedToken] {
        &self.unstaked
    }

    pub fn staked(&self) -> &[Pubkey] {
        &self.staked
    }

    pub fn is_unstaked_selected(&self, mint: &Pubkey) -> bool {
        self.unstaked.iter().any(|selected| &selected.mint == mint)
    }

    pub fn is_staked_selected(&self, mint: &Pubkey) -> bool {
        self.staked.contains(mint)
    }

    /// Toggles a wallet token. For tokens holding more than one unit the typed
    /// amount is validated first; a bad amount deselects the token.
    pub fn toggle_unstaked(
        &mut self,
        token: &TokenData,
        amount_input: Option<&str>,
        notifier: &mut dyn Notifier,
    ) {
        let Some(account) = &token.token_account else {
            notifier.notify(Notification::error("Token account not set"));
            return;
        };
        let mint = account.mint;
        let mut amount_to_stake = None;
        if account.amount > 1 {
            if let Some(input) = amount_input.filter(|input| !input.trim().is_empty()) {
                let valid = natural_from_decimal(input, token.decimals())
                    .map_or(false, |natural| natural > 0);
                if !valid {
                    notifier.notify(Notification::error("Please enter a valid amount"));
                    self.unstaked.retain(|selected| selected.mint != mint);
                    return;
                }
                amount_to_stake = Some(input.trim().to_string());
            }
        }

        if self.is_unstaked_selected(&mint) {
            self.unstaked.retain(|selected| selected.mint != mint);
        } else {
            self.unstaked.push(SelectedToken {
                mint,
                amount_to_stake,
            });
        }
    }

    /// Toggles a staked token. Tokens without a stake entry cannot be picked.
    pub fn toggle_staked(&mut self, token: &TokenData) -> bool {
        let Some(entry) = &token.stake_entry else {
            return false;
        };
        let mint = entry.original_mint;
        if self.is_staked_selected(&mint) {
            self.staked.retain(|selected| selected != &mint);
        } else {
            self.staked.push(mint);
        }
        true
    }

    pub fn clear(&mut self) {
        self.unstaked.clear();
        self.staked.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_data::tests::{staked_token, wallet_token};

    #[test]
    fn nft_toggles_without_amount() {
        let mut notes = Vec::new();
        let mut selection = Selection::new();
        let token = wallet_token(Pubkey::new_unique(), 1, 0);
        selection.toggle_unstaked(&token, Some("5"), &mut notes);
        assert_eq!(selection.unstaked()[0].amount_to_stake, None);
        selection.toggle_unstaked(&token, None, &mut notes);
        assert!(selection.unstaked().is_empty());
        assert!(notes.is_empty());
    }

    #[test]
    fn fungible_keeps_amount_beside_the_record() {
        let mut notes = Vec::new();
        let mut selection = Selection::new();
        let token = wallet_token(Pubkey::new_unique(), 10_000, 2);
        selection.toggle_unstaked(&token, Some("12.5"), &mut notes);
        assert_eq!(selection.unstaked()[0].amount_to_stake.as_deref(), Some("12.5"));
        assert_eq!(selection.unstaked()[0].mint, token.mint().unwrap());
    }

    #[test]
    fn invalid_amount_notifies_and_deselects() {
        let mut notes = Vec::new();
        let mut selection = Selection::new();
        let token = wallet_token(Pubkey::new_unique(), 10_000, 2);
        selection.toggle_unstaked(&token, None, &mut notes);
        assert_eq!(selection.unstaked().len(), 1);
        selection.toggle_unstaked(&token, Some("abc"), &mut notes);
        assert!(selection.unstaked().is_empty());
        assert_eq!(notes, vec![Notification::error("Please enter a valid amount")]);
    }

    #[test]
    fn staked_selection_requires_entry() {
        let mut selection = Selection::new();
        assert!(!selection.toggle_staked(&wallet_token(Pubkey::new_unique(), 1, 0)));
        let token = staked_token(Pubkey::new_unique(), 1);
        assert!(selection.toggle_staked(&token));
        assert_eq!(selection.staked().len(), 1);
        selection.clear();
        assert!(selection.staked().is_empty());
    }
}

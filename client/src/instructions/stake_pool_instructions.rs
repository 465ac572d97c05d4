use anchor_client::Program;
use anchor_lang::prelude::{borsh, AccountMeta, AnchorSerialize};
use anchor_lang::{Discriminator, InstructionData, ToAccountMetas};
use anyhow::Result;
use solana_sdk::{
    instruction::Instruction, pubkey::Pubkey, signature::Keypair, system_program, sysvar,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use anchor_spl::metadata::mpl_token_metadata;
use std::rc::Rc;

use crate::instructions::utils::{
    get_metadata_address, get_mint_manager_address, get_reward_entry_address,
    get_stake_authorization_address, get_stake_entry_address,
};

pub type PoolProgram = Program<Rc<Keypair>>;

//
// Stake pool program
//

pub struct InitEntryAccounts {
    pub stake_entry: Pubkey,
    pub stake_pool: Pubkey,
    pub original_mint: Pubkey,
    pub original_mint_metadata: Pubkey,
    pub payer: Pubkey,
    pub system_program: Pubkey,
}

impl ToAccountMetas for InitEntryAccounts {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.stake_entry, false),
            AccountMeta::new(self.stake_pool, false),
            AccountMeta::new_readonly(self.original_mint, false),
            AccountMeta::new_readonly(self.original_mint_metadata, false),
            AccountMeta::new(self.payer, true),
            AccountMeta::new_readonly(self.system_program, false),
        ]
    }
}

#[derive(AnchorSerialize)]
pub struct InitEntry {
    pub user: Pubkey,
}

impl Discriminator for InitEntry {
    const DISCRIMINATOR: &'static [u8] = &[0xcf, 0x50, 0x11, 0xb9, 0xe5, 0x94, 0xaa, 0xb7];
}
impl InstructionData for InitEntry {}

pub struct InitStakeMintAccounts {
    pub stake_entry: Pubkey,
    pub stake_pool: Pubkey,
    pub original_mint: Pubkey,
    pub original_mint_metadata: Pubkey,
    pub stake_mint: Pubkey,
    pub stake_mint_metadata: Pubkey,
    pub stake_entry_stake_mint_token_account: Pubkey,
    pub mint_manager: Pubkey,
    pub payer: Pubkey,
    pub rent: Pubkey,
    pub token_program: Pubkey,
    pub token_manager_program: Pubkey,
    pub associated_token: Pubkey,
    pub token_metadata_program: Pubkey,
    pub system_program: Pubkey,
}

impl ToAccountMetas for InitStakeMintAccounts {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.stake_entry, false),
            AccountMeta::new(self.stake_pool, false),
            AccountMeta::new_readonly(self.original_mint, false),
            AccountMeta::new_readonly(self.original_mint_metadata, false),
            AccountMeta::new(self.stake_mint, true),
            AccountMeta::new(self.stake_mint_metadata, false),
            AccountMeta::new(self.stake_entry_stake_mint_token_account, false),
            AccountMeta::new(self.mint_manager, false),
            AccountMeta::new(self.payer, true),
            AccountMeta::new_readonly(self.rent, false),
            AccountMeta::new_readonly(self.token_program, false),
            AccountMeta::new_readonly(self.token_manager_program, false),
            AccountMeta::new_readonly(self.associated_token, false),
            AccountMeta::new_readonly(self.token_metadata_program, false),
            AccountMeta::new_readonly(self.system_program, false),
        ]
    }
}

#[derive(AnchorSerialize, Clone, Debug, PartialEq, Eq)]
pub struct InitStakeMintIx {
    pub name: String,
    pub symbol: String,
}

#[derive(AnchorSerialize)]
pub struct InitStakeMint {
    pub ix: InitStakeMintIx,
}

impl Discriminator for InitStakeMint {
    const DISCRIMINATOR: &'static [u8] = &[0x71, 0x39, 0x74, 0x33, 0x99, 0x76, 0x2f, 0xec];
}
impl InstructionData for InitStakeMint {}

pub struct StakeAccounts {
    pub stake_entry: Pubkey,
    pub stake_pool: Pubkey,
    pub stake_entry_original_mint_token_account: Pubkey,
    pub original_mint: Pubkey,
    pub user: Pubkey,
    pub user_original_mint_token_account: Pubkey,
    pub token_program: Pubkey,
}

impl ToAccountMetas for StakeAccounts {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.stake_entry, false),
            AccountMeta::new(self.stake_pool, false),
            AccountMeta::new(self.stake_entry_original_mint_token_account, false),
            AccountMeta::new_readonly(self.original_mint, false),
            AccountMeta::new(self.user, true),
            AccountMeta::new(self.user_original_mint_token_account, false),
            AccountMeta::new_readonly(self.token_program, false),
        ]
    }
}

#[derive(AnchorSerialize)]
pub struct Stake {
    pub amount: u64,
}

impl Discriminator for Stake {
    const DISCRIMINATOR: &'static [u8] = &[0xce, 0xb0, 0xca, 0x12, 0xc8, 0xd1, 0xb3, 0x6c];
}
impl InstructionData for Stake {}

pub struct UnstakeAccounts {
    pub stake_pool: Pubkey,
    pub stake_entry: Pubkey,
    pub original_mint: Pubkey,
    pub stake_entry_original_mint_token_account: Pubkey,
    pub user: Pubkey,
    pub user_original_mint_token_account: Pubkey,
    pub token_program: Pubkey,
}

impl ToAccountMetas for UnstakeAccounts {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.stake_pool, false),
            AccountMeta::new(self.stake_entry, false),
            AccountMeta::new_readonly(self.original_mint, false),
            AccountMeta::new(self.stake_entry_original_mint_token_account, false),
            AccountMeta::new(self.user, true),
            AccountMeta::new(self.user_original_mint_token_account, false),
            AccountMeta::new_readonly(self.token_program, false),
        ]
    }
}

#[derive(AnchorSerialize)]
pub struct Unstake {}

impl Discriminator for Unstake {
    const DISCRIMINATOR: &'static [u8] = &[0x5a, 0x5f, 0x6b, 0x2a, 0xcd, 0x7c, 0x32, 0xe1];
}
impl InstructionData for Unstake {}

pub struct UpdateTotalStakeSecondsAccounts {
    pub stake_entry: Pubkey,
    pub last_staker: Pubkey,
}

impl ToAccountMetas for UpdateTotalStakeSecondsAccounts {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.stake_entry, false),
            AccountMeta::new(self.last_staker, true),
        ]
    }
}

#[derive(AnchorSerialize)]
pub struct UpdateTotalStakeSeconds {}

impl Discriminator for UpdateTotalStakeSeconds {
    const DISCRIMINATOR: &'static [u8] = &[0x9c, 0x45, 0x95, 0xc3, 0xab, 0xdf, 0xb1, 0xf5];
}
impl InstructionData for UpdateTotalStakeSeconds {}

pub struct AuthorizeStakeEntryAccounts {
    pub stake_pool: Pubkey,
    pub stake_authorization_record: Pubkey,
    pub payer: Pubkey,
    pub system_program: Pubkey,
}

impl ToAccountMetas for AuthorizeStakeEntryAccounts {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.stake_pool, false),
            AccountMeta::new(self.stake_authorization_record, false),
            AccountMeta::new(self.payer, true),
            AccountMeta::new_readonly(self.system_program, false),
        ]
    }
}

#[derive(AnchorSerialize)]
pub struct AuthorizeStakeEntry {
    pub original_mint: Pubkey,
}

impl Discriminator for AuthorizeStakeEntry {
    const DISCRIMINATOR: &'static [u8] = &[0xee, 0xf6, 0xf7, 0x10, 0xa5, 0xf2, 0x06, 0x73];
}
impl InstructionData for AuthorizeStakeEntry {}

pub struct UpdatePoolAccounts {
    pub stake_pool: Pubkey,
    pub payer: Pubkey,
}

impl ToAccountMetas for UpdatePoolAccounts {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.stake_pool, false),
            AccountMeta::new(self.payer, true),
        ]
    }
}

#[derive(AnchorSerialize, Clone, Debug, PartialEq, Eq)]
pub struct UpdatePoolIx {
    pub requires_collections: Vec<Pubkey>,
    pub requires_creators: Vec<Pubkey>,
    pub requires_authorization: bool,
    pub overlay_text: String,
    pub image_uri: String,
    pub authority: Pubkey,
    pub reset_on_stake: bool,
    pub cooldown_seconds: Option<u32>,
    pub min_stake_seconds: Option<u32>,
    pub end_date: Option<i64>,
}

#[derive(AnchorSerialize)]
pub struct UpdatePool {
    pub ix: UpdatePoolIx,
}

impl Discriminator for UpdatePool {
    const DISCRIMINATOR: &'static [u8] = &[0xef, 0xd6, 0xaa, 0x4e, 0x24, 0x23, 0x1e, 0x22];
}
impl InstructionData for UpdatePool {}

//
// Reward distributor program
//

pub struct InitRewardEntryAccounts {
    pub reward_entry: Pubkey,
    pub stake_entry: Pubkey,
    pub reward_distributor: Pubkey,
    pub payer: Pubkey,
    pub system_program: Pubkey,
}

impl ToAccountMetas for InitRewardEntryAccounts {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.reward_entry, false),
            AccountMeta::new_readonly(self.stake_entry, false),
            AccountMeta::new(self.reward_distributor, false),
            AccountMeta::new(self.payer, true),
            AccountMeta::new_readonly(self.system_program, false),
        ]
    }
}

#[derive(AnchorSerialize)]
pub struct InitRewardEntry {}

impl Discriminator for InitRewardEntry {
    const DISCRIMINATOR: &'static [u8] = &[0xb0, 0x87, 0x7e, 0xb3, 0x26, 0x61, 0x08, 0x73];
}
impl InstructionData for InitRewardEntry {}

pub struct ClaimRewardEntryAccounts {
    pub reward_entry: Pubkey,
    pub reward_distributor: Pubkey,
    pub stake_entry: Pubkey,
    pub stake_pool: Pubkey,
    pub reward_mint: Pubkey,
    pub user_reward_mint_token_account: Pubkey,
    pub reward_distributor_token_account: Pubkey,
    pub user: Pubkey,
    pub token_program: Pubkey,
    pub system_program: Pubkey,
}

impl ToAccountMetas for ClaimRewardEntryAccounts {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.reward_entry, false),
            AccountMeta::new(self.reward_distributor, false),
            AccountMeta::new_readonly(self.stake_entry, false),
            AccountMeta::new_readonly(self.stake_pool, false),
            AccountMeta::new(self.reward_mint, false),
            AccountMeta::new(self.user_reward_mint_token_account, false),
            AccountMeta::new(self.reward_distributor_token_account, false),
            AccountMeta::new(self.user, true),
            AccountMeta::new_readonly(self.token_program, false),
            AccountMeta::new_readonly(self.system_program, false),
        ]
    }
}

#[derive(AnchorSerialize)]
pub struct ClaimRewardEntry {}

impl Discriminator for ClaimRewardEntry {
    const DISCRIMINATOR: &'static [u8] = &[0xe1, 0xbd, 0x9c, 0xb4, 0x30, 0x6a, 0x61, 0x1e];
}
impl InstructionData for ClaimRewardEntry {}

pub struct UpdateRewardEntryAccounts {
    pub reward_entry: Pubkey,
    pub reward_distributor: Pubkey,
    pub authority: Pubkey,
}

impl ToAccountMetas for UpdateRewardEntryAccounts {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.reward_entry, false),
            AccountMeta::new_readonly(self.reward_distributor, false),
            AccountMeta::new(self.authority, true),
        ]
    }
}

#[derive(AnchorSerialize)]
pub struct UpdateRewardEntry {
    pub multiplier: u64,
}

impl Discriminator for UpdateRewardEntry {
    const DISCRIMINATOR: &'static [u8] = &[0x66, 0x4c, 0xd4, 0xce, 0x65, 0xc2, 0xfa, 0x10];
}
impl InstructionData for UpdateRewardEntry {}

pub struct ReclaimFundsAccounts {
    pub reward_distributor: Pubkey,
    pub reward_distributor_token_account: Pubkey,
    pub authority_token_account: Pubkey,
    pub authority: Pubkey,
    pub token_program: Pubkey,
}

impl ToAccountMetas for ReclaimFundsAccounts {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new_readonly(self.reward_distributor, false),
            AccountMeta::new(self.reward_distributor_token_account, false),
            AccountMeta::new(self.authority_token_account, false),
            AccountMeta::new(self.authority, true),
            AccountMeta::new_readonly(self.token_program, false),
        ]
    }
}

#[derive(AnchorSerialize)]
pub struct ReclaimFunds {
    pub amount: u64,
}

impl Discriminator for ReclaimFunds {
    const DISCRIMINATOR: &'static [u8] = &[0x26, 0xf6, 0x93, 0xf8, 0x2b, 0x29, 0x2b, 0xc6];
}
impl InstructionData for ReclaimFunds {}

pub struct UpdateRewardDistributorAccounts {
    pub reward_distributor: Pubkey,
    pub authority: Pubkey,
}

impl ToAccountMetas for UpdateRewardDistributorAccounts {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.reward_distributor, false),
            AccountMeta::new(self.authority, true),
        ]
    }
}

#[derive(AnchorSerialize, Clone, Debug, PartialEq, Eq)]
pub struct UpdateRewardDistributorIx {
    pub default_multiplier: u64,
    pub multiplier_decimals: u8,
    pub reward_amount: u64,
    pub reward_duration_seconds: u128,
    pub max_reward_seconds_received: Option<u128>,
}

#[derive(AnchorSerialize)]
pub struct UpdateRewardDistributor {
    pub ix: UpdateRewardDistributorIx,
}

impl Discriminator for UpdateRewardDistributor {
    const DISCRIMINATOR: &'static [u8] = &[0xa8, 0x10, 0x39, 0xd2, 0xfa, 0xd6, 0x9b, 0x92];
}
impl InstructionData for UpdateRewardDistributor {}

//
// Builders
//

pub fn init_entry_instr(
    program: &PoolProgram,
    stake_pool: Pubkey,
    original_mint: Pubkey,
    staker: Option<Pubkey>,
) -> Result<Vec<Instruction>> {
    let instructions = program
        .request()
        .accounts(InitEntryAccounts {
            stake_entry: get_stake_entry_address(
                &program.id(),
                &stake_pool,
                &original_mint,
                staker.as_ref(),
            ),
            stake_pool,
            original_mint,
            original_mint_metadata: get_metadata_address(&original_mint),
            payer: program.payer(),
            system_program: system_program::id(),
        })
        .args(InitEntry {
            user: staker.unwrap_or_default(),
        })
        .instructions()?;
    Ok(instructions)
}

/// Creates the receipt mint of a stake entry. `stake_mint` is a fresh keypair
/// that must sign the transaction.
pub fn init_stake_mint_instr(
    program: &PoolProgram,
    stake_pool: Pubkey,
    stake_entry: Pubkey,
    original_mint: Pubkey,
    stake_mint: Pubkey,
    token_manager_program: Pubkey,
    pool_identifier: u64,
) -> Result<Vec<Instruction>> {
    let instructions = program
        .request()
        .accounts(InitStakeMintAccounts {
            stake_entry,
            stake_pool,
            original_mint,
            original_mint_metadata: get_metadata_address(&original_mint),
            stake_mint,
            stake_mint_metadata: get_metadata_address(&stake_mint),
            stake_entry_stake_mint_token_account: get_associated_token_address(
                &stake_entry,
                &stake_mint,
            ),
            mint_manager: get_mint_manager_address(&token_manager_program, &stake_mint),
            payer: program.payer(),
            rent: sysvar::rent::id(),
            token_program: spl_token::id(),
            token_manager_program,
            associated_token: spl_associated_token_account::id(),
            token_metadata_program: mpl_token_metadata::ID,
            system_program: system_program::id(),
        })
        .args(InitStakeMint {
            ix: InitStakeMintIx {
                name: format!("POOL{} RECEIPT", pool_identifier),
                symbol: format!("POOL{}", pool_identifier),
            },
        })
        .instructions()?;
    Ok(instructions)
}

/// Moves `amount` of the original mint into the stake entry's escrow,
/// creating the escrow token account first when needed.
pub fn stake_instr(
    program: &PoolProgram,
    stake_pool: Pubkey,
    stake_entry: Pubkey,
    original_mint: Pubkey,
    user_original_mint_token_account: Pubkey,
    amount: u64,
) -> Result<Vec<Instruction>> {
    let escrow = get_associated_token_address(&stake_entry, &original_mint);
    let mut instructions = vec![create_associated_token_account_idempotent(
        &program.payer(),
        &stake_entry,
        &original_mint,
        &spl_token::id(),
    )];
    let stake_ixs = program
        .request()
        .accounts(StakeAccounts {
            stake_entry,
            stake_pool,
            stake_entry_original_mint_token_account: escrow,
            original_mint,
            user: program.payer(),
            user_original_mint_token_account,
            token_program: spl_token::id(),
        })
        .args(Stake { amount })
        .instructions()?;
    instructions.extend(stake_ixs);
    Ok(instructions)
}

pub fn unstake_instr(
    program: &PoolProgram,
    stake_pool: Pubkey,
    stake_entry: Pubkey,
    original_mint: Pubkey,
) -> Result<Vec<Instruction>> {
    let user_token_account = get_associated_token_address(&program.payer(), &original_mint);
    let mut instructions = vec![create_associated_token_account_idempotent(
        &program.payer(),
        &program.payer(),
        &original_mint,
        &spl_token::id(),
    )];
    let unstake_ixs = program
        .request()
        .accounts(UnstakeAccounts {
            stake_pool,
            stake_entry,
            original_mint,
            stake_entry_original_mint_token_account: get_associated_token_address(
                &stake_entry,
                &original_mint,
            ),
            user: program.payer(),
            user_original_mint_token_account: user_token_account,
            token_program: spl_token::id(),
        })
        .args(Unstake {})
        .instructions()?;
    instructions.extend(unstake_ixs);
    Ok(instructions)
}

pub fn update_total_stake_seconds_instr(
    program: &PoolProgram,
    stake_entry: Pubkey,
) -> Result<Vec<Instruction>> {
    let instructions = program
        .request()
        .accounts(UpdateTotalStakeSecondsAccounts {
            stake_entry,
            last_staker: program.payer(),
        })
        .args(UpdateTotalStakeSeconds {})
        .instructions()?;
    Ok(instructions)
}

pub fn authorize_mint_instr(
    program: &PoolProgram,
    stake_pool: Pubkey,
    original_mint: Pubkey,
) -> Result<Vec<Instruction>> {
    let instructions = program
        .request()
        .accounts(AuthorizeStakeEntryAccounts {
            stake_pool,
            stake_authorization_record: get_stake_authorization_address(
                &program.id(),
                &stake_pool,
                &original_mint,
            ),
            payer: program.payer(),
            system_program: system_program::id(),
        })
        .args(AuthorizeStakeEntry { original_mint })
        .instructions()?;
    Ok(instructions)
}

pub fn update_pool_instr(
    program: &PoolProgram,
    stake_pool: Pubkey,
    ix: UpdatePoolIx,
) -> Result<Vec<Instruction>> {
    let instructions = program
        .request()
        .accounts(UpdatePoolAccounts {
            stake_pool,
            payer: program.payer(),
        })
        .args(UpdatePool { ix })
        .instructions()?;
    Ok(instructions)
}

pub fn init_reward_entry_instr(
    program: &PoolProgram,
    reward_distributor: Pubkey,
    stake_entry: Pubkey,
) -> Result<Vec<Instruction>> {
    let instructions = program
        .request()
        .accounts(InitRewardEntryAccounts {
            reward_entry: get_reward_entry_address(&program.id(), &reward_distributor, &stake_entry),
            stake_entry,
            reward_distributor,
            payer: program.payer(),
            system_program: system_program::id(),
        })
        .args(InitRewardEntry {})
        .instructions()?;
    Ok(instructions)
}

pub fn claim_reward_entry_instr(
    program: &PoolProgram,
    stake_pool: Pubkey,
    reward_distributor: Pubkey,
    reward_mint: Pubkey,
    stake_entry: Pubkey,
) -> Result<Vec<Instruction>> {
    let user_reward_mint_token_account =
        get_associated_token_address(&program.payer(), &reward_mint);
    let mut instructions = vec![create_associated_token_account_idempotent(
        &program.payer(),
        &program.payer(),
        &reward_mint,
        &spl_token::id(),
    )];
    let claim_ixs = program
        .request()
        .accounts(ClaimRewardEntryAccounts {
            reward_entry: get_reward_entry_address(&program.id(), &reward_distributor, &stake_entry),
            reward_distributor,
            stake_entry,
            stake_pool,
            reward_mint,
            user_reward_mint_token_account,
            reward_distributor_token_account: get_associated_token_address(
                &reward_distributor,
                &reward_mint,
            ),
            user: program.payer(),
            token_program: spl_token::id(),
            system_program: system_program::id(),
        })
        .args(ClaimRewardEntry {})
        .instructions()?;
    instructions.extend(claim_ixs);
    Ok(instructions)
}

pub fn update_reward_entry_instr(
    program: &PoolProgram,
    reward_distributor: Pubkey,
    stake_entry: Pubkey,
    multiplier: u64,
) -> Result<Vec<Instruction>> {
    let instructions = program
        .request()
        .accounts(UpdateRewardEntryAccounts {
            reward_entry: get_reward_entry_address(&program.id(), &reward_distributor, &stake_entry),
            reward_distributor,
            authority: program.payer(),
        })
        .args(UpdateRewardEntry { multiplier })
        .instructions()?;
    Ok(instructions)
}

pub fn reclaim_funds_instr(
    program: &PoolProgram,
    reward_distributor: Pubkey,
    reward_mint: Pubkey,
    amount: u64,
) -> Result<Vec<Instruction>> {
    let authority_token_account = get_associated_token_address(&program.payer(), &reward_mint);
    let mut instructions = vec![create_associated_token_account_idempotent(
        &program.payer(),
        &program.payer(),
        &reward_mint,
        &spl_token::id(),
    )];
    let reclaim_ixs = program
        .request()
        .accounts(ReclaimFundsAccounts {
            reward_distributor,
            reward_distributor_token_account: get_associated_token_address(
                &reward_distributor,
                &reward_mint,
            ),
            authority_token_account,
            authority: program.payer(),
            token_program: spl_token::id(),
        })
        .args(ReclaimFunds { amount })
        .instructions()?;
    instructions.extend(reclaim_ixs);
    Ok(instructions)
}

pub fn update_reward_distributor_instr(
    program: &PoolProgram,
    reward_distributor: Pubkey,
    ix: UpdateRewardDistributorIx,
) -> Result<Vec<Instruction>> {
    let instructions = program
        .request()
        .accounts(UpdateRewardDistributorAccounts {
            reward_distributor,
            authority: program.payer(),
        })
        .args(UpdateRewardDistributor { ix })
        .instructions()?;
    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_client::{Client, Cluster};
    use solana_sdk::signature::Signer;

    fn program(payer: &Rc<Keypair>) -> PoolProgram {
        let client = Client::new(Cluster::Localnet, payer.clone());
        client.program(Pubkey::new_unique()).unwrap()
    }

    #[test]
    fn stake_creates_escrow_then_stakes_amount() {
        let payer = Rc::new(Keypair::new());
        let program = program(&payer);
        let pool = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let entry = get_stake_entry_address(&program.id(), &pool, &mint, None);
        let ixs = stake_instr(&program, pool, entry, mint, Pubkey::new_unique(), 25).unwrap();

        assert_eq!(ixs.len(), 2);
        assert_eq!(ixs[0].program_id, spl_associated_token_account::id());
        let stake = &ixs[1];
        assert_eq!(stake.program_id, program.id());
        assert_eq!(&stake.data[..8], Stake::DISCRIMINATOR);
        assert_eq!(&stake.data[8..], &25u64.to_le_bytes());
        assert_eq!(stake.accounts[4].pubkey, payer.pubkey());
        assert!(stake.accounts[4].is_signer);
        assert_eq!(
            stake.accounts[2].pubkey,
            get_associated_token_address(&entry, &mint)
        );
    }

    #[test]
    fn init_entry_seeds_fungibles_with_staker() {
        let payer = Rc::new(Keypair::new());
        let program = program(&payer);
        let pool = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let ixs = init_entry_instr(&program, pool, mint, Some(payer.pubkey())).unwrap();
        assert_eq!(
            ixs[0].accounts[0].pubkey,
            get_stake_entry_address(&program.id(), &pool, &mint, Some(&payer.pubkey()))
        );
        assert_eq!(&ixs[0].data[8..], payer.pubkey().as_ref());
    }

    #[test]
    fn stake_mint_init_requires_the_mint_signature() {
        let payer = Rc::new(Keypair::new());
        let program = program(&payer);
        let pool = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let entry = get_stake_entry_address(&program.id(), &pool, &mint, None);
        let stake_mint = Keypair::new();
        let token_manager = Pubkey::new_unique();
        let ixs = init_stake_mint_instr(
            &program,
            pool,
            entry,
            mint,
            stake_mint.pubkey(),
            token_manager,
            7,
        )
        .unwrap();

        let ix = &ixs[0];
        assert_eq!(&ix.data[..8], InitStakeMint::DISCRIMINATOR);
        assert_eq!(ix.accounts[4].pubkey, stake_mint.pubkey());
        assert!(ix.accounts[4].is_signer);
        assert_eq!(
            ix.accounts[7].pubkey,
            get_mint_manager_address(&token_manager, &stake_mint.pubkey())
        );
        let args = InitStakeMintIx {
            name: "POOL7 RECEIPT".to_string(),
            symbol: "POOL7".to_string(),
        };
        let mut expected = Vec::new();
        args.serialize(&mut expected).unwrap();
        assert_eq!(&ix.data[8..], expected.as_slice());
    }

    #[test]
    fn multiplier_update_targets_reward_entry() {
        let payer = Rc::new(Keypair::new());
        let program = program(&payer);
        let distributor = Pubkey::new_unique();
        let entry = Pubkey::new_unique();
        let ixs = update_reward_entry_instr(&program, distributor, entry, 150).unwrap();
        assert_eq!(
            ixs[0].accounts[0].pubkey,
            get_reward_entry_address(&program.id(), &distributor, &entry)
        );
        assert_eq!(&ixs[0].data[8..], &150u64.to_le_bytes());
    }
}

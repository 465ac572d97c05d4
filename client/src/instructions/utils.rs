use anchor_lang::AccountDeserialize;
use anchor_spl::metadata::mpl_token_metadata::accounts::Metadata;
use anyhow::Result;
use solana_client::rpc_client::RpcClient;
use solana_sdk::{account::Account, pubkey::Pubkey};

use crate::token_data::MintInfo;

pub const STAKE_ENTRY_SEED: &str = "stake-entry";
pub const STAKE_AUTHORIZATION_SEED: &str = "stake-authorization";
pub const REWARD_DISTRIBUTOR_SEED: &str = "reward-distributor";
pub const REWARD_ENTRY_SEED: &str = "reward-entry";
pub const MINT_MANAGER_SEED: &str = "mint-manager";

pub fn deserialize_anchor_account<T: AccountDeserialize>(account: &Account) -> Result<T> {
    let mut data: &[u8] = &account.data;
    T::try_deserialize(&mut data).map_err(Into::into)
}

/// Loads and decodes an Anchor account, `None` when it does not exist yet.
pub fn fetch_anchor_account<T: AccountDeserialize>(
    rpc_client: &RpcClient,
    address: &Pubkey,
) -> Result<Option<T>> {
    let account = rpc_client
        .get_account_with_commitment(address, rpc_client.commitment())?
        .value;
    account
        .map(|account| deserialize_anchor_account(&account))
        .transpose()
}

/// Stake entries of fungible mints are per staker; non-fungible entries are
/// shared and seeded with the default key.
pub fn get_stake_entry_address(
    program_id: &Pubkey,
    stake_pool: &Pubkey,
    original_mint: &Pubkey,
    staker: Option<&Pubkey>,
) -> Pubkey {
    let staker = staker.copied().unwrap_or_default();
    let (stake_entry, _bump) = Pubkey::find_program_address(
        &[
            STAKE_ENTRY_SEED.as_bytes(),
            stake_pool.as_ref(),
            original_mint.as_ref(),
            staker.as_ref(),
        ],
        program_id,
    );
    stake_entry
}

/// The entry `staker` stakes `mint` into. Every reader and writer of stake
/// entries goes through here so they agree on the address.
pub fn get_mint_stake_entry_address(
    program_id: &Pubkey,
    stake_pool: &Pubkey,
    mint: &MintInfo,
    staker: &Pubkey,
) -> Pubkey {
    get_stake_entry_address(
        program_id,
        stake_pool,
        &mint.mint,
        mint.is_fungible().then_some(staker),
    )
}

pub fn get_stake_authorization_address(
    program_id: &Pubkey,
    stake_pool: &Pubkey,
    mint: &Pubkey,
) -> Pubkey {
    let (record, _bump) = Pubkey::find_program_address(
        &[
            STAKE_AUTHORIZATION_SEED.as_bytes(),
            stake_pool.as_ref(),
            mint.as_ref(),
        ],
        program_id,
    );
    record
}

pub fn get_reward_distributor_address(program_id: &Pubkey, stake_pool: &Pubkey) -> Pubkey {
    let (reward_distributor, _bump) = Pubkey::find_program_address(
        &[REWARD_DISTRIBUTOR_SEED.as_bytes(), stake_pool.as_ref()],
        program_id,
    );
    reward_distributor
}

pub fn get_reward_entry_address(
    program_id: &Pubkey,
    reward_distributor: &Pubkey,
    stake_entry: &Pubkey,
) -> Pubkey {
    let (reward_entry, _bump) = Pubkey::find_program_address(
        &[
            REWARD_ENTRY_SEED.as_bytes(),
            reward_distributor.as_ref(),
            stake_entry.as_ref(),
        ],
        program_id,
    );
    reward_entry
}

/// Token manager record that controls a receipt mint.
pub fn get_mint_manager_address(token_manager_program: &Pubkey, mint: &Pubkey) -> Pubkey {
    let (mint_manager, _bump) = Pubkey::find_program_address(
        &[MINT_MANAGER_SEED.as_bytes(), mint.as_ref()],
        token_manager_program,
    );
    mint_manager
}

pub fn get_metadata_address(mint: &Pubkey) -> Pubkey {
    Metadata::find_pda(mint).0
}

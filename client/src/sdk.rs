//! Transaction builders and the executor that signs and submits them.

use anchor_client::{Client, Cluster};
use anyhow::{format_err, Result};
use solana_client::rpc_client::RpcClient;
use solana_sdk::{
    instruction::Instruction,
    message::Message,
    program_pack::Pack,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use spl_associated_token_account::get_associated_token_address;
use std::rc::Rc;

use crate::config::ClientConfig;
use crate::instructions::accounts::{RewardDistributor, RewardEntry, StakeEntry, StakePool};
use crate::instructions::rpc::{get_token_balance, send_txn};
use crate::instructions::stake_pool_instructions::*;
use crate::instructions::utils::{
    fetch_anchor_account, get_mint_stake_entry_address, get_reward_distributor_address,
    get_reward_entry_address,
};
use crate::token_data::MintInfo;

/// Instructions plus any signers besides the wallet.
#[derive(Debug, Default)]
pub struct PreparedTransaction {
    pub instructions: Vec<Instruction>,
    pub signers: Vec<Keypair>,
}

impl PreparedTransaction {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions,
            signers: Vec::new(),
        }
    }

    pub fn with_signers(instructions: Vec<Instruction>, signers: Vec<Keypair>) -> Self {
        Self {
            instructions,
            signers,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Builds the pool program transactions. Implementations may read chain state
/// but never submit anything. The stake entry of a mint is always resolved
/// from the mint's on-chain supply and decimals.
pub trait StakingSdk {
    /// Creates the stake entry and its receipt mint when they do not exist
    /// yet. A new receipt mint keypair is returned among the signers. The
    /// result is empty when nothing is needed.
    fn create_stake_entry_and_stake_mint(
        &self,
        stake_pool: &Pubkey,
        original_mint: &Pubkey,
    ) -> Result<PreparedTransaction>;

    /// `amount` of `None` stakes the whole token account balance.
    fn stake(
        &self,
        stake_pool: &Pubkey,
        original_mint: &Pubkey,
        user_token_account: &Pubkey,
        amount: Option<u64>,
    ) -> Result<PreparedTransaction>;

    fn unstake(&self, stake_pool: &Pubkey, original_mint: &Pubkey) -> Result<PreparedTransaction>;

    fn claim_rewards(
        &self,
        stake_pool: &Pubkey,
        original_mint: &Pubkey,
    ) -> Result<PreparedTransaction>;

    fn authorize_mints(&self, stake_pool: &Pubkey, mints: &[Pubkey]) -> Result<PreparedTransaction>;

    /// `multipliers` pairs a mint with its multiplier scaled by the
    /// distributor's multiplier decimals.
    fn set_multipliers(
        &self,
        stake_pool: &Pubkey,
        multipliers: &[(Pubkey, u64)],
    ) -> Result<PreparedTransaction>;

    fn update_pool(
        &self,
        stake_pool: &Pubkey,
        pool: UpdatePoolIx,
        reward_distributor: Option<UpdateRewardDistributorIx>,
    ) -> Result<PreparedTransaction>;

    fn reclaim_funds(&self, stake_pool: &Pubkey, amount: u64) -> Result<PreparedTransaction>;
}

pub trait TransactionExecutor {
    fn execute(&self, transaction: &PreparedTransaction) -> Result<Signature>;
}

/// Signs with the wallet and any extra signers, then submits and waits for
/// confirmation.
pub struct RpcExecutor {
    rpc_client: Rc<RpcClient>,
    payer: Rc<Keypair>,
}

impl RpcExecutor {
    pub fn new(rpc_client: Rc<RpcClient>, payer: Rc<Keypair>) -> Self {
        Self { rpc_client, payer }
    }
}

impl TransactionExecutor for RpcExecutor {
    fn execute(&self, transaction: &PreparedTransaction) -> Result<Signature> {
        let mut signers: Vec<&dyn Signer> = vec![self.payer.as_ref()];
        signers.extend(transaction.signers.iter().map(|signer| signer as &dyn Signer));
        let message = Message::new(&transaction.instructions, Some(&self.payer.pubkey()));
        let mut txn = Transaction::new_unsigned(message);
        let recent_hash = self.rpc_client.get_latest_blockhash()?;
        txn.try_sign(&signers, recent_hash)?;
        send_txn(&self.rpc_client, &txn, true)
    }
}

/// [`StakingSdk`] backed by `anchor-client` request builders.
pub struct AnchorStakingSdk {
    rpc_client: Rc<RpcClient>,
    stake_pool_program: PoolProgram,
    reward_distributor_program: PoolProgram,
    token_manager_program: Pubkey,
}

impl AnchorStakingSdk {
    pub fn new(config: &ClientConfig, payer: Rc<Keypair>, rpc_client: Rc<RpcClient>) -> Result<Self> {
        let url = Cluster::Custom(config.http_url.clone(), config.ws_url.clone());
        let client = Client::new(url, payer);
        Ok(Self {
            rpc_client,
            stake_pool_program: client.program(config.stake_pool_program)?,
            reward_distributor_program: client.program(config.reward_distributor_program)?,
            token_manager_program: config.token_manager_program,
        })
    }

    fn wallet(&self) -> Pubkey {
        self.stake_pool_program.payer()
    }

    fn mint_info(&self, mint: &Pubkey) -> Result<MintInfo> {
        let account = self.rpc_client.get_account(mint)?;
        let state = spl_token::state::Mint::unpack(&account.data)?;
        Ok(MintInfo {
            mint: *mint,
            decimals: state.decimals,
            supply: state.supply,
            token_list_data: None,
        })
    }

    fn stake_entry_address(&self, stake_pool: &Pubkey, mint: &MintInfo) -> Pubkey {
        get_mint_stake_entry_address(&self.stake_pool_program.id(), stake_pool, mint, &self.wallet())
    }

    fn resolve_stake_entry(&self, stake_pool: &Pubkey, original_mint: &Pubkey) -> Result<Pubkey> {
        let mint = self.mint_info(original_mint)?;
        Ok(self.stake_entry_address(stake_pool, &mint))
    }

    /// Entry creation for `mint` when its stake entry is missing.
    fn init_entry_if_missing(
        &self,
        stake_pool: &Pubkey,
        mint: &MintInfo,
        existing: Option<&StakeEntry>,
    ) -> Result<Vec<Instruction>> {
        if existing.is_some() {
            return Ok(Vec::new());
        }
        let staker = mint.is_fungible().then(|| self.wallet());
        init_entry_instr(&self.stake_pool_program, *stake_pool, mint.mint, staker)
    }

    fn find_reward_distributor(&self, stake_pool: &Pubkey) -> Result<Option<(Pubkey, RewardDistributor)>> {
        let address =
            get_reward_distributor_address(&self.reward_distributor_program.id(), stake_pool);
        Ok(fetch_anchor_account::<RewardDistributor>(&self.rpc_client, &address)?
            .map(|distributor| (address, distributor)))
    }

    fn reward_distributor(&self, stake_pool: &Pubkey) -> Result<(Pubkey, RewardDistributor)> {
        self.find_reward_distributor(stake_pool)?
            .ok_or_else(|| format_err!("No reward distributor found for pool {}", stake_pool))
    }

    fn init_reward_entry_if_missing(
        &self,
        reward_distributor: &Pubkey,
        stake_entry: &Pubkey,
    ) -> Result<Vec<Instruction>> {
        let reward_entry = get_reward_entry_address(
            &self.reward_distributor_program.id(),
            reward_distributor,
            stake_entry,
        );
        if fetch_anchor_account::<RewardEntry>(&self.rpc_client, &reward_entry)?.is_some() {
            return Ok(Vec::new());
        }
        init_reward_entry_instr(&self.reward_distributor_program, *reward_distributor, *stake_entry)
    }
}

impl StakingSdk for AnchorStakingSdk {
    fn create_stake_entry_and_stake_mint(
        &self,
        stake_pool: &Pubkey,
        original_mint: &Pubkey,
    ) -> Result<PreparedTransaction> {
        let mint = self.mint_info(original_mint)?;
        let stake_entry = self.stake_entry_address(stake_pool, &mint);
        let existing = fetch_anchor_account::<StakeEntry>(&self.rpc_client, &stake_entry)?;
        let mut instructions = self.init_entry_if_missing(stake_pool, &mint, existing.as_ref())?;

        // Receipt mints only exist for shared, non-fungible entries.
        let has_stake_mint = existing.as_ref().map_or(false, |entry| entry.stake_mint.is_some());
        if mint.is_fungible() || has_stake_mint {
            return Ok(PreparedTransaction::new(instructions));
        }
        let pool = fetch_anchor_account::<StakePool>(&self.rpc_client, stake_pool)?
            .ok_or_else(|| format_err!("Stake pool {} not found", stake_pool))?;
        let stake_mint = Keypair::new();
        instructions.extend(init_stake_mint_instr(
            &self.stake_pool_program,
            *stake_pool,
            stake_entry,
            *original_mint,
            stake_mint.pubkey(),
            self.token_manager_program,
            pool.identifier,
        )?);
        Ok(PreparedTransaction::with_signers(instructions, vec![stake_mint]))
    }

    fn stake(
        &self,
        stake_pool: &Pubkey,
        original_mint: &Pubkey,
        user_token_account: &Pubkey,
        amount: Option<u64>,
    ) -> Result<PreparedTransaction> {
        let amount = match amount {
            Some(amount) => amount,
            None => get_token_balance(&self.rpc_client, user_token_account)?,
        };
        let stake_entry = self.resolve_stake_entry(stake_pool, original_mint)?;
        let instructions = stake_instr(
            &self.stake_pool_program,
            *stake_pool,
            stake_entry,
            *original_mint,
            *user_token_account,
            amount,
        )?;
        Ok(PreparedTransaction::new(instructions))
    }

    fn unstake(&self, stake_pool: &Pubkey, original_mint: &Pubkey) -> Result<PreparedTransaction> {
        let stake_entry = self.resolve_stake_entry(stake_pool, original_mint)?;
        let mut instructions = Vec::new();
        // Accrue rewards before the entry leaves the pool.
        if let Some((distributor, _)) = self.find_reward_distributor(stake_pool)? {
            instructions.extend(self.init_reward_entry_if_missing(&distributor, &stake_entry)?);
        }
        instructions.extend(unstake_instr(
            &self.stake_pool_program,
            *stake_pool,
            stake_entry,
            *original_mint,
        )?);
        Ok(PreparedTransaction::new(instructions))
    }

    fn claim_rewards(
        &self,
        stake_pool: &Pubkey,
        original_mint: &Pubkey,
    ) -> Result<PreparedTransaction> {
        let stake_entry = self.resolve_stake_entry(stake_pool, original_mint)?;
        let (distributor, distributor_account) = self.reward_distributor(stake_pool)?;
        let mut instructions = self.init_reward_entry_if_missing(&distributor, &stake_entry)?;
        instructions.extend(update_total_stake_seconds_instr(
            &self.stake_pool_program,
            stake_entry,
        )?);
        instructions.extend(claim_reward_entry_instr(
            &self.reward_distributor_program,
            *stake_pool,
            distributor,
            distributor_account.reward_mint,
            stake_entry,
        )?);
        Ok(PreparedTransaction::new(instructions))
    }

    fn authorize_mints(&self, stake_pool: &Pubkey, mints: &[Pubkey]) -> Result<PreparedTransaction> {
        let mut instructions = Vec::new();
        for mint in mints {
            instructions.extend(authorize_mint_instr(
                &self.stake_pool_program,
                *stake_pool,
                *mint,
            )?);
        }
        Ok(PreparedTransaction::new(instructions))
    }

    fn set_multipliers(
        &self,
        stake_pool: &Pubkey,
        multipliers: &[(Pubkey, u64)],
    ) -> Result<PreparedTransaction> {
        let (distributor, _) = self.reward_distributor(stake_pool)?;
        let mut instructions = Vec::new();
        for (mint, multiplier) in multipliers {
            let mint_info = self.mint_info(mint)?;
            let stake_entry = self.stake_entry_address(stake_pool, &mint_info);
            let existing = fetch_anchor_account::<StakeEntry>(&self.rpc_client, &stake_entry)?;
            instructions.extend(self.init_entry_if_missing(stake_pool, &mint_info, existing.as_ref())?);
            instructions.extend(self.init_reward_entry_if_missing(&distributor, &stake_entry)?);
            instructions.extend(update_reward_entry_instr(
                &self.reward_distributor_program,
                distributor,
                stake_entry,
                *multiplier,
            )?);
        }
        Ok(PreparedTransaction::new(instructions))
    }

    fn update_pool(
        &self,
        stake_pool: &Pubkey,
        pool: UpdatePoolIx,
        reward_distributor: Option<UpdateRewardDistributorIx>,
    ) -> Result<PreparedTransaction> {
        let mut instructions = update_pool_instr(&self.stake_pool_program, *stake_pool, pool)?;
        if let Some(ix) = reward_distributor {
            let distributor =
                get_reward_distributor_address(&self.reward_distributor_program.id(), stake_pool);
            instructions.extend(update_reward_distributor_instr(
                &self.reward_distributor_program,
                distributor,
                ix,
            )?);
        }
        Ok(PreparedTransaction::new(instructions))
    }

    fn reclaim_funds(&self, stake_pool: &Pubkey, amount: u64) -> Result<PreparedTransaction> {
        let (distributor, distributor_account) = self.reward_distributor(stake_pool)?;
        let available = get_token_balance(
            &self.rpc_client,
            &get_associated_token_address(&distributor, &distributor_account.reward_mint),
        )?;
        if amount > available {
            return Err(format_err!(
                "Reclaim amount {} exceeds distributor balance {}",
                amount,
                available
            ));
        }
        let instructions = reclaim_funds_instr(
            &self.reward_distributor_program,
            distributor,
            distributor_account.reward_mint,
            amount,
        )?;
        Ok(PreparedTransaction::new(instructions))
    }
}

use anyhow::Result;
use solana_client::{rpc_client::RpcClient, rpc_config::RpcSendTransactionConfig};
use solana_sdk::{
    commitment_config::CommitmentConfig, program_pack::Pack, pubkey::Pubkey,
    signature::Signature, transaction::Transaction,
};

pub fn send_txn(client: &RpcClient, txn: &Transaction, wait_confirm: bool) -> Result<Signature> {
    Ok(client.send_and_confirm_transaction_with_spinner_and_config(
        txn,
        if wait_confirm {
            CommitmentConfig::confirmed()
        } else {
            CommitmentConfig::processed()
        },
        RpcSendTransactionConfig {
            skip_preflight: false,
            ..RpcSendTransactionConfig::default()
        },
    )?)
}

/// Balance of an SPL token account in raw units, zero when it does not exist.
pub fn get_token_balance(client: &RpcClient, token_account: &Pubkey) -> Result<u64> {
    let account = client
        .get_account_with_commitment(token_account, client.commitment())?
        .value;
    match account {
        Some(account) => Ok(spl_token::state::Account::unpack(&account.data)?.amount),
        None => Ok(0),
    }
}

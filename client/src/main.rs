use anyhow::{format_err, Result};
use clap::Parser;
use solana_client::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;
use std::rc::Rc;
use std::str::FromStr;

mod admin;
mod batch;
mod cache;
mod config;
mod data;
mod instructions;
mod notify;
mod rewards;
mod sdk;
mod selection;
mod token_data;
mod units;
mod view;
mod wallet;

use admin::{parse_multiplier, Admin, PoolUpdate, ReclaimAmount};
use batch::{BatchPolicy, BatchReport, BatchRunner, WalletSession};
use config::{load_cfg, load_token_list};
use data::{PoolData, RpcDataSource};
use notify::{ConsoleNotifier, Notification, Notifier};
use sdk::{AnchorStakingSdk, RpcExecutor};
use selection::Selection;
use wallet::WalletContext;

#[derive(Debug, Parser)]
pub struct Opts {
    #[arg(long, default_value = "client_config.ini")]
    pub config: String,
    /// Overrides `stake_pool` from the config file.
    #[arg(long)]
    pub pool: Option<Pubkey>,
    #[clap(subcommand)]
    pub command: StakePoolCommands,
}

#[derive(Debug, Parser)]
pub enum StakePoolCommands {
    /// Pool totals, reward rate and earnings.
    Pool {},
    /// Wallet tokens the pool accepts.
    Tokens {
        /// List fungible tokens instead of NFTs.
        #[arg(long)]
        fungible: bool,
    },
    /// Tokens the wallet has staked in the pool.
    Staked {},
    /// Stakes wallet tokens given as MINT or MINT:AMOUNT.
    Stake {
        #[arg(required = true)]
        tokens: Vec<String>,
        /// Continue with the remaining tokens after a failure.
        #[arg(long)]
        keep_going: bool,
    },
    Unstake {
        #[arg(required = true)]
        mints: Vec<Pubkey>,
        #[arg(long)]
        keep_going: bool,
    },
    ClaimRewards {
        #[arg(required = true)]
        mints: Vec<Pubkey>,
    },
    #[clap(subcommand)]
    Admin(AdminCommands),
}

#[derive(Debug, Parser)]
pub enum AdminCommands {
    Show {},
    AuthorizeMints {
        /// Comma separated mint addresses.
        #[arg(long)]
        mints: String,
    },
    SetMultipliers {
        /// MINT=MULTIPLIER pairs, multipliers scaled by the multiplier decimals.
        #[arg(required = true)]
        pairs: Vec<String>,
    },
    LookupMultiplier {
        mint: String,
    },
    UpdatePool {
        #[arg(long)]
        overlay_text: Option<String>,
        #[arg(long)]
        image_uri: Option<String>,
        #[arg(long, value_delimiter = ',')]
        requires_collections: Option<Vec<Pubkey>>,
        #[arg(long, value_delimiter = ',')]
        requires_creators: Option<Vec<Pubkey>>,
        #[arg(long)]
        requires_authorization: Option<bool>,
        #[arg(long)]
        authority: Option<Pubkey>,
        #[arg(long)]
        reset_on_stake: Option<bool>,
        #[arg(long)]
        cooldown_seconds: Option<u32>,
        #[arg(long)]
        min_stake_seconds: Option<u32>,
        #[arg(long)]
        end_date: Option<i64>,
        #[arg(long)]
        reward_amount: Option<String>,
        #[arg(long)]
        reward_duration_seconds: Option<u128>,
        #[arg(long)]
        default_multiplier: Option<u64>,
        #[arg(long)]
        multiplier_decimals: Option<u8>,
        #[arg(long)]
        max_reward_seconds_received: Option<u128>,
    },
    ReclaimFunds {
        /// Amount in reward tokens, or `max`.
        amount: String,
    },
}

/// Splits `MINT[:AMOUNT]`.
fn parse_stake_arg(arg: &str) -> Result<(Pubkey, Option<String>)> {
    let (mint, amount) = match arg.split_once(':') {
        Some((mint, amount)) => (mint, Some(amount.trim().to_string())),
        None => (arg, None),
    };
    let mint = Pubkey::from_str(mint.trim()).map_err(|_| format_err!("Invalid mint: {}", mint))?;
    Ok((mint, amount.filter(|amount| !amount.is_empty())))
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

fn finish(report: BatchReport) -> Result<()> {
    if let Some(reason) = &report.aborted {
        return Err(format_err!("{} aborted: {}", report.action, reason));
    }
    println!(
        "{}: {}/{} succeeded",
        report.action,
        report.succeeded(),
        report.total
    );
    if !report.is_success() {
        return Err(format_err!("{} finished with {} failure(s)", report.action, report.failed()));
    }
    Ok(())
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    let client_config = load_cfg(&opts.config)?;
    let stake_pool = opts
        .pool
        .or(client_config.stake_pool)
        .ok_or_else(|| format_err!("stake_pool must be set in the config or with --pool"))?;
    let wallet = WalletContext::load(client_config.payer_path.as_deref())?;
    // solana rpc client
    let rpc_client = Rc::new(RpcClient::new(client_config.http_url.to_string()));
    let token_list = match &client_config.token_list_path {
        Some(path) => load_token_list(path)?,
        None => Vec::new(),
    };

    let source = RpcDataSource::new(
        rpc_client.clone(),
        client_config.stake_pool_program,
        client_config.reward_distributor_program,
        token_list,
    );
    let mut data = PoolData::new(source, wallet.public_key(), stake_pool);
    data.load_all();

    // anchor client, only with a wallet to sign.
    let sdk = wallet
        .signer()
        .map(|payer| AnchorStakingSdk::new(&client_config, payer, rpc_client.clone()))
        .transpose()?;
    let executor = wallet
        .signer()
        .map(|payer| RpcExecutor::new(rpc_client.clone(), payer));
    let session = match (wallet.public_key(), &sdk, &executor) {
        (Some(wallet), Some(sdk), Some(executor)) => Some(WalletSession {
            wallet,
            sdk,
            executor,
        }),
        _ => None,
    };
    let mut notifier = ConsoleNotifier;

    match opts.command {
        StakePoolCommands::Pool {} => {
            print_lines(view::pool_summary(&data, client_config.max_staked));
        }
        StakePoolCommands::Tokens { fungible } => {
            print_lines(view::wallet_tokens(
                wallet.connected(),
                &data.wallet_tokens,
                data.pool(),
                fungible,
            ));
        }
        StakePoolCommands::Staked {} => {
            print_lines(view::staked_tokens(
                wallet.connected(),
                &data.staked_tokens,
                data.rewards.data().and_then(Option::as_ref),
                data.reward_mint_info.data().and_then(Option::as_ref),
            ));
        }
        StakePoolCommands::Stake { tokens, keep_going } => {
            let wallet_tokens = data.wallet_tokens.data().cloned().unwrap_or_default();
            let mut selection = Selection::new();
            for arg in &tokens {
                let (mint, amount) = parse_stake_arg(arg)?;
                let token = wallet_tokens.iter().find(|token| {
                    token.token_account.as_ref().map(|account| account.mint) == Some(mint)
                });
                match token {
                    Some(token) => selection.toggle_unstaked(token, amount.as_deref(), &mut notifier),
                    None => notifier.notify(Notification::error(format!(
                        "Token {} not found in wallet",
                        mint
                    ))),
                }
            }
            let policy = if keep_going {
                BatchPolicy::ContinueOnFailure
            } else {
                BatchPolicy::StopOnFirstFailure
            };
            let pool = data.pool().cloned();
            let settle_delay = client_config.settle_delay;
            let report = BatchRunner::new(session, pool, &mut notifier, &mut data, settle_delay)
                .stake(&mut selection, &wallet_tokens, policy);
            finish(report)?;
        }
        StakePoolCommands::Unstake { mints, keep_going } => {
            let staked_tokens = data.staked_tokens.data().cloned().unwrap_or_default();
            let mut selection = select_staked(&staked_tokens, &mints, &mut notifier);
            let policy = if keep_going {
                BatchPolicy::ContinueOnFailure
            } else {
                BatchPolicy::StopOnFirstFailure
            };
            let pool = data.pool().cloned();
            let settle_delay = client_config.settle_delay;
            let report = BatchRunner::new(session, pool, &mut notifier, &mut data, settle_delay)
                .unstake(&mut selection, &staked_tokens, policy);
            finish(report)?;
        }
        StakePoolCommands::ClaimRewards { mints } => {
            let staked_tokens = data.staked_tokens.data().cloned().unwrap_or_default();
            let mut selection = select_staked(&staked_tokens, &mints, &mut notifier);
            let pool = data.pool().cloned();
            let settle_delay = client_config.settle_delay;
            let report = BatchRunner::new(session, pool, &mut notifier, &mut data, settle_delay)
                .claim_rewards(&mut selection, &staked_tokens);
            finish(report)?;
        }
        StakePoolCommands::Admin(command) => {
            let mut admin = Admin::new(
                session,
                data.pool().cloned(),
                data.distributor().cloned(),
                data.reward_mint_info.data().cloned().flatten(),
                data.source(),
                &mut notifier,
            );
            match command {
                AdminCommands::Show {} => {
                    print_lines(admin.show_pool_parameters(&client_config.cluster));
                }
                AdminCommands::AuthorizeMints { mints } => {
                    admin.authorize_mints(&mints)?;
                }
                AdminCommands::SetMultipliers { pairs } => {
                    let multipliers = pairs
                        .iter()
                        .map(|pair| parse_multiplier(pair))
                        .collect::<Result<Vec<_>>>()?;
                    admin.set_multipliers(&multipliers)?;
                }
                AdminCommands::LookupMultiplier { mint } => {
                    let multiplier = admin.lookup_multiplier(&mint)?;
                    println!("{}x", multiplier);
                }
                AdminCommands::UpdatePool {
                    overlay_text,
                    image_uri,
                    requires_collections,
                    requires_creators,
                    requires_authorization,
                    authority,
                    reset_on_stake,
                    cooldown_seconds,
                    min_stake_seconds,
                    end_date,
                    reward_amount,
                    reward_duration_seconds,
                    default_multiplier,
                    multiplier_decimals,
                    max_reward_seconds_received,
                } => {
                    let update = PoolUpdate {
                        overlay_text,
                        image_uri,
                        requires_collections,
                        requires_creators,
                        requires_authorization,
                        authority,
                        reset_on_stake,
                        cooldown_seconds,
                        min_stake_seconds,
                        end_date,
                        reward_amount,
                        reward_duration_seconds,
                        default_multiplier,
                        multiplier_decimals,
                        max_reward_seconds_received,
                    };
                    admin.update_pool(&update)?;
                }
                AdminCommands::ReclaimFunds { amount } => {
                    let amount = amount.parse::<ReclaimAmount>()?;
                    admin.reclaim_funds(&amount)?;
                }
            }
        }
    }
    Ok(())
}

fn select_staked(
    staked_tokens: &[token_data::TokenData],
    mints: &[Pubkey],
    notifier: &mut dyn Notifier,
) -> Selection {
    let mut selection = Selection::new();
    for mint in mints {
        let token = staked_tokens.iter().find(|token| {
            token
                .stake_entry
                .as_ref()
                .map_or(false, |entry| &entry.original_mint == mint)
        });
        match token {
            Some(token) => {
                selection.toggle_staked(token);
            }
            None => notifier.notify(Notification::error(format!(
                "No stake entry for token {}",
                mint
            ))),
        }
    }
    selection
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stake_args() {
        let mint = Pubkey::new_unique();
        assert_eq!(parse_stake_arg(&mint.to_string()).unwrap(), (mint, None));
        assert_eq!(
            parse_stake_arg(&format!("{}:2.5", mint)).unwrap(),
            (mint, Some("2.5".to_string()))
        );
        assert_eq!(parse_stake_arg(&format!("{}:", mint)).unwrap(), (mint, None));
        assert!(parse_stake_arg("not-a-mint:1").is_err());
    }

    #[test]
    fn cli_parses() {
        let mint = Pubkey::new_unique();
        let mint_arg = mint.to_string();
        let opts = Opts::try_parse_from([
            "stake-pool-client",
            "--pool",
            mint_arg.as_str(),
            "unstake",
            mint_arg.as_str(),
            "--keep-going",
        ])
        .unwrap();
        assert_eq!(opts.pool, Some(mint));
        assert!(matches!(
            opts.command,
            StakePoolCommands::Unstake { keep_going: true, .. }
        ));
        assert!(Opts::try_parse_from(["stake-pool-client", "claim-rewards"]).is_err());
    }
}

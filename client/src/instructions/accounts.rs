//! Client-side mirrors of the pool program accounts the client reads.
//!
//! Only the fields needed for display and instruction building are decoded;
//! trailing bytes are ignored.

use anchor_lang::error::ErrorCode;
use anchor_lang::prelude::{borsh, AnchorDeserialize, Pubkey};
use anchor_lang::AccountDeserialize;
use anchor_spl::metadata::mpl_token_metadata::accounts::Metadata;
use anyhow::Result;

use crate::token_data::{
    Collection, Creator, NftMetadata, RewardDistributorData, RewardDistributorKind,
    RewardEntryData, StakeEntryData, StakePoolData,
};

pub const STAKE_POOL_DISCRIMINATOR: [u8; 8] = [0x79, 0x22, 0xce, 0x15, 0x4f, 0x7f, 0xff, 0x1c];
pub const STAKE_ENTRY_DISCRIMINATOR: [u8; 8] = [0xbb, 0x7f, 0x09, 0x23, 0x9b, 0x44, 0x56, 0x28];
pub const REWARD_DISTRIBUTOR_DISCRIMINATOR: [u8; 8] =
    [0xd7, 0x0a, 0xd9, 0xc7, 0x68, 0xc2, 0x61, 0xe3];
pub const REWARD_ENTRY_DISCRIMINATOR: [u8; 8] = [0xd0, 0xbf, 0xad, 0x0e, 0xd5, 0x54, 0xb3, 0xa2];
pub const STAKE_AUTHORIZATION_DISCRIMINATOR: [u8; 8] =
    [0x24, 0x36, 0x30, 0x07, 0xe0, 0xc1, 0xcf, 0x4c];

/// Byte offset of `StakeEntry::pool`, for `getProgramAccounts` filters.
pub const STAKE_ENTRY_POOL_OFFSET: usize = 8 + 1;
/// Byte offset of `StakeEntry::last_staker`.
pub const STAKE_ENTRY_LAST_STAKER_OFFSET: usize = 8 + 1 + 32 + 8 + 32 + 1;

fn decode<T: AnchorDeserialize>(discriminator: &[u8; 8], buf: &mut &[u8]) -> anchor_lang::Result<T> {
    if buf.len() < discriminator.len() {
        return Err(ErrorCode::AccountDiscriminatorNotFound.into());
    }
    if &buf[..8] != discriminator {
        return Err(ErrorCode::AccountDiscriminatorMismatch.into());
    }
    let mut data: &[u8] = &buf[8..];
    T::deserialize(&mut data).map_err(|_| ErrorCode::AccountDidNotDeserialize.into())
}

#[derive(AnchorDeserialize, Clone, Debug)]
pub struct StakePool {
    pub bump: u8,
    pub identifier: u64,
    pub authority: Pubkey,
    pub requires_creators: Vec<Pubkey>,
    pub requires_collections: Vec<Pubkey>,
    pub requires_authorization: bool,
    pub overlay_text: String,
    pub image_uri: String,
    pub reset_on_stake: bool,
    pub total_staked: u32,
    pub cooldown_seconds: Option<u32>,
    pub min_stake_seconds: Option<u32>,
    pub end_date: Option<i64>,
}

impl AccountDeserialize for StakePool {
    fn try_deserialize_unchecked(buf: &mut &[u8]) -> anchor_lang::Result<Self> {
        decode(&STAKE_POOL_DISCRIMINATOR, buf)
    }
}

impl StakePool {
    pub fn into_data(self, pubkey: Pubkey) -> StakePoolData {
        StakePoolData {
            pubkey,
            identifier: self.identifier,
            authority: self.authority,
            requires_creators: self.requires_creators,
            requires_collections: self.requires_collections,
            requires_authorization: self.requires_authorization,
            overlay_text: self.overlay_text,
            image_uri: self.image_uri,
            reset_on_stake: self.reset_on_stake,
            total_staked: self.total_staked,
            cooldown_seconds: self.cooldown_seconds,
            min_stake_seconds: self.min_stake_seconds,
            end_date: self.end_date,
        }
    }
}

#[derive(AnchorDeserialize, Clone, Debug)]
pub struct StakeEntry {
    pub bump: u8,
    pub pool: Pubkey,
    pub amount: u64,
    pub original_mint: Pubkey,
    pub original_mint_claimed: bool,
    pub last_staker: Pubkey,
    pub last_staked_at: i64,
    pub total_stake_seconds: u128,
    pub stake_mint_claimed: bool,
    pub kind: u8,
    pub stake_mint: Option<Pubkey>,
    pub cooldown_start_seconds: Option<i64>,
}

impl AccountDeserialize for StakeEntry {
    fn try_deserialize_unchecked(buf: &mut &[u8]) -> anchor_lang::Result<Self> {
        decode(&STAKE_ENTRY_DISCRIMINATOR, buf)
    }
}

impl StakeEntry {
    pub fn into_data(self, pubkey: Pubkey) -> StakeEntryData {
        StakeEntryData {
            pubkey,
            pool: self.pool,
            original_mint: self.original_mint,
            amount: self.amount,
            last_staker: self.last_staker,
            last_staked_at: self.last_staked_at,
            total_stake_seconds: self.total_stake_seconds,
            cooldown_start_seconds: self.cooldown_start_seconds,
        }
    }
}

#[derive(AnchorDeserialize, Clone, Debug)]
pub struct RewardDistributor {
    pub bump: u8,
    pub stake_pool: Pubkey,
    pub kind: u8,
    pub authority: Pubkey,
    pub reward_mint: Pubkey,
    pub reward_amount: u64,
    pub reward_duration_seconds: u128,
    pub rewards_issued: u128,
    pub max_supply: Option<u64>,
    pub default_multiplier: u64,
    pub multiplier_decimals: u8,
    pub max_reward_seconds_received: Option<u128>,
}

impl AccountDeserialize for RewardDistributor {
    fn try_deserialize_unchecked(buf: &mut &[u8]) -> anchor_lang::Result<Self> {
        decode(&REWARD_DISTRIBUTOR_DISCRIMINATOR, buf)
    }
}

impl RewardDistributor {
    pub fn into_data(self, pubkey: Pubkey) -> RewardDistributorData {
        RewardDistributorData {
            pubkey,
            stake_pool: self.stake_pool,
            kind: if self.kind == 1 {
                RewardDistributorKind::Treasury
            } else {
                RewardDistributorKind::Mint
            },
            authority: self.authority,
            reward_mint: self.reward_mint,
            reward_amount: self.reward_amount,
            reward_duration_seconds: self.reward_duration_seconds,
            rewards_issued: self.rewards_issued,
            max_supply: self.max_supply,
            default_multiplier: self.default_multiplier,
            multiplier_decimals: self.multiplier_decimals,
            max_reward_seconds_received: self.max_reward_seconds_received,
        }
    }
}

#[derive(AnchorDeserialize, Clone, Debug)]
pub struct RewardEntry {
    pub bump: u8,
    pub stake_entry: Pubkey,
    pub reward_distributor: Pubkey,
    pub reward_seconds_received: u128,
    pub multiplier: u64,
}

impl AccountDeserialize for RewardEntry {
    fn try_deserialize_unchecked(buf: &mut &[u8]) -> anchor_lang::Result<Self> {
        decode(&REWARD_ENTRY_DISCRIMINATOR, buf)
    }
}

impl RewardEntry {
    pub fn into_data(self, pubkey: Pubkey) -> RewardEntryData {
        RewardEntryData {
            pubkey,
            stake_entry: self.stake_entry,
            reward_distributor: self.reward_distributor,
            reward_seconds_received: self.reward_seconds_received,
            multiplier: self.multiplier,
        }
    }
}

#[derive(AnchorDeserialize, Clone, Debug)]
pub struct StakeAuthorizationRecord {
    pub bump: u8,
    pub pool: Pubkey,
    pub mint: Pubkey,
}

impl AccountDeserialize for StakeAuthorizationRecord {
    fn try_deserialize_unchecked(buf: &mut &[u8]) -> anchor_lang::Result<Self> {
        decode(&STAKE_AUTHORIZATION_DISCRIMINATOR, buf)
    }
}

/// Decodes a Metaplex metadata account into the fields the allow-list reads.
pub fn decode_metadata(data: &[u8]) -> Result<NftMetadata> {
    let metadata = Metadata::from_bytes(data)?;
    // Metadata strings are padded with NULs to fixed lengths.
    let clean = |value: String| value.trim_end_matches('\0').trim().to_string();
    Ok(NftMetadata {
        name: clean(metadata.name),
        symbol: clean(metadata.symbol),
        uri: clean(metadata.uri),
        creators: metadata
            .creators
            .unwrap_or_default()
            .into_iter()
            .map(|creator| Creator {
                address: creator.address,
                verified: creator.verified,
                share: creator.share,
            })
            .collect(),
        collection: metadata.collection.map(|collection| Collection {
            verified: collection.verified,
            key: collection.key,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_lang::AnchorSerialize;

    fn encode_entry(original_mint: Pubkey, last_staker: Pubkey, amount: u64) -> Vec<u8> {
        let mut data = STAKE_ENTRY_DISCRIMINATOR.to_vec();
        7u8.serialize(&mut data).unwrap();
        Pubkey::new_unique().serialize(&mut data).unwrap();
        amount.serialize(&mut data).unwrap();
        original_mint.serialize(&mut data).unwrap();
        false.serialize(&mut data).unwrap();
        last_staker.serialize(&mut data).unwrap();
        1_700_000_000i64.serialize(&mut data).unwrap();
        42u128.serialize(&mut data).unwrap();
        false.serialize(&mut data).unwrap();
        0u8.serialize(&mut data).unwrap();
        None::<Pubkey>.serialize(&mut data).unwrap();
        None::<i64>.serialize(&mut data).unwrap();
        // account padding
        data.extend_from_slice(&[0u8; 16]);
        data
    }

    #[test]
    fn decodes_stake_entry_and_filter_offsets_line_up() {
        let mint = Pubkey::new_unique();
        let staker = Pubkey::new_unique();
        let data = encode_entry(mint, staker, 3);
        assert_eq!(
            &data[STAKE_ENTRY_LAST_STAKER_OFFSET..STAKE_ENTRY_LAST_STAKER_OFFSET + 32],
            staker.as_ref()
        );
        let entry = StakeEntry::try_deserialize(&mut data.as_slice()).unwrap();
        assert_eq!(entry.original_mint, mint);
        assert_eq!(entry.amount, 3);
        assert_eq!(entry.total_stake_seconds, 42);
    }

    #[test]
    fn rejects_wrong_discriminator() {
        let mut data = encode_entry(Pubkey::new_unique(), Pubkey::new_unique(), 1);
        data[0] ^= 0xff;
        assert!(StakeEntry::try_deserialize(&mut data.as_slice()).is_err());
        assert!(StakePool::try_deserialize(&mut [0u8; 4].as_slice()).is_err());
    }

    #[test]
    fn metadata_strings_are_trimmed() {
        let creator = Pubkey::new_unique();
        let mut data = Vec::new();
        4u8.serialize(&mut data).unwrap();
        Pubkey::new_unique().serialize(&mut data).unwrap();
        Pubkey::new_unique().serialize(&mut data).unwrap();
        "Ghost #7\0\0\0".to_string().serialize(&mut data).unwrap();
        "GHST\0".to_string().serialize(&mut data).unwrap();
        "https://arweave.net/x".to_string().serialize(&mut data).unwrap();
        500u16.serialize(&mut data).unwrap();
        Some(vec![(creator, true, 100u8)]).serialize(&mut data).unwrap();
        true.serialize(&mut data).unwrap();
        true.serialize(&mut data).unwrap();
        // edition nonce, token standard, collection, uses, collection details,
        // programmable config
        for _ in 0..6 {
            None::<u8>.serialize(&mut data).unwrap();
        }
        let metadata = decode_metadata(&data).unwrap();
        assert_eq!(metadata.name, "Ghost #7");
        assert_eq!(metadata.symbol, "GHST");
        assert_eq!(
            metadata.creators,
            vec![Creator {
                address: creator,
                verified: true,
                share: 100,
            }]
        );
        assert!(metadata.collection.is_none());
    }

    #[test]
    fn truncated_metadata_is_an_error() {
        assert!(decode_metadata(&[4u8, 1, 2]).is_err());
    }
}

use anyhow::{format_err, Result};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::rc::Rc;

pub fn read_keypair_file(s: &str) -> Result<Keypair> {
    solana_sdk::signature::read_keypair_file(s)
        .map_err(|_| format_err!("failed to read keypair from {}", s))
}

/// The signer the client acts as. Without a configured key file the client is
/// disconnected and can only read pool state.
#[derive(Clone, Default)]
pub struct WalletContext {
    signer: Option<Rc<Keypair>>,
}

impl WalletContext {
    pub fn load(payer_path: Option<&str>) -> Result<Self> {
        let signer = payer_path
            .map(read_keypair_file)
            .transpose()?
            .map(Rc::new);
        Ok(Self { signer })
    }

    pub fn connected(&self) -> bool {
        self.signer.is_some()
    }

    pub fn signer(&self) -> Option<Rc<Keypair>> {
        self.signer.clone()
    }

    pub fn public_key(&self) -> Option<Pubkey> {
        self.signer.as_ref().map(|signer| signer.pubkey())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_path_means_disconnected() {
        let wallet = WalletContext::load(None).unwrap();
        assert!(!wallet.connected());
        assert_eq!(wallet.public_key(), None);
    }

    #[test]
    fn unreadable_key_file_is_an_error() {
        assert!(WalletContext::load(Some("/nonexistent/id.json")).is_err());
    }
}

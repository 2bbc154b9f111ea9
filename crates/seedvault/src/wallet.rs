use crate::{
    chains::{
        evm::{self, EthereumKey},
        solana::{self, SolanaDerivation, SolanaKey},
    },
    config::DerivationConfig,
    custody::CustodyChoice,
    errors::VaultError,
    keystore::SecretVault,
    kv::{KvStore, KEY_VAULT_MNEMONIC, KEY_WALLET_RECORD},
    mnemonic::{self, WordCount},
};
use bip39::Mnemonic;
use eyre::Context as _;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use zeroize::Zeroizing;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WalletSource {
    Generated,
    Imported,
}

impl WalletSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Imported => "imported",
        }
    }
}

/// Public description of the persisted wallet. Never holds secret material.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletRecord {
    pub id: String,
    pub ethereum_address: String,
    pub solana_public_key: String,
    pub solana_derivation: SolanaDerivation,
    pub custody: CustodyChoice,
    pub mnemonic_words: u8,
    pub created_at: String,
    pub source: WalletSource,
}

/// Options for [`create_wallet`] and [`import_wallet`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DeriveOptions {
    pub solana: SolanaDerivation,
    /// Ignored on import; the phrase decides.
    pub words: WordCount,
}

impl From<&DerivationConfig> for DeriveOptions {
    fn from(cfg: &DerivationConfig) -> Self {
        Self {
            solana: cfg.solana,
            words: cfg.mnemonic_words,
        }
    }
}

/// One mnemonic with its Ethereum and Solana keys at account 0.
pub struct DerivedWallet {
    mnemonic: Mnemonic,
    source: WalletSource,
    ethereum: EthereumKey,
    solana: SolanaKey,
}

impl fmt::Debug for DerivedWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedWallet")
            .field("source", &self.source)
            .field("ethereum", &self.ethereum)
            .field("solana", &self.solana)
            .finish_non_exhaustive()
    }
}

impl DerivedWallet {
    pub fn phrase(&self) -> Zeroizing<String> {
        Zeroizing::new(self.mnemonic.to_string())
    }

    pub const fn ethereum(&self) -> &EthereumKey {
        &self.ethereum
    }

    pub fn ethereum_address(&self) -> String {
        self.ethereum.address_checksum()
    }

    pub fn solana_public_key(&self) -> String {
        self.solana.public_key_base58()
    }

    pub fn solana_secret_key(&self) -> Zeroizing<[u8; 64]> {
        self.solana.secret_key_bytes()
    }

    pub fn record(&self, custody: CustodyChoice) -> WalletRecord {
        WalletRecord {
            id: Uuid::new_v4().to_string(),
            ethereum_address: self.ethereum_address(),
            solana_public_key: self.solana_public_key(),
            solana_derivation: self.solana.derivation(),
            custody,
            mnemonic_words: mnemonic::word_count(&self.mnemonic),
            created_at: crate::keystore::utc_now_iso(),
            source: self.source,
        }
    }
}

fn derive_from(
    mnemonic: Mnemonic,
    source: WalletSource,
    style: SolanaDerivation,
) -> eyre::Result<DerivedWallet> {
    let ethereum = evm::derive(&mnemonic, 0)?;
    let seed = mnemonic::seed(&mnemonic);
    let solana = solana::derive(&seed, style, 0)?;
    Ok(DerivedWallet {
        mnemonic,
        source,
        ethereum,
        solana,
    })
}

pub fn create_wallet(opts: &DeriveOptions) -> eyre::Result<DerivedWallet> {
    let m = mnemonic::generate(opts.words)?;
    let w = derive_from(m, WalletSource::Generated, opts.solana)?;
    tracing::debug!(
        ethereum = %w.ethereum_address(),
        solana_derivation = %opts.solana,
        "generated wallet"
    );
    Ok(w)
}

pub fn import_wallet(phrase: &str, opts: &DeriveOptions) -> eyre::Result<DerivedWallet> {
    let m = mnemonic::parse(phrase)?;
    derive_from(m, WalletSource::Imported, opts.solana)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountAddresses {
    pub account: u32,
    pub ethereum_address: String,
    pub ethereum_path: String,
    /// `None` when the derivation style has no key at this account.
    pub solana_public_key: Option<String>,
    pub solana_path: Option<String>,
}

pub fn derive_accounts(
    mnemonic: &Mnemonic,
    style: SolanaDerivation,
    indices: &[u32],
) -> eyre::Result<Vec<AccountAddresses>> {
    let seed = mnemonic::seed(mnemonic);
    let mut out = Vec::with_capacity(indices.len());
    for &idx in indices {
        let eth = evm::derive(mnemonic, idx)?;
        let sol = match style {
            SolanaDerivation::SeedPrefix if idx != 0 => None,
            SolanaDerivation::SeedPrefix | SolanaDerivation::Bip44 => {
                Some(solana::derive(&seed, style, idx)?.public_key_base58())
            }
        };
        out.push(AccountAddresses {
            account: idx,
            ethereum_address: eth.address_checksum(),
            ethereum_path: evm::derivation_path(idx),
            solana_path: sol.as_ref().and_then(|_| style.path(idx)),
            solana_public_key: sol,
        });
    }
    Ok(out)
}

pub fn load_record(store: &impl KvStore) -> eyre::Result<Option<WalletRecord>> {
    let Some(raw) = store.get(KEY_WALLET_RECORD)? else {
        return Ok(None);
    };
    let rec = serde_json::from_str(&raw).context("parse wallet record")?;
    Ok(Some(rec))
}

/// Unseal the stored recovery phrase.
pub fn unlock_mnemonic(
    vault: &SecretVault<impl KvStore>,
    password: &SecretString,
) -> eyre::Result<Mnemonic> {
    let bytes = vault
        .open(KEY_VAULT_MNEMONIC, password)?
        .ok_or(VaultError::WalletNotFound)?;
    let phrase = std::str::from_utf8(&bytes).context("sealed phrase must be utf-8")?;
    Ok(mnemonic::parse(phrase)?)
}

/// Unseal the stored phrase and re-derive the wallet it was persisted as.
pub fn unlock_wallet(
    vault: &SecretVault<impl KvStore>,
    record: &WalletRecord,
    password: &SecretString,
) -> eyre::Result<DerivedWallet> {
    let m = unlock_mnemonic(vault, password)?;
    let w = derive_from(m, record.source, record.solana_derivation)?;
    if w.ethereum_address() != record.ethereum_address
        || w.solana_public_key() != record.solana_public_key
    {
        eyre::bail!("sealed phrase does not match the stored wallet record");
    }
    Ok(w)
}

//! Solana Ed25519 keys from a BIP-39 seed.
//!
//! Two derivations exist and they are NOT interchangeable: a wallet restored with one will
//! not show the address produced by the other. Each persisted wallet records which one it used.

use crate::errors::VaultError;
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use eyre::Context as _;
use serde::{Deserialize, Serialize};
use solana_derivation_path::DerivationPath;
use solana_keypair::seed_derivable::keypair_from_seed_and_derivation_path;
use std::{fmt, str::FromStr};
use zeroize::Zeroizing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SolanaDerivation {
    /// First 32 bytes of the BIP-39 seed used directly as the Ed25519 secret.
    ///
    /// Only account 0 exists. Standard Solana wallets cannot reproduce this address.
    #[default]
    SeedPrefix,
    /// SLIP-0010 at `m/44'/501'/{account}'/0'` (Phantom, Backpack, Solflare).
    Bip44,
}

impl SolanaDerivation {
    pub const fn id(self) -> &'static str {
        match self {
            Self::SeedPrefix => "seed-prefix",
            Self::Bip44 => "bip44",
        }
    }

    pub fn path(self, account: u32) -> Option<String> {
        match self {
            Self::SeedPrefix => None,
            Self::Bip44 => Some(format!("m/44'/501'/{account}'/0'")),
        }
    }

    pub const fn all() -> &'static [Self] {
        &[Self::SeedPrefix, Self::Bip44]
    }
}

impl fmt::Display for SolanaDerivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for SolanaDerivation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "seed-prefix" | "seed_prefix" | "prefix" => Ok(Self::SeedPrefix),
            "bip44" | "standard" | "slip10" => Ok(Self::Bip44),
            other => {
                let known: Vec<&str> = Self::all().iter().map(|d| d.id()).collect();
                Err(format!(
                    "unknown solana derivation {other:?} (expected one of: {})",
                    known.join(", ")
                ))
            }
        }
    }
}

pub struct SolanaKey {
    signing: SigningKey,
    derivation: SolanaDerivation,
    account: u32,
}

impl fmt::Debug for SolanaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolanaKey")
            .field("public_key", &self.public_key_base58())
            .field("derivation", &self.derivation)
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

impl SolanaKey {
    pub fn public_key_base58(&self) -> String {
        bs58::encode(self.signing.verifying_key().as_bytes()).into_string()
    }

    /// 64-byte Solana keypair layout: `secret || public`.
    pub fn secret_key_bytes(&self) -> Zeroizing<[u8; 64]> {
        Zeroizing::new(self.signing.to_keypair_bytes())
    }

    pub const fn derivation(&self) -> SolanaDerivation {
        self.derivation
    }

    pub const fn account(&self) -> u32 {
        self.account
    }

    /// Detached Ed25519 signature over the raw message bytes, base58-encoded.
    pub fn sign_message(&self, message: &[u8]) -> String {
        bs58::encode(self.signing.sign(message).to_bytes()).into_string()
    }
}

pub fn derive(
    seed: &[u8; 64],
    derivation: SolanaDerivation,
    account: u32,
) -> eyre::Result<SolanaKey> {
    let account = super::check_account(account)?;
    let signing = match derivation {
        SolanaDerivation::SeedPrefix => {
            if account != 0 {
                return Err(VaultError::UnsupportedAccount {
                    style: derivation.id(),
                    account,
                }
                .into());
            }
            let mut prefix = Zeroizing::new([0_u8; 32]);
            let Some(head) = seed.get(..32) else {
                eyre::bail!("seed too short");
            };
            prefix.copy_from_slice(head);
            SigningKey::from_bytes(&prefix)
        }
        SolanaDerivation::Bip44 => {
            let path = DerivationPath::new_bip44(Some(account), Some(0));
            let kp = keypair_from_seed_and_derivation_path(seed, Some(path))
                .map_err(|e| eyre::eyre!("derive solana keypair: {e}"))?;
            let bytes = Zeroizing::new(kp.to_bytes());
            SigningKey::from_keypair_bytes(&bytes).context("solana keypair bytes")?
        }
    };
    Ok(SolanaKey {
        signing,
        derivation,
        account,
    })
}

/// Verify a base58 Ed25519 signature against a base58 public key.
pub fn verify_message(public_key: &str, message: &[u8], signature_b58: &str) -> eyre::Result<bool> {
    let pk = bs58::decode(public_key.trim())
        .into_vec()
        .context("decode solana public key")?;
    let pk: [u8; 32] = pk
        .as_slice()
        .try_into()
        .map_err(|_e| eyre::eyre!("solana public key must be 32 bytes"))?;
    let vk = VerifyingKey::from_bytes(&pk).context("invalid solana public key")?;

    let sig = bs58::decode(signature_b58.trim())
        .into_vec()
        .context("decode solana signature")?;
    let sig: [u8; 64] = sig
        .as_slice()
        .try_into()
        .map_err(|_e| eyre::eyre!("solana signature must be 64 bytes"))?;
    Ok(vk.verify(message, &Signature::from_bytes(&sig)).is_ok())
}

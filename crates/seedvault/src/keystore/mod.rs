pub mod crypto;

use crate::{errors::VaultError, kv::KvStore};
use base64::Engine as _;
use chrono::Utc;
use crypto::{CryptoBox, KdfParams};
use eyre::Context as _;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

const PURPOSE_SEAL: &str = "seal";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultKdfMeta {
    pub v: u8,
    pub salt_b64: String,
    #[serde(flatten)]
    pub params: KdfParams,
}

impl VaultKdfMeta {
    fn fresh() -> Self {
        Self {
            v: 1,
            salt_b64: base64::engine::general_purpose::STANDARD.encode(crypto::random_salt16()),
            params: KdfParams::default(),
        }
    }

    fn salt(&self) -> eyre::Result<[u8; 16]> {
        if self.v != 1 {
            eyre::bail!("unsupported vault kdf version: {}", self.v);
        }
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&self.salt_b64)
            .context("decode salt_b64")?;
        bytes
            .as_slice()
            .try_into()
            .map_err(|_e| eyre::eyre!("salt_b64 must decode to 16 bytes"))
    }
}

/// What is persisted under a sealed key: the KDF inputs plus the ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedEntry {
    pub kdf: VaultKdfMeta,
    pub sealed: CryptoBox,
}

/// Serialize `secret` sealed under `password` for storage at `key`.
///
/// Every call draws a fresh salt and nonce.
pub fn seal_entry(key: &str, secret: &[u8], password: &SecretString) -> eyre::Result<String> {
    let kdf = VaultKdfMeta::fresh();
    let base = crypto::derive_password_key(password, &kdf.salt()?, kdf.params)?;
    let sub = crypto::derive_subkey(&base, key, PURPOSE_SEAL)?;
    let sealed = crypto::encrypt_aes_gcm(&sub, secret)?;
    serde_json::to_string(&SealedEntry { kdf, sealed }).context("serialize sealed entry")
}

/// Inverse of [`seal_entry`]. A wrong password surfaces as [`VaultError::IncorrectPassword`].
pub fn open_entry(
    key: &str,
    raw: &str,
    password: &SecretString,
) -> eyre::Result<Zeroizing<Vec<u8>>> {
    let entry: SealedEntry = serde_json::from_str(raw).context("parse sealed entry")?;
    let base = crypto::derive_password_key(password, &entry.kdf.salt()?, entry.kdf.params)?;
    let sub = crypto::derive_subkey(&base, key, PURPOSE_SEAL)?;
    crypto::decrypt_aes_gcm(&sub, &entry.sealed)?
        .ok_or_else(|| VaultError::IncorrectPassword.into())
}

/// Read side of the sealed entries in a [`KvStore`]. Writes go through [`seal_entry`] so they
/// can be committed together with the public records.
#[derive(Debug)]
pub struct SecretVault<S> {
    store: S,
}

impl<S: KvStore> SecretVault<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// `Ok(None)` when nothing is sealed under `key`.
    pub fn open(
        &self,
        key: &str,
        password: &SecretString,
    ) -> eyre::Result<Option<Zeroizing<Vec<u8>>>> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        open_entry(key, &raw, password).map(Some)
    }

    pub fn contains(&self, key: &str) -> eyre::Result<bool> {
        Ok(self.store.get(key)?.is_some())
    }
}

pub fn utc_now_iso() -> String {
    Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    fn pw(s: &str) -> SecretString {
        SecretString::new(s.to_owned().into())
    }

    fn sealed_store(secret: &[u8], password: &str) -> eyre::Result<MemoryStore> {
        let mut store = MemoryStore::new();
        store.set("vault.mnemonic", &seal_entry("vault.mnemonic", secret, &pw(password))?)?;
        Ok(store)
    }

    #[test]
    fn seal_then_open_roundtrip() -> eyre::Result<()> {
        let vault = SecretVault::new(sealed_store(b"abandon about", "Tr0ub4dor&3")?);
        assert!(vault.contains("vault.mnemonic")?);

        let out = vault
            .open("vault.mnemonic", &pw("Tr0ub4dor&3"))?
            .ok_or_else(|| eyre::eyre!("sealed entry missing"))?;
        assert_eq!(out.as_slice(), b"abandon about");

        let raw = vault
            .store()
            .get("vault.mnemonic")?
            .unwrap_or_default();
        assert!(!raw.contains("abandon"));
        Ok(())
    }

    #[test]
    fn wrong_password_is_incorrect_password() -> eyre::Result<()> {
        let vault = SecretVault::new(sealed_store(b"secret", "Tr0ub4dor&3")?);
        let err = vault
            .open("vault.mnemonic", &pw("tr0ub4dor&3"))
            .err()
            .ok_or_else(|| eyre::eyre!("wrong password must fail"))?;
        assert_eq!(
            err.downcast_ref::<VaultError>(),
            Some(&VaultError::IncorrectPassword)
        );
        Ok(())
    }

    #[test]
    fn entries_are_bound_to_their_key() -> eyre::Result<()> {
        let raw = seal_entry("vault.mnemonic", b"secret", &pw("Tr0ub4dor&3"))?;
        let err = open_entry("vault.other", &raw, &pw("Tr0ub4dor&3")).err();
        assert!(err.is_some());
        Ok(())
    }

    #[test]
    fn missing_entry_opens_to_none() -> eyre::Result<()> {
        let vault = SecretVault::new(MemoryStore::new());
        assert!(vault.open("vault.mnemonic", &pw("x"))?.is_none());
        Ok(())
    }
}

//! Key-value persistence for wallet records and sealed secrets.

mod file;

pub use file::FileStore;

/// Public Ethereum address of the current wallet, for read-only consumers.
pub const KEY_ETHEREUM_ADDRESS: &str = "ethereumAddress";
/// Base58 Solana public key of the current wallet, for read-only consumers.
pub const KEY_SOLANA_PUBLIC_KEY: &str = "solanaPublicKey";
/// JSON-encoded [`crate::wallet::WalletRecord`].
pub const KEY_WALLET_RECORD: &str = "wallet.record";
/// JSON-encoded sealed recovery phrase.
pub const KEY_VAULT_MNEMONIC: &str = "vault.mnemonic";

pub trait KvStore {
    fn get(&self, key: &str) -> eyre::Result<Option<String>>;

    fn set(&mut self, key: &str, value: &str) -> eyre::Result<()>;

    fn clear(&mut self) -> eyre::Result<()>;

    fn keys(&self) -> eyre::Result<Vec<String>>;

    /// Write several entries together. Backends with a real commit step apply them at once.
    fn set_many(&mut self, entries: &[(&str, &str)]) -> eyre::Result<()> {
        for (k, v) in entries {
            self.set(k, v)?;
        }
        Ok(())
    }
}

impl<S: KvStore + ?Sized> KvStore for &mut S {
    fn get(&self, key: &str) -> eyre::Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> eyre::Result<()> {
        (**self).set(key, value)
    }

    fn clear(&mut self) -> eyre::Result<()> {
        (**self).clear()
    }

    fn keys(&self) -> eyre::Result<Vec<String>> {
        (**self).keys()
    }

    fn set_many(&mut self, entries: &[(&str, &str)]) -> eyre::Result<()> {
        (**self).set_many(entries)
    }
}

/// In-process store. Nothing survives the process.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: std::collections::BTreeMap<String, String>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> eyre::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> eyre::Result<()> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn clear(&mut self) -> eyre::Result<()> {
        self.entries.clear();
        Ok(())
    }

    fn keys(&self) -> eyre::Result<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }
}

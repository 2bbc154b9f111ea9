use crate::{chains::solana::SolanaDerivation, mnemonic::WordCount};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CUSTODY_URL: &str = "http://localhost:8085/api/auth/wallet";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CustodyConfig {
    /// Endpoint that receives `{ "mnemonic": "..." }` for service-managed custody.
    ///
    /// Must be `https`, except loopback `http` for local development.
    pub endpoint_url: String,
    /// Optional bearer token sent as `Authorization: Bearer <token>`.
    ///
    /// Prefer `SEEDVAULT_CUSTODY_TOKEN` over writing it to disk.
    pub auth_token: Option<String>,
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
}

impl Default for CustodyConfig {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_CUSTODY_URL.into(),
            auth_token: None,
            timeout_seconds: 15,
            connect_timeout_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivationConfig {
    /// Solana key derivation used for new wallets. Recorded per wallet once persisted.
    pub solana: SolanaDerivation,
    /// Word count for freshly generated phrases.
    pub mnemonic_words: WordCount,
}

impl Default for DerivationConfig {
    fn default() -> Self {
        Self {
            solana: SolanaDerivation::SeedPrefix,
            mnemonic_words: WordCount::Twelve,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    pub min_length: usize,
    /// Minimum score from [`crate::password::strength`].
    pub min_strength: u8,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            min_strength: 40,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VaultConfig {
    pub custody: CustodyConfig,
    pub derivation: DerivationConfig,
    pub password: PasswordPolicy,
}

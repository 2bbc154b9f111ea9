//! Create/import flow: `idle -> generated -> revealed -> persisted`.
//!
//! An imported phrase is already known to the user, so import lands directly in `revealed`.

use crate::{
    config::PasswordPolicy,
    custody::{self, CustodyChoice, CustodyClient},
    errors::VaultError,
    kv::KvStore,
    password,
    wallet::{self, DeriveOptions, DerivedWallet, WalletRecord},
};
use secrecy::SecretString;
use zeroize::Zeroizing;

enum FlowState {
    Idle,
    Generated {
        wallet: DerivedWallet,
        password: SecretString,
    },
    Revealed {
        wallet: DerivedWallet,
        password: SecretString,
    },
    Persisted,
}

impl FlowState {
    const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Generated { .. } => "generated",
            Self::Revealed { .. } => "revealed",
            Self::Persisted => "persisted",
        }
    }
}

pub struct WalletFlow {
    state: FlowState,
    policy: PasswordPolicy,
    opts: DeriveOptions,
}

impl WalletFlow {
    pub const fn new(policy: PasswordPolicy, opts: DeriveOptions) -> Self {
        Self {
            state: FlowState::Idle,
            policy,
            opts,
        }
    }

    pub const fn state(&self) -> &'static str {
        self.state.name()
    }

    fn ensure_idle(&self, op: &'static str) -> Result<(), VaultError> {
        match self.state {
            FlowState::Idle => Ok(()),
            FlowState::Generated { .. }
            | FlowState::Revealed { .. }
            | FlowState::Persisted => Err(VaultError::InvalidTransition {
                state: self.state.name(),
                op,
            }),
        }
    }

    /// Check the password, then generate a fresh phrase. The phrase stays hidden until
    /// [`Self::reveal`].
    pub fn start_create(
        &mut self,
        password: SecretString,
        confirm: &SecretString,
    ) -> eyre::Result<&DerivedWallet> {
        self.ensure_idle("create")?;
        password::validate(&password, confirm, &self.policy)?;
        let wallet = wallet::create_wallet(&self.opts)?;
        self.state = FlowState::Generated { wallet, password };
        Ok(self.wallet().ok_or(VaultError::WalletNotFound)?)
    }

    pub fn start_import(
        &mut self,
        phrase: &str,
        password: SecretString,
        confirm: &SecretString,
    ) -> eyre::Result<&DerivedWallet> {
        self.ensure_idle("import")?;
        password::validate(&password, confirm, &self.policy)?;
        let wallet = wallet::import_wallet(phrase, &self.opts)?;
        self.state = FlowState::Revealed { wallet, password };
        Ok(self.wallet().ok_or(VaultError::WalletNotFound)?)
    }

    /// Show the phrase. Allowed repeatedly until the wallet is persisted.
    pub fn reveal(&mut self) -> Result<Zeroizing<String>, VaultError> {
        let state = std::mem::replace(&mut self.state, FlowState::Idle);
        match state {
            FlowState::Generated { wallet, password }
            | FlowState::Revealed { wallet, password } => {
                let phrase = wallet.phrase();
                self.state = FlowState::Revealed { wallet, password };
                Ok(phrase)
            }
            other @ (FlowState::Idle | FlowState::Persisted) => {
                let err = VaultError::InvalidTransition {
                    state: other.name(),
                    op: "reveal",
                };
                self.state = other;
                Err(err)
            }
        }
    }

    /// Persist under `choice`. Only a revealed wallet can be persisted; on failure the flow
    /// stays revealed so the user can retry or pick the other custody option.
    pub async fn persist(
        &mut self,
        choice: CustodyChoice,
        client: &dyn CustodyClient,
        store: &mut impl KvStore,
    ) -> eyre::Result<WalletRecord> {
        let FlowState::Revealed { wallet, password } = &self.state else {
            return Err(VaultError::InvalidTransition {
                state: self.state.name(),
                op: "persist",
            }
            .into());
        };
        let record = custody::persist_wallet(choice, wallet, password, client, store).await?;
        self.state = FlowState::Persisted;
        Ok(record)
    }

    pub const fn wallet(&self) -> Option<&DerivedWallet> {
        match &self.state {
            FlowState::Generated { wallet, .. } | FlowState::Revealed { wallet, .. } => {
                Some(wallet)
            }
            FlowState::Idle | FlowState::Persisted => None,
        }
    }
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A structured error suitable for `--json` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub ok: bool,
    pub code: String,
    pub message: String,
}

impl ErrorReport {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            code: code.to_owned(),
            message: message.into(),
        }
    }

    /// Map an application error to a report, keeping the typed code when one is available.
    pub fn from_eyre(e: &eyre::Report) -> Self {
        e.downcast_ref::<VaultError>().map_or_else(
            || Self::new("internal", format!("{e:#}")),
            |v| v.clone().into(),
        )
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("password must be at least {min} characters long")]
    PasswordTooShort { min: usize },

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("password too weak (score {score}, need {min})")]
    PasswordTooWeak { score: u8, min: u8 },

    #[error("password required")]
    PasswordRequired,

    #[error("incorrect password")]
    IncorrectPassword,

    #[error("cannot {op} while {state}")]
    InvalidTransition {
        state: &'static str,
        op: &'static str,
    },

    #[error("no wallet has been persisted")]
    WalletNotFound,

    #[error("a wallet is already stored; pass --force to replace it")]
    WalletExists,

    #[error("account index {account} is out of range (max 2147483647)")]
    AccountIndexOutOfRange { account: u32 },

    #[error("{style} derivation does not support account {account}")]
    UnsupportedAccount { style: &'static str, account: u32 },

    #[error("custody endpoint rejected the request (status {status})")]
    CustodyRejected { status: u16 },

    #[error("custody endpoint unreachable: {0}")]
    CustodyUnreachable(String),

    #[error("custody endpoint must use https (or loopback http)")]
    CustodyEndpointNotAllowed,

    #[error("store busy")]
    StoreBusy,
}

impl VaultError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidMnemonic(_) => "invalid_mnemonic",
            Self::PasswordTooShort { .. } => "password_too_short",
            Self::PasswordMismatch => "password_mismatch",
            Self::PasswordTooWeak { .. } => "password_too_weak",
            Self::PasswordRequired => "password_required",
            Self::IncorrectPassword => "incorrect_password",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::WalletNotFound => "wallet_not_found",
            Self::WalletExists => "wallet_exists",
            Self::AccountIndexOutOfRange { .. } => "account_index_out_of_range",
            Self::UnsupportedAccount { .. } => "unsupported_account",
            Self::CustodyRejected { .. } => "custody_rejected",
            Self::CustodyUnreachable(_) => "custody_unreachable",
            Self::CustodyEndpointNotAllowed => "custody_endpoint_not_allowed",
            Self::StoreBusy => "store_busy",
        }
    }
}

impl From<VaultError> for ErrorReport {
    fn from(e: VaultError) -> Self {
        match e {
            VaultError::StoreBusy => Self::new(e.code(), "store busy; retry the operation"),
            VaultError::IncorrectPassword => Self::new(e.code(), "incorrect password"),
            other => Self::new(other.code(), other.to_string()),
        }
    }
}

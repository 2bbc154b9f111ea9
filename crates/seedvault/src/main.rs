#![expect(
    clippy::multiple_crate_versions,
    reason = "transitive dependency duplication"
)]

use clap::{Parser, Subcommand, ValueEnum};
use eyre::Context as _;
use serde_json::json;
use tracing_subscriber::prelude::*;

mod audit;
mod chains;
mod cli_output;
mod config;
mod custody;
mod doctor;
mod errors;
mod flow;
mod fsutil;
mod keystore;
mod kv;
mod mnemonic;
mod password;
mod paths;
mod store;
mod wallet;

use crate::{
    chains::solana::SolanaDerivation,
    config::VaultConfig,
    custody::CustodyChoice,
    errors::{ErrorReport, VaultError},
    flow::WalletFlow,
    keystore::SecretVault,
    kv::{FileStore, KvStore as _},
    mnemonic::WordCount,
    paths::VaultPaths,
    store::ConfigStore,
    wallet::{DeriveOptions, WalletRecord},
};

#[derive(Parser, Debug)]
#[command(name = "seedvault", version)]
struct Cli {
    /// Emit JSON to stdout (machine-readable), including errors.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CliCustody {
    /// Keep the phrase yourself. Nothing is transmitted.
    #[value(name = "self")]
    SelfCustody,
    /// Send the phrase once to the configured custody endpoint.
    Rely,
}

impl From<CliCustody> for CustodyChoice {
    fn from(v: CliCustody) -> Self {
        match v {
            CliCustody::SelfCustody => Self::SelfCustody,
            CliCustody::Rely => Self::ServiceManaged,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CliSolanaDerivation {
    SeedPrefix,
    Bip44,
}

impl From<CliSolanaDerivation> for SolanaDerivation {
    fn from(v: CliSolanaDerivation) -> Self {
        match v {
            CliSolanaDerivation::SeedPrefix => Self::SeedPrefix,
            CliSolanaDerivation::Bip44 => Self::Bip44,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CliChain {
    Ethereum,
    Solana,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new recovery phrase, show it once, and store the wallet.
    Create {
        #[arg(long, value_enum, default_value_t = CliCustody::SelfCustody)]
        custody: CliCustody,

        /// 12 or 24 words. Defaults to `derivation.mnemonic_words` from config.
        #[arg(long)]
        words: Option<WordCount>,

        /// Defaults to `derivation.solana` from config.
        #[arg(long, value_enum)]
        solana_derivation: Option<CliSolanaDerivation>,

        /// Replace an existing wallet.
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Import an existing recovery phrase (read from stdin or a hidden prompt).
    Import {
        #[arg(long, value_enum, default_value_t = CliCustody::SelfCustody)]
        custody: CliCustody,

        #[arg(long, value_enum)]
        solana_derivation: Option<CliSolanaDerivation>,

        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Print the stored public addresses.
    Show,

    /// Print the stored recovery phrase to stderr (requires the wallet password).
    Reveal {
        #[arg(long, default_value_t = false)]
        yes: bool,
    },

    /// List addresses for several accounts of the stored wallet.
    Accounts {
        #[arg(
            long,
            default_value_t = 0,
            value_parser = clap::value_parser!(u32).range(..=i64::from(chains::MAX_ACCOUNT_INDEX))
        )]
        start: u32,

        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..=100))]
        count: u32,
    },

    /// Print one private key of the stored wallet to stderr (requires the wallet password).
    ExportKey {
        #[arg(long, value_enum)]
        chain: CliChain,

        #[arg(long, default_value_t = false)]
        yes: bool,
    },

    /// Sign a message with the stored wallet (EIP-191 or Ed25519).
    SignMessage {
        #[arg(long, value_enum)]
        chain: CliChain,

        #[arg(long)]
        message: String,

        #[arg(
            long,
            default_value_t = 0,
            value_parser = clap::value_parser!(u32).range(..=i64::from(chains::MAX_ACCOUNT_INDEX))
        )]
        account: u32,
    },

    /// Check a signature produced by `sign-message` (no wallet needed).
    VerifyMessage {
        #[arg(long, value_enum)]
        chain: CliChain,

        /// Ethereum address or base58 Solana public key.
        #[arg(long)]
        address: String,

        #[arg(long)]
        message: String,

        #[arg(long)]
        signature: String,
    },

    /// Print recent audit log entries (newest first).
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Remove the stored wallet and its sealed phrase.
    Clear {
        #[arg(long, default_value_t = false)]
        yes: bool,
    },

    /// Print resolved paths (useful for debugging).
    Paths,

    /// Print a quick self-diagnostic report (safe to paste; contains no secrets).
    Doctor,
}

fn init_logging(paths: &VaultPaths) -> tracing_appender::non_blocking::WorkerGuard {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let file_name = paths
        .log_file
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("seedvault.log.jsonl");
    let file_appender = tracing_appender::rolling::never(&paths.data_dir, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_filter(env_filter.clone());
    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(file_writer)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

fn audit_event(paths: &VaultPaths, mut entry: serde_json::Value, outcome: serde_json::Value) {
    if let (Some(obj), serde_json::Value::Object(extra)) = (entry.as_object_mut(), outcome) {
        obj.extend(extra);
    }
    if let Err(e) = audit::append(&paths.audit_log(), entry) {
        tracing::warn!(error = %format!("{e:#}"), "audit log write failed");
    }
}

fn record_entry(event: &str, rec: Option<&WalletRecord>) -> serde_json::Value {
    json!({
        "event": event,
        "wallet_id": rec.map(|r| r.id.clone()),
        "custody": rec.map(|r| r.custody.as_str()),
        "solana_derivation": rec.map(|r| r.solana_derivation.id()),
    })
}

fn emit_record(as_json: bool, rec: &WalletRecord) -> eyre::Result<()> {
    if as_json {
        cli_output::print_json(&json!({ "ok": true, "wallet": rec }))
    } else {
        cli_output::print_wallet_summary(
            &rec.ethereum_address,
            &rec.solana_public_key,
            rec.solana_derivation.id(),
        );
        cli_output::notice(&format!(
            "Custody  : {} ({} phrase, {} words)",
            rec.custody,
            rec.source.as_str(),
            rec.mnemonic_words
        ));
        Ok(())
    }
}

fn require_record(store: &FileStore) -> eyre::Result<WalletRecord> {
    Ok(wallet::load_record(store)?.ok_or(VaultError::WalletNotFound)?)
}

fn refuse_overwrite(store: &FileStore, force: bool) -> eyre::Result<()> {
    if !force && wallet::load_record(store)?.is_some() {
        return Err(VaultError::WalletExists.into());
    }
    Ok(())
}

struct NewWalletArgs {
    custody: CustodyChoice,
    words: Option<WordCount>,
    solana: Option<SolanaDerivation>,
    force: bool,
    import: bool,
}

async fn new_wallet(
    paths: &VaultPaths,
    cfg: &VaultConfig,
    as_json: bool,
    args: NewWalletArgs,
) -> eyre::Result<()> {
    let event = if args.import { "import" } else { "create" };
    let mut store = FileStore::open(paths)?;
    refuse_overwrite(&store, args.force)?;

    let mut opts = DeriveOptions::from(&cfg.derivation);
    if let Some(w) = args.words {
        opts.words = w;
    }
    if let Some(s) = args.solana {
        opts.solana = s;
    }
    let client = custody::client_for(args.custody, &cfg.custody)?;

    let mut flow = WalletFlow::new(cfg.password.clone(), opts);
    let started = if args.import {
        let phrase = cli_output::read_mnemonic()?;
        let (pw, confirm) = cli_output::read_new_password()?;
        flow.start_import(&phrase, pw, &confirm).map(|_| ())
    } else {
        let (pw, confirm) = cli_output::read_new_password()?;
        flow.start_create(pw, &confirm).map(|_| ())
    };
    if started.is_err() {
        audit_event(paths, record_entry(event, None), audit::outcome(&started));
    }
    started?;
    tracing::info!(event, state = flow.state(), "wallet flow started");

    if !args.import {
        let phrase = flow.reveal()?;
        cli_output::print_recovery_phrase(&phrase);
    }

    let res = flow.persist(args.custody, client.as_ref(), &mut store).await;
    audit_event(
        paths,
        record_entry(event, res.as_ref().ok()),
        audit::outcome(&res),
    );
    let rec = res.with_context(|| format!("{event} wallet"))?;
    emit_record(as_json, &rec)
}

fn export_key(
    vault: &SecretVault<FileStore>,
    rec: &WalletRecord,
    chain: CliChain,
) -> eyre::Result<()> {
    let pw = cli_output::read_password("Wallet password: ")?;
    let w = wallet::unlock_wallet(vault, rec, &pw)?;
    match chain {
        CliChain::Ethereum => {
            let key = w.ethereum().private_key_hex();
            cli_output::notice(&format!("Ethereum private key: {}", key.as_str()));
        }
        CliChain::Solana => {
            let secret = w.solana_secret_key();
            let encoded = zeroize::Zeroizing::new(bs58::encode(secret.as_slice()).into_string());
            cli_output::notice(&format!("Solana secret key (base58): {}", encoded.as_str()));
        }
    }
    Ok(())
}

fn sign_message(
    vault: &SecretVault<FileStore>,
    chain: CliChain,
    message: &str,
    account: u32,
) -> eyre::Result<serde_json::Value> {
    let rec = require_record(vault.store())?;
    let pw = cli_output::read_password("Wallet password: ")?;
    let m = wallet::unlock_mnemonic(vault, &pw)?;
    match chain {
        CliChain::Ethereum => {
            let key = chains::evm::derive(&m, account)?;
            Ok(json!({
                "ok": true,
                "chain": "ethereum",
                "account": key.account(),
                "address": key.address_checksum(),
                "signature": key.sign_message(message.as_bytes())?,
            }))
        }
        CliChain::Solana => {
            let seed = mnemonic::seed(&m);
            let key = chains::solana::derive(&seed, rec.solana_derivation, account)?;
            Ok(json!({
                "ok": true,
                "chain": "solana",
                "account": key.account(),
                "address": key.public_key_base58(),
                "derivation": key.derivation().id(),
                "signature": key.sign_message(message.as_bytes()),
            }))
        }
    }
}

async fn run(cli: Cli, paths: &VaultPaths) -> eyre::Result<()> {
    let as_json = cli.json;
    let cfg = ConfigStore::new(paths).load_or_init_default()?;

    match cli.cmd {
        Command::Create {
            custody,
            words,
            solana_derivation,
            force,
        } => {
            new_wallet(
                paths,
                &cfg,
                as_json,
                NewWalletArgs {
                    custody: custody.into(),
                    words,
                    solana: solana_derivation.map(Into::into),
                    force,
                    import: false,
                },
            )
            .await
        }
        Command::Import {
            custody,
            solana_derivation,
            force,
        } => {
            new_wallet(
                paths,
                &cfg,
                as_json,
                NewWalletArgs {
                    custody: custody.into(),
                    words: None,
                    solana: solana_derivation.map(Into::into),
                    force,
                    import: true,
                },
            )
            .await
        }
        Command::Show => {
            let store = FileStore::open(paths)?;
            let rec = require_record(&store)?;
            emit_record(as_json, &rec)
        }
        Command::Reveal { yes } => {
            let vault = SecretVault::new(FileStore::open(paths)?);
            let rec = require_record(vault.store())?;
            cli_output::confirm_or_bail(yes, "Print the recovery phrase to this terminal?")?;
            let pw = cli_output::read_password("Wallet password: ")?;
            let res = wallet::unlock_mnemonic(&vault, &pw);
            audit_event(paths, record_entry("reveal", Some(&rec)), audit::outcome(&res));
            let m = res?;
            cli_output::print_recovery_phrase(&zeroize::Zeroizing::new(m.to_string()));
            if as_json {
                cli_output::print_json(&json!({ "ok": true, "revealed": true }))?;
            }
            Ok(())
        }
        Command::Accounts { start, count } => {
            let vault = SecretVault::new(FileStore::open(paths)?);
            let rec = require_record(vault.store())?;
            let pw = cli_output::read_password("Wallet password: ")?;
            let m = wallet::unlock_mnemonic(&vault, &pw)?;
            let indices: Vec<u32> = (start..start.saturating_add(count)).collect();
            let accounts = wallet::derive_accounts(&m, rec.solana_derivation, &indices)?;
            if as_json {
                cli_output::print_json(&json!({ "ok": true, "accounts": accounts }))
            } else {
                for a in &accounts {
                    cli_output::notice(&format!(
                        "#{:<3} {}  {}",
                        a.account,
                        a.ethereum_address,
                        a.solana_public_key.as_deref().unwrap_or("-")
                    ));
                }
                Ok(())
            }
        }
        Command::ExportKey { chain, yes } => {
            let vault = SecretVault::new(FileStore::open(paths)?);
            let rec = require_record(vault.store())?;
            cli_output::confirm_or_bail(
                yes,
                "Print a private key to this terminal? Anyone who sees it controls the funds.",
            )?;
            let res = export_key(&vault, &rec, chain);
            audit_event(paths, record_entry("export_key", Some(&rec)), audit::outcome(&res));
            res?;
            if as_json {
                cli_output::print_json(&json!({ "ok": true, "exported": true }))?;
            }
            Ok(())
        }
        Command::SignMessage {
            chain,
            message,
            account,
        } => {
            let vault = SecretVault::new(FileStore::open(paths)?);
            let res = sign_message(&vault, chain, &message, account);
            let rec = wallet::load_record(vault.store()).ok().flatten();
            audit_event(paths, record_entry("sign_message", rec.as_ref()), audit::outcome(&res));
            cli_output::print_json(&res?)
        }
        Command::VerifyMessage {
            chain,
            address,
            message,
            signature,
        } => {
            let valid = match chain {
                CliChain::Ethereum => {
                    chains::evm::verify_message(&address, message.as_bytes(), &signature)?
                }
                CliChain::Solana => {
                    chains::solana::verify_message(&address, message.as_bytes(), &signature)?
                }
            };
            cli_output::print_json(&json!({ "ok": true, "valid": valid }))
        }
        Command::History { limit } => {
            let entries = audit::read_recent(&paths.audit_log(), limit)?;
            cli_output::print_json(&json!({ "ok": true, "entries": entries }))
        }
        Command::Clear { yes } => {
            let mut store = FileStore::open(paths)?;
            let rec = wallet::load_record(&store)?;
            cli_output::confirm_or_bail(
                yes,
                "Remove the stored wallet? Without the recovery phrase it cannot be restored.",
            )?;
            let res = store.clear();
            audit_event(paths, record_entry("clear", rec.as_ref()), audit::outcome(&res));
            res?;
            if as_json {
                cli_output::print_json(&json!({ "ok": true, "cleared": rec.is_some() }))?;
            } else {
                cli_output::notice("Wallet removed.");
            }
            Ok(())
        }
        Command::Paths => cli_output::print_json(&json!({
          "config_dir": paths.config_dir,
          "data_dir": paths.data_dir,
          "log_file": paths.log_file,
          "store_file": paths.store_file(),
          "audit_log": paths.audit_log(),
        })),
        Command::Doctor => doctor::run(paths, as_json).await.context("doctor failed"),
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let paths = VaultPaths::discover()?;
    paths.ensure_private_dirs()?;
    let _log_guard = init_logging(&paths);

    let as_json = cli.json;
    let res = run(cli, &paths).await;
    if let Err(e) = &res {
        tracing::debug!(code = %ErrorReport::from_eyre(e).code, "command failed");
        if as_json {
            let rep = ErrorReport::from_eyre(e);
            cli_output::print_json(&serde_json::to_value(&rep).context("serialize error")?)?;
        }
    }
    res
}

use crate::{
    config::VaultConfig,
    custody,
    keystore::SecretVault,
    kv::{FileStore, KvStore as _, KEY_VAULT_MNEMONIC},
    paths::VaultPaths,
    wallet::{self, WalletRecord},
};
use eyre::Context as _;
use serde_json::json;
use std::{fs, path::Path, path::PathBuf, time::Duration};
use tokio::net::TcpStream;

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

fn env_set(key: &str) -> bool {
    env_opt(key).is_some()
}

/// Raw TCP connect to the custody host. Nothing is sent.
async fn check_custody_reachable(url: &str) -> (bool, Option<String>) {
    let parsed = match reqwest::Url::parse(url) {
        Ok(u) => u,
        Err(e) => return (false, Some(format!("invalid url: {e}"))),
    };
    let (Some(host), Some(port)) = (parsed.host_str(), parsed.port_or_known_default()) else {
        return (false, Some("url has no host".to_owned()));
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let fut = TcpStream::connect((host, port));
    match tokio::time::timeout(Duration::from_millis(500), fut).await {
        Ok(Ok(_s)) => (true, None),
        Ok(Err(e)) => (false, Some(format!("connect failed: {e}"))),
        Err(_elapsed) => (false, Some("connect timed out".to_owned())),
    }
}

fn try_parse_config(path: &Path) -> eyre::Result<VaultConfig> {
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: VaultConfig = toml::from_str(&s).context("parse config.toml")?;
    Ok(cfg)
}

struct ConfigReport {
    path: PathBuf,
    exists: bool,
    parse_ok: bool,
    error: Option<String>,
    custody_url: Option<String>,
    custody_url_allowed: Option<bool>,
    solana_derivation: Option<String>,
    mnemonic_words: Option<u8>,
}

struct StoreReport {
    path: PathBuf,
    exists: bool,
    wallet: Option<WalletRecord>,
    sealed_phrase: bool,
    keys: Vec<String>,
    error: Option<String>,
}

struct CustodyReport {
    reachable: bool,
    note: Option<String>,
}

struct DoctorReport {
    version: &'static str,
    paths: VaultPaths,
    config: ConfigReport,
    store: StoreReport,
    audit_entries: usize,
    custody: Option<CustodyReport>,
    env: serde_json::Value,
}

fn collect_store(paths: &VaultPaths) -> StoreReport {
    let path = paths.store_file();
    let exists = path.exists();
    let loaded = if exists {
        let vault = SecretVault::new(FileStore::reader(paths));
        wallet::load_record(vault.store()).and_then(|rec| {
            let sealed = vault.contains(KEY_VAULT_MNEMONIC)?;
            let keys = vault.store().keys()?;
            Ok((rec, sealed, keys))
        })
    } else {
        Ok((None, false, vec![]))
    };
    match loaded {
        Ok((wallet, sealed_phrase, keys)) => StoreReport {
            path,
            exists,
            wallet,
            sealed_phrase,
            keys,
            error: None,
        },
        Err(e) => StoreReport {
            path,
            exists,
            wallet: None,
            sealed_phrase: false,
            keys: vec![],
            error: Some(format!("{e:#}")),
        },
    }
}

async fn collect(paths: &VaultPaths) -> DoctorReport {
    let config_path = paths.config_file();
    let config_exists = config_path.exists();
    let (config_ok, config_err, cfg) = if config_exists {
        match try_parse_config(&config_path) {
            Ok(cfg) => (true, None, Some(cfg)),
            Err(e) => (false, Some(format!("{e:#}")), None),
        }
    } else {
        (false, None, None)
    };

    let custody_url = env_opt("SEEDVAULT_CUSTODY_URL")
        .or_else(|| cfg.as_ref().map(|c| c.custody.endpoint_url.clone()));
    let custody = match &custody_url {
        Some(u) if custody::endpoint_allowed(u) => {
            let (reachable, note) = check_custody_reachable(u).await;
            Some(CustodyReport { reachable, note })
        }
        Some(_) | None => None,
    };

    let audit_entries = crate::audit::read_recent(&paths.audit_log(), usize::MAX)
        .map(|v| v.len())
        .unwrap_or(0);

    let env = json!({
      "SEEDVAULT_CONFIG_DIR": env_opt("SEEDVAULT_CONFIG_DIR"),
      "SEEDVAULT_DATA_DIR": env_opt("SEEDVAULT_DATA_DIR"),
      "SEEDVAULT_CUSTODY_URL": env_opt("SEEDVAULT_CUSTODY_URL"),
      "SEEDVAULT_SOLANA_DERIVATION": env_opt("SEEDVAULT_SOLANA_DERIVATION"),
      "SEEDVAULT_MNEMONIC_WORDS": env_opt("SEEDVAULT_MNEMONIC_WORDS"),
      "SEEDVAULT_CUSTODY_TOKEN_set": env_set("SEEDVAULT_CUSTODY_TOKEN"),
      "SEEDVAULT_PASSWORD_set": env_set(crate::cli_output::PASSWORD_ENV),
    });

    DoctorReport {
        version: env!("CARGO_PKG_VERSION"),
        paths: paths.clone(),
        config: ConfigReport {
            path: config_path,
            exists: config_exists,
            parse_ok: config_ok,
            error: config_err,
            custody_url_allowed: custody_url.as_deref().map(custody::endpoint_allowed),
            custody_url,
            solana_derivation: cfg.as_ref().map(|c| c.derivation.solana.to_string()),
            mnemonic_words: cfg.as_ref().map(|c| c.derivation.mnemonic_words.into()),
        },
        store: collect_store(paths),
        audit_entries,
        custody,
        env,
    }
}

fn print_json(out: &mut impl std::io::Write, r: &DoctorReport) -> eyre::Result<()> {
    let s = serde_json::to_string_pretty(&json!({
      "ok": true,
      "version": r.version,
      "paths": {
        "config_dir": r.paths.config_dir,
        "data_dir": r.paths.data_dir,
        "log_file": r.paths.log_file,
      },
      "config": {
        "path": r.config.path,
        "exists": r.config.exists,
        "parse_ok": r.config.parse_ok,
        "error": r.config.error,
        "custody": {
          "endpoint_url": r.config.custody_url,
          "endpoint_allowed": r.config.custody_url_allowed,
        },
        "derivation": {
          "solana": r.config.solana_derivation,
          "mnemonic_words": r.config.mnemonic_words,
        },
      },
      "store": {
        "path": r.store.path,
        "exists": r.store.exists,
        "wallet": r.store.wallet,
        "sealed_phrase": r.store.sealed_phrase,
        "keys": r.store.keys,
        "error": r.store.error,
      },
      "audit": {
        "path": r.paths.audit_log(),
        "entries": r.audit_entries,
      },
      "custody_endpoint": r.custody.as_ref().map(|c| json!({
        "reachable": c.reachable,
        "note": c.note,
      })),
      "env": r.env,
      "hints": [
        "If store.wallet is null, run `seedvault create` or `seedvault import`.",
        "Plain http custody endpoints are only accepted on loopback hosts.",
        "seed-prefix Solana keys differ from standard Solana wallets; pick bip44 for portability.",
      ]
    }))
    .context("serialize doctor json")?;
    writeln!(out, "{s}").context("write doctor json")?;
    Ok(())
}

fn print_human(out: &mut impl std::io::Write, r: &DoctorReport) -> eyre::Result<()> {
    writeln!(out, "seedvault doctor (v{})", r.version).context("write header")?;
    writeln!(out).context("write newline")?;

    writeln!(out, "Paths:").context("write paths header")?;
    writeln!(out, "  config_dir: {}", r.paths.config_dir.display()).context("write paths")?;
    writeln!(out, "  data_dir:   {}", r.paths.data_dir.display()).context("write paths")?;
    writeln!(out, "  log_file:   {}", r.paths.log_file.display()).context("write paths")?;
    writeln!(out).context("write newline")?;

    writeln!(out, "Config:").context("write config header")?;
    writeln!(out, "  config.toml: {}", r.config.path.display()).context("write config")?;
    if !r.config.exists {
        writeln!(out, "  status: missing (will be created on first run)")
            .context("write config")?;
    } else if r.config.parse_ok {
        writeln!(
            out,
            "  status: ok (solana={}, words={})",
            r.config.solana_derivation.as_deref().unwrap_or("?"),
            r.config.mnemonic_words.unwrap_or_default()
        )
        .context("write config")?;
    } else {
        writeln!(out, "  status: parse failed").context("write config")?;
        if let Some(e) = &r.config.error {
            let first = e.lines().next().unwrap_or("parse error");
            writeln!(out, "  error: {first}").context("write config")?;
        }
    }
    writeln!(out).context("write newline")?;

    writeln!(out, "Custody endpoint:").context("write custody header")?;
    match (&r.config.custody_url, r.config.custody_url_allowed) {
        (Some(u), Some(true)) => {
            writeln!(out, "  url: {u}").context("write custody")?;
            if let Some(c) = &r.custody {
                writeln!(out, "  reachable: {}", c.reachable).context("write custody")?;
                if let Some(note) = &c.note {
                    writeln!(out, "  note: {note}").context("write custody")?;
                }
            }
        }
        (Some(u), _) => {
            writeln!(out, "  url: {u} (refused: use https or a loopback host)")
                .context("write custody")?;
        }
        (None, _) => {
            writeln!(out, "  status: unknown (config missing or parse failed)")
                .context("write custody")?;
        }
    }
    writeln!(out).context("write newline")?;

    writeln!(out, "Wallet:").context("write wallet header")?;
    writeln!(out, "  store: {}", r.store.path.display()).context("write wallet")?;
    match (&r.store.wallet, &r.store.error) {
        (_, Some(e)) => {
            let first = e.lines().next().unwrap_or("store error");
            writeln!(out, "  error: {first}").context("write wallet")?;
        }
        (Some(w), None) => {
            writeln!(out, "  ethereum: {}", w.ethereum_address).context("write wallet")?;
            writeln!(
                out,
                "  solana:   {} ({})",
                w.solana_public_key, w.solana_derivation
            )
            .context("write wallet")?;
            writeln!(out, "  custody:  {}", w.custody).context("write wallet")?;
            writeln!(out, "  sealed_phrase: {}", r.store.sealed_phrase)
                .context("write wallet")?;
        }
        (None, None) => {
            writeln!(out, "  none (run `seedvault create` or `seedvault import`)")
                .context("write wallet")?;
        }
    }
    writeln!(out, "  audit_entries: {}", r.audit_entries).context("write wallet")?;
    writeln!(out).context("write newline")?;

    writeln!(out, "Env (redacted):").context("write env header")?;
    for key in [
        "SEEDVAULT_CONFIG_DIR",
        "SEEDVAULT_DATA_DIR",
        "SEEDVAULT_CUSTODY_URL",
        "SEEDVAULT_SOLANA_DERIVATION",
    ] {
        writeln!(
            out,
            "  {key}: {:?}",
            r.env.get(key).and_then(|v| v.as_str())
        )
        .context("write env")?;
    }
    for key in ["SEEDVAULT_CUSTODY_TOKEN_set", "SEEDVAULT_PASSWORD_set"] {
        writeln!(
            out,
            "  {key}: {}",
            r.env
                .get(key)
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false)
        )
        .context("write env")?;
    }
    Ok(())
}

pub async fn run(paths: &VaultPaths, as_json: bool) -> eyre::Result<()> {
    let report = collect(paths).await;
    let mut out = std::io::stdout().lock();
    if as_json {
        print_json(&mut out, &report)?;
    } else {
        print_human(&mut out, &report)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_dirs_report_no_wallet() -> eyre::Result<()> {
        let dir = tempfile::tempdir()?;
        let paths = VaultPaths::from_dirs(dir.path().join("c"), dir.path().join("d"));
        let r = collect(&paths).await;
        assert!(!r.config.exists);
        assert!(!r.store.exists);
        assert!(r.store.error.is_none());
        assert!(!dir.path().join("c").exists());
        assert!(!dir.path().join("d").exists());
        assert!(r.store.wallet.is_none());
        assert!(r.store.keys.is_empty());
        assert_eq!(r.audit_entries, 0);

        let mut buf = Vec::new();
        print_json(&mut buf, &r)?;
        let v: serde_json::Value = serde_json::from_slice(&buf)?;
        assert_eq!(v.get("ok").and_then(serde_json::Value::as_bool), Some(true));

        let mut human = Vec::new();
        print_human(&mut human, &r)?;
        assert!(String::from_utf8_lossy(&human).contains("seedvault doctor"));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn existing_store_is_read_without_touching_permissions() -> eyre::Result<()> {
        use std::os::unix::fs::PermissionsExt as _;

        let dir = tempfile::tempdir()?;
        let data = dir.path().join("d");
        fs::create_dir_all(&data)?;
        fs::set_permissions(&data, fs::Permissions::from_mode(0o755))?;
        let paths = VaultPaths::from_dirs(dir.path().join("c"), data.clone());
        fs::write(paths.store_file(), r#"{"ethereumAddress":"0xabc"}"#)?;

        let r = collect_store(&paths);
        assert!(r.exists);
        assert!(r.error.is_none());
        assert_eq!(r.keys, vec![crate::kv::KEY_ETHEREUM_ADDRESS.to_owned()]);
        assert!(!r.sealed_phrase);
        assert_eq!(fs::metadata(&data)?.permissions().mode() & 0o777, 0o755);
        assert!(!paths.store_lock_file().exists());
        Ok(())
    }

    #[tokio::test]
    async fn closed_port_is_not_reachable() -> eyre::Result<()> {
        let addr = {
            let l = std::net::TcpListener::bind("127.0.0.1:0")?;
            l.local_addr()?
        };
        let (ok, note) =
            check_custody_reachable(&format!("http://{addr}/api/auth/wallet")).await;
        assert!(!ok);
        assert!(note.is_some());
        Ok(())
    }
}

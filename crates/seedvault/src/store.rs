use crate::{config::VaultConfig, paths::VaultPaths};
use eyre::Context as _;
use std::{fs, path::PathBuf};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

/// Apply `SEEDVAULT_*` overrides to the config. Blank values are ignored, unparsable ones are
/// logged and ignored.
fn apply_overrides(cfg: &mut VaultConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |var: &str| {
        lookup(var)
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    };

    if let Some(v) = get("SEEDVAULT_CUSTODY_URL") {
        cfg.custody.endpoint_url = v;
    }
    if let Some(v) = get("SEEDVAULT_CUSTODY_TOKEN") {
        cfg.custody.auth_token = Some(v);
    }
    if let Some(v) = get("SEEDVAULT_SOLANA_DERIVATION") {
        match v.parse() {
            Ok(style) => cfg.derivation.solana = style,
            Err(e) => tracing::warn!(error = %e, "ignoring SEEDVAULT_SOLANA_DERIVATION"),
        }
    }
    if let Some(v) = get("SEEDVAULT_MNEMONIC_WORDS") {
        match v.parse() {
            Ok(words) => cfg.derivation.mnemonic_words = words,
            Err(e) => tracing::warn!(error = %e, "ignoring SEEDVAULT_MNEMONIC_WORDS"),
        }
    }
}

fn apply_env_overrides(cfg: &mut VaultConfig) {
    apply_overrides(cfg, |var| std::env::var(var).ok());
}

impl ConfigStore {
    pub fn new(paths: &VaultPaths) -> Self {
        Self {
            path: paths.config_file(),
        }
    }

    pub fn load_or_init_default(&self) -> eyre::Result<VaultConfig> {
        if !self.path.exists() {
            let cfg = VaultConfig::default();
            self.save(&cfg)?;
            let mut cfg = cfg;
            apply_env_overrides(&mut cfg);
            return Ok(cfg);
        }

        let s = fs::read_to_string(&self.path).context("read config.toml")?;
        let mut cfg: VaultConfig = toml::from_str(&s).context("parse config.toml")?;
        apply_env_overrides(&mut cfg);
        Ok(cfg)
    }

    pub fn save(&self, cfg: &VaultConfig) -> eyre::Result<()> {
        let s = toml::to_string_pretty(cfg).context("serialize config.toml")?;
        crate::fsutil::write_private_string_atomic(&self.path, &s).context("write config.toml")?;
        Ok(())
    }
}

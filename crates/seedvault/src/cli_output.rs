//! Centralised helpers for user-facing CLI I/O. Human text goes to stderr; stdout is reserved
//! for machine-readable JSON.

use crate::{
    errors::VaultError,
    password::{self, StrengthLabel},
};
use eyre::Context as _;
use secrecy::{ExposeSecret as _, SecretString};
use std::io::{BufRead as _, IsTerminal as _, Read as _, Write as _};

pub const PASSWORD_ENV: &str = "SEEDVAULT_PASSWORD";

fn stderr_write(s: &str) {
    let mut stderr = std::io::stderr().lock();
    if stderr.write_all(s.as_bytes()).is_err() {
        return;
    }
    let _flush = stderr.flush();
}

fn stderr_writeln(s: &str) {
    let mut stderr = std::io::stderr().lock();
    if stderr.write_all(s.as_bytes()).is_err() {
        return;
    }
    if stderr.write_all(b"\n").is_err() {
        return;
    }
    let _flush = stderr.flush();
}

fn interactive() -> bool {
    std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
}

/// Write one JSON document to stdout.
pub fn print_json(v: &serde_json::Value) -> eyre::Result<()> {
    let s = serde_json::to_string_pretty(v).context("serialize output")?;
    writeln!(std::io::stdout().lock(), "{s}").context("write stdout")?;
    Ok(())
}

/// Show the recovery phrase as a numbered grid, with the usual warning.
pub fn print_recovery_phrase(phrase: &str) {
    let mut grid = String::new();
    for (i, w) in phrase.split_whitespace().enumerate() {
        let cell = format!("{:>2}. {w:<10}", i + 1);
        grid.push_str(&cell);
        if (i + 1) % 4 == 0 {
            grid.push('\n');
        }
    }
    stderr_writeln(
        "Recovery phrase (write it down; anyone with these words controls the wallet):\n",
    );
    stderr_writeln(grid.trim_end());
    stderr_writeln("");
}

pub fn print_wallet_summary(ethereum: &str, solana: &str, solana_derivation: &str) {
    stderr_writeln(&format!(
        "Ethereum : {ethereum}\nSolana   : {solana} ({solana_derivation})"
    ));
}

pub fn notice(msg: &str) {
    stderr_writeln(msg);
}

/// Ask for confirmation on stderr, or bail if non-interactive and `yes` is not set.
pub fn confirm_or_bail(yes: bool, question: &str) -> eyre::Result<()> {
    if yes {
        return Ok(());
    }
    if !interactive() {
        eyre::bail!("refusing to continue non-interactively; pass --yes");
    }

    stderr_write(&format!("{question} [y/N] "));
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| eyre::eyre!("read confirmation: {e}"))?;
    let ans = line.trim().to_ascii_lowercase();
    if ans == "y" || ans == "yes" {
        Ok(())
    } else {
        eyre::bail!("cancelled")
    }
}

fn password_from_env() -> Option<zeroize::Zeroizing<String>> {
    std::env::var(PASSWORD_ENV)
        .ok()
        .filter(|s| !s.is_empty())
        .map(zeroize::Zeroizing::new)
}

fn prompt_hidden(prompt: &str) -> eyre::Result<SecretString> {
    let s = rpassword::prompt_password(prompt).context("read password")?;
    Ok(SecretString::new(s.into()))
}

/// Password for an existing vault: `SEEDVAULT_PASSWORD`, else a hidden prompt.
pub fn read_password(prompt: &str) -> eyre::Result<SecretString> {
    if let Some(p) = password_from_env() {
        return Ok(SecretString::new(p.as_str().into()));
    }
    if !interactive() {
        return Err(VaultError::PasswordRequired.into());
    }
    prompt_hidden(prompt)
}

/// New password plus its confirmation. From the environment both are the same value.
pub fn read_new_password() -> eyre::Result<(SecretString, SecretString)> {
    if let Some(p) = password_from_env() {
        return Ok((
            SecretString::new(p.as_str().into()),
            SecretString::new(p.as_str().into()),
        ));
    }
    if !interactive() {
        return Err(VaultError::PasswordRequired.into());
    }
    let p = prompt_hidden("New wallet password: ")?;
    let label = StrengthLabel::for_score(password::strength(p.expose_secret()));
    stderr_writeln(&format!("Password strength: {}", label.as_str()));
    let c = prompt_hidden("Confirm password: ")?;
    Ok((p, c))
}

/// Recovery phrase for import: piped stdin, else a hidden prompt. Never taken from argv.
pub fn read_mnemonic() -> eyre::Result<zeroize::Zeroizing<String>> {
    if std::io::stdin().is_terminal() {
        let s = rpassword::prompt_password("Recovery phrase: ").context("read phrase")?;
        return Ok(zeroize::Zeroizing::new(s));
    }
    let mut s = zeroize::Zeroizing::new(String::new());
    std::io::stdin()
        .lock()
        .read_to_string(&mut s)
        .context("read phrase from stdin")?;
    Ok(s)
}

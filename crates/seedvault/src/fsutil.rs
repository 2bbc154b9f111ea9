//! Private-permission file helpers shared by the store, config and audit log.

use eyre::Context as _;
use rand::Rng as _;
use std::{
    fs::{self, File, OpenOptions},
    io::Write as _,
    path::{Path, PathBuf},
};

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt as _, PermissionsExt as _};

pub const MODE_DIR_PRIVATE: u32 = 0o700;
pub const MODE_FILE_PRIVATE: u32 = 0o600;

fn is_symlink(p: &Path) -> eyre::Result<bool> {
    let md = fs::symlink_metadata(p).with_context(|| format!("stat {}", p.display()))?;
    Ok(md.file_type().is_symlink())
}

pub fn ensure_private_dir(dir: &Path) -> eyre::Result<()> {
    if dir.exists() {
        if is_symlink(dir)? {
            eyre::bail!("refusing to use symlinked directory: {}", dir.display());
        }
        if !dir.is_dir() {
            eyre::bail!("expected directory at {}", dir.display());
        }
    } else {
        fs::create_dir_all(dir).with_context(|| format!("create dir {}", dir.display()))?;
    }

    #[cfg(unix)]
    {
        let md = fs::metadata(dir).with_context(|| format!("stat {}", dir.display()))?;
        // Clamp to 0700 when group/other have any bits.
        if (md.permissions().mode() & 0o077) != 0 {
            fs::set_permissions(dir, fs::Permissions::from_mode(MODE_DIR_PRIVATE))
                .with_context(|| format!("chmod 700 {}", dir.display()))?;
        }
    }

    Ok(())
}

fn private_open_options() -> OpenOptions {
    let mut oo = OpenOptions::new();
    #[cfg(unix)]
    {
        oo.mode(MODE_FILE_PRIVATE);
    }
    oo
}

fn sibling_tmp(path: &Path, parent: &Path) -> PathBuf {
    let base = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("file");
    let mut suffix = [0_u8; 8];
    rand::rng().fill_bytes(&mut suffix);
    parent.join(format!(".{base}.tmp.{}", hex::encode(suffix)))
}

/// Write `bytes` to `path` through a fresh `0600` temp file and an atomic rename.
pub fn write_private_atomic(path: &Path, bytes: &[u8]) -> eyre::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| eyre::eyre!("missing parent for {}", path.display()))?;
    ensure_private_dir(parent)?;

    if path.exists() && is_symlink(path)? {
        eyre::bail!("refusing to write to symlink: {}", path.display());
    }

    let tmp = sibling_tmp(path, parent);
    let mut f = private_open_options()
        .create_new(true)
        .write(true)
        .open(&tmp)
        .with_context(|| format!("open temp {}", tmp.display()))?;
    f.write_all(bytes)
        .with_context(|| format!("write {}", tmp.display()))?;
    f.sync_all()
        .with_context(|| format!("fsync {}", tmp.display()))?;
    drop(f);

    #[cfg(windows)]
    {
        if path.exists() {
            fs::remove_file(path).with_context(|| format!("remove existing {}", path.display()))?;
        }
    }

    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}

pub fn write_private_string_atomic(path: &Path, s: &str) -> eyre::Result<()> {
    write_private_atomic(path, s.as_bytes())
}

/// Append one line to a `0600` file, creating it if needed.
pub fn append_private_line(path: &Path, line: &str) -> eyre::Result<()> {
    if let Some(parent) = path.parent() {
        ensure_private_dir(parent)?;
    }
    let mut f = private_open_options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    writeln!(f, "{line}").with_context(|| format!("append {}", path.display()))?;
    Ok(())
}

/// Open (creating if needed) a `0600` file used only as a lock handle.
pub fn open_lock_file(path: &Path) -> eyre::Result<File> {
    if let Some(parent) = path.parent() {
        ensure_private_dir(parent)?;
    }
    private_open_options()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("open lock file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_replaces_contents() -> eyre::Result<()> {
        let dir = tempfile::tempdir()?;
        let p = dir.path().join("nested").join("f.json");
        write_private_string_atomic(&p, "one")?;
        write_private_string_atomic(&p, "two")?;
        assert_eq!(fs::read_to_string(&p)?, "two");
        // No temp files left behind.
        let leftovers = fs::read_dir(dir.path().join("nested"))?.count();
        assert_eq!(leftovers, 1);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn files_and_dirs_are_private() -> eyre::Result<()> {
        let dir = tempfile::tempdir()?;
        let sub = dir.path().join("d");
        let p = sub.join("log.jsonl");
        append_private_line(&p, "{}")?;
        let fmode = fs::metadata(&p)?.permissions().mode() & 0o777;
        let dmode = fs::metadata(&sub)?.permissions().mode() & 0o777;
        assert_eq!(fmode, MODE_FILE_PRIVATE);
        assert_eq!(dmode & 0o077, 0);
        Ok(())
    }
}

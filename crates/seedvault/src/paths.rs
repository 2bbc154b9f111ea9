use directories::ProjectDirs;
use eyre::ContextCompat as _;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct VaultPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub log_file: PathBuf,
}

impl VaultPaths {
    pub fn discover() -> eyre::Result<Self> {
        // Test/CI override knobs.
        if let (Ok(data_dir), Ok(config_dir)) = (
            std::env::var("SEEDVAULT_DATA_DIR"),
            std::env::var("SEEDVAULT_CONFIG_DIR"),
        ) {
            return Ok(Self::from_dirs(
                PathBuf::from(config_dir),
                PathBuf::from(data_dir),
            ));
        }

        // macOS: ~/Library/Application Support/seedvault
        // Linux: ~/.config/seedvault + ~/.local/share/seedvault
        // Windows: %APPDATA%\\seedvault
        let proj =
            ProjectDirs::from("", "", "seedvault").context("failed to resolve project dirs")?;
        Ok(Self::from_dirs(
            proj.config_dir().to_path_buf(),
            proj.data_dir().to_path_buf(),
        ))
    }

    pub fn from_dirs(config_dir: PathBuf, data_dir: PathBuf) -> Self {
        let log_file = data_dir.join("seedvault.log.jsonl");
        Self {
            config_dir,
            data_dir,
            log_file,
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Key-value store backing wallet records and sealed secrets.
    pub fn store_file(&self) -> PathBuf {
        self.data_dir.join("store.json")
    }

    pub fn store_lock_file(&self) -> PathBuf {
        self.data_dir.join("store.lock")
    }

    pub fn audit_log(&self) -> PathBuf {
        self.data_dir.join("audit.jsonl")
    }

    pub fn ensure_private_dirs(&self) -> eyre::Result<()> {
        crate::fsutil::ensure_private_dir(&self.config_dir)?;
        crate::fsutil::ensure_private_dir(&self.data_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_files_live_under_their_dirs() {
        let p = VaultPaths::from_dirs(PathBuf::from("/c"), PathBuf::from("/d"));
        assert_eq!(p.config_file(), PathBuf::from("/c/config.toml"));
        assert_eq!(p.store_file(), PathBuf::from("/d/store.json"));
        assert_eq!(p.audit_log(), PathBuf::from("/d/audit.jsonl"));
        assert_eq!(p.log_file, PathBuf::from("/d/seedvault.log.jsonl"));
    }
}

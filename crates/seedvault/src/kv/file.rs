use super::KvStore;
use crate::{errors::VaultError, paths::VaultPaths};
use eyre::Context as _;
use fs2::FileExt;
use std::{
    collections::BTreeMap,
    fs::{self, File},
    path::PathBuf,
};

/// JSON map in a single `0600` file. Writers take an exclusive lock on a sibling lock file and
/// fail fast with [`VaultError::StoreBusy`] when another process holds it.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileStore {
    pub fn open(paths: &VaultPaths) -> eyre::Result<Self> {
        paths.ensure_private_dirs()?;
        Ok(Self {
            path: paths.store_file(),
            lock_path: paths.store_lock_file(),
        })
    }

    /// Handle for inspecting an existing store. Creates nothing on disk until written to.
    pub fn reader(paths: &VaultPaths) -> Self {
        Self {
            path: paths.store_file(),
            lock_path: paths.store_lock_file(),
        }
    }

    fn acquire_write_lock(&self) -> eyre::Result<File> {
        let f = crate::fsutil::open_lock_file(&self.lock_path)?;
        match f.try_lock_exclusive() {
            Ok(()) => Ok(f),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                Err(VaultError::StoreBusy.into())
            }
            Err(e) => Err(eyre::Report::new(e).wrap_err("lock store")),
        }
    }

    fn release_lock(f: &File) -> eyre::Result<()> {
        FileExt::unlock(f).context("unlock store")
    }

    fn load(&self) -> eyre::Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let s = fs::read_to_string(&self.path).context("read store.json")?;
        if s.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&s).context("parse store.json")
    }

    fn save(&self, map: &BTreeMap<String, String>) -> eyre::Result<()> {
        let s = serde_json::to_string_pretty(map).context("serialize store.json")?;
        crate::fsutil::write_private_string_atomic(&self.path, &s).context("write store.json")
    }

    fn update(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> eyre::Result<()> {
        let lock = self.acquire_write_lock()?;
        let res = self.load().and_then(|mut map| {
            f(&mut map);
            self.save(&map)
        });
        Self::release_lock(&lock)?;
        res
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> eyre::Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> eyre::Result<()> {
        self.update(|m| {
            m.insert(key.to_owned(), value.to_owned());
        })
    }

    fn clear(&mut self) -> eyre::Result<()> {
        self.update(BTreeMap::clear)
    }

    fn keys(&self) -> eyre::Result<Vec<String>> {
        Ok(self.load()?.into_keys().collect())
    }

    fn set_many(&mut self, entries: &[(&str, &str)]) -> eyre::Result<()> {
        self.update(|m| {
            for (k, v) in entries {
                m.insert((*k).to_owned(), (*v).to_owned());
            }
        })
    }
}

//! File-backed ledger with file locking.
//!
//! The whole ledger is one JSON snapshot. Locking happens on a sidecar
//! `<ledger>.lock` file, which never gets replaced: reads take it shared,
//! commits take it exclusive for the whole load-merge-save. Saves go through
//! a temp file that is synced and renamed over the snapshot, so a batch of
//! writes lands all at once or not at all.
//!
//! Nothing is cached between calls. Every read and every commit starts from
//! what is on disk, so handles in other threads or processes only ever
//! replace the keys they actually wrote.

use crate::ledger::Ledger;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// On-disk layout of the ledger file
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

/// Ledger persisted as a single JSON file
///
/// Values must be UTF-8 text; anything else is rejected as a write failure.
#[derive(Debug)]
pub struct FileLedger {
    path: PathBuf,
    lock_path: PathBuf,
    /// Exclusive lock held for this handle's lifetime, see [`FileLedger::open_locked`]
    held: Option<File>,
}

impl FileLedger {
    /// Open the ledger at `path`
    ///
    /// A missing file is an empty ledger. A file that cannot be parsed is an
    /// error: this is the system of record and is never replaced silently.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut lock_path = path.clone().into_os_string();
        lock_path.push(".lock");

        let ledger = Self {
            path,
            lock_path: PathBuf::from(lock_path),
            held: None,
        };
        let snapshot = ledger.shared(|| ledger.load())?;
        tracing::debug!(
            "Opened ledger {:?} with {} entries",
            ledger.path,
            snapshot.entries.len()
        );
        Ok(ledger)
    }

    /// Open the ledger and keep it exclusively locked until dropped
    ///
    /// Other handles block on every read and commit meanwhile, so a whole
    /// read-modify-write operation runs without interleaving.
    pub fn open_locked(path: impl Into<PathBuf>) -> Result<Self> {
        let mut ledger = Self::open(path)?;
        let lock = ledger.lock_file()?;
        lock.lock_exclusive()?;
        tracing::debug!("Holding ledger lock {:?}", ledger.lock_path);
        ledger.held = Some(lock);
        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Time of the last successful save, if any
    pub fn updated_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.shared(|| self.load())?.updated_at)
    }

    fn lock_file(&self) -> Result<File> {
        if let Some(parent) = self.lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&self.lock_path)?;
        Ok(file)
    }

    fn shared<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        // Nothing to coordinate until someone has written
        if self.held.is_some() || !self.path.exists() {
            return f();
        }
        let lock = self.lock_file()?;
        lock.lock_shared()?;
        let result = f();
        lock.unlock()?;
        result
    }

    fn exclusive<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        if self.held.is_some() {
            return f();
        }
        let lock = self.lock_file()?;
        lock.lock_exclusive()?;
        let result = f();
        lock.unlock()?;
        result
    }

    /// Read the snapshot currently on disk; caller holds the lock
    fn load(&self) -> Result<Snapshot> {
        if !self.path.exists() {
            return Ok(Snapshot::default());
        }

        let mut contents = String::new();
        File::open(&self.path)?.read_to_string(&mut contents)?;
        if contents.trim().is_empty() {
            return Ok(Snapshot::default());
        }

        serde_json::from_str(&contents).map_err(|e| {
            Error::store_read(
                &self.path.display().to_string(),
                format!("corrupt ledger file: {}", e),
            )
        })
    }

    /// Replace the snapshot on disk; caller holds the exclusive lock
    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let temp = NamedTempFile::new_in(dir)?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(snapshot)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved ledger to {:?}", self.path);
        Ok(())
    }

    /// Merge `writes` into the on-disk snapshot and save it
    fn commit(&self, writes: Vec<(String, String)>) -> Result<()> {
        self.exclusive(|| {
            let mut snapshot = self.load()?;
            for (key, value) in writes {
                snapshot.entries.insert(key, value);
            }
            snapshot.updated_at = Some(Utc::now());
            self.save(&snapshot)
        })
    }
}

impl Drop for FileLedger {
    fn drop(&mut self) {
        if let Some(lock) = self.held.take() {
            let _ = lock.unlock();
        }
    }
}

fn text(key: &str, value: &[u8]) -> Result<String> {
    String::from_utf8(value.to_vec())
        .map_err(|_| Error::store_write(key, "value is not valid UTF-8"))
}

impl Ledger for FileLedger {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let snapshot = self.shared(|| self.load())?;
        Ok(snapshot
            .entries
            .get(key)
            .map(|value| value.as_bytes().to_vec()))
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<()> {
        let value = text(key, value)?;
        self.commit(vec![(key.to_string(), value)])
            .map_err(|e| Error::store_write(key, e))
    }

    fn apply(&mut self, writes: Vec<(String, Vec<u8>)>) -> Result<()> {
        let writes = writes
            .into_iter()
            .map(|(key, value)| text(&key, &value).map(|value| (key, value)))
            .collect::<Result<Vec<_>>>()?;
        let keys = writes
            .iter()
            .map(|(key, _)| key.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        self.commit(writes).map_err(|e| Error::store_write(&keys, e))
    }
}

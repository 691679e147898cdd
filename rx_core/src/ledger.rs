//! Key/value ledger abstraction.
//!
//! The lifecycle engine only ever talks to a [`Ledger`]. Backends:
//! - [`MemoryLedger`]: in-process map, used by tests and embedders
//! - [`crate::store::FileLedger`]: locked JSON snapshot on disk
//!
//! [`Transaction`] buffers writes over any backend and hands them to
//! [`Ledger::apply`] in one batch on commit.

use crate::Result;
use std::collections::BTreeMap;

/// Key/value store the lifecycle engine reads and writes through
pub trait Ledger {
    /// Fetch the value under `key`, `None` if absent
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value
    fn put(&mut self, key: &str, value: &[u8]) -> Result<()>;

    /// Commit a batch of writes in order
    ///
    /// The default applies them one by one. Backends that can persist a
    /// batch in one step override this to make it all-or-nothing.
    fn apply(&mut self, writes: Vec<(String, Vec<u8>)>) -> Result<()> {
        for (key, value) in writes {
            self.put(&key, &value)?;
        }
        Ok(())
    }
}

/// In-memory ledger backed by an ordered map
#[derive(Clone, Debug, Default)]
pub struct MemoryLedger {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All keys currently stored, in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl Ledger for MemoryLedger {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// Write-buffering overlay over another ledger
///
/// Reads see this transaction's own pending writes first. Nothing reaches
/// the inner ledger until [`Transaction::commit`]; dropping the transaction
/// discards the buffered writes.
pub struct Transaction<'a, L: Ledger + ?Sized> {
    inner: &'a mut L,
    pending: Vec<(String, Vec<u8>)>,
}

impl<'a, L: Ledger + ?Sized> Transaction<'a, L> {
    pub fn begin(inner: &'a mut L) -> Self {
        Self {
            inner,
            pending: Vec::new(),
        }
    }

    /// Number of writes buffered so far
    pub fn pending_writes(&self) -> usize {
        self.pending.len()
    }

    /// Hand every buffered write to the inner ledger as one batch
    pub fn commit(self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let count = self.pending.len();
        self.inner.apply(self.pending)?;
        tracing::debug!("Committed {} ledger writes", count);
        Ok(())
    }
}

impl<L: Ledger + ?Sized> Ledger for Transaction<'_, L> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.pending.iter().rev().find(|(k, _)| k == key) {
            Some((_, value)) => Ok(Some(value.clone())),
            None => self.inner.get(key),
        }
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.pending.push((key.to_string(), value.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_get_missing() {
        let ledger = MemoryLedger::new();
        assert_eq!(ledger.get("nope").unwrap(), None);
    }

    #[test]
    fn test_memory_last_writer_wins() {
        let mut ledger = MemoryLedger::new();
        ledger.put("k", b"one").unwrap();
        ledger.put("k", b"two").unwrap();
        assert_eq!(ledger.get("k").unwrap(), Some(b"two".to_vec()));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_transaction_reads_own_writes() {
        let mut ledger = MemoryLedger::new();
        ledger.put("k", b"base").unwrap();

        let mut tx = Transaction::begin(&mut ledger);
        assert_eq!(tx.get("k").unwrap(), Some(b"base".to_vec()));
        tx.put("k", b"staged").unwrap();
        tx.put("k", b"restaged").unwrap();
        assert_eq!(tx.get("k").unwrap(), Some(b"restaged".to_vec()));
        assert_eq!(tx.pending_writes(), 2);
        tx.commit().unwrap();

        assert_eq!(ledger.get("k").unwrap(), Some(b"restaged".to_vec()));
    }

    #[test]
    fn test_dropped_transaction_discards_writes() {
        let mut ledger = MemoryLedger::new();
        {
            let mut tx = Transaction::begin(&mut ledger);
            tx.put("k", b"staged").unwrap();
        }
        assert!(ledger.is_empty());
    }
}

//! Key-value database seam and the abort-only scratch scope
//!
//! The storage engine itself is external. `MemoryDatabase` is an in-memory
//! reference implementation of the seam with buffered, all-or-nothing writes.

use crate::error::Result;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::debug;

/// Key prefix for out-points marked spent inside a scope.
pub const SPENT_OUTPOINT_PREFIX: u8 = b's';

/// A database transaction. Writes are invisible to the database until commit.
pub trait Transacting: Send {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;
    fn del(&mut self, key: &[u8]) -> Result<()>;
    fn commit(self: Box<Self>) -> Result<()>;
    fn abort(self: Box<Self>);
}

pub trait Database: Send + Sync {
    fn begin(&self) -> Result<Box<dyn Transacting + '_>>;
}

/// Database scope that can only be rolled back.
///
/// The wrapped transaction is aborted when the scope is dropped, so no exit
/// path (early return, `?`, unwinding) can leak a write.
pub struct ScratchScope<'a> {
    inner: Option<Box<dyn Transacting + 'a>>,
}

impl<'a> ScratchScope<'a> {
    pub fn begin(db: &'a dyn Database) -> Result<Self> {
        Ok(Self {
            inner: Some(db.begin()?),
        })
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match &self.inner {
            Some(txn) => txn.get(key),
            None => Ok(None),
        }
    }

    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        match &mut self.inner {
            Some(txn) => txn.put(key, value),
            None => Ok(()),
        }
    }

    pub fn del(&mut self, key: &[u8]) -> Result<()> {
        match &mut self.inner {
            Some(txn) => txn.del(key),
            None => Ok(()),
        }
    }

    /// Roll back now instead of at drop.
    pub fn abort(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(txn) = self.inner.take() {
            txn.abort();
            debug!("scratch scope aborted");
        }
    }
}

impl Drop for ScratchScope<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

/// In-memory ordered key-value store.
#[derive(Default)]
pub struct MemoryDatabase {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.read().get(key).cloned()
    }

    pub fn put(&self, key: &[u8], value: &[u8]) {
        self.data.write().insert(key.to_vec(), value.to_vec());
    }

    pub fn del(&self, key: &[u8]) {
        self.data.write().remove(key);
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Database for MemoryDatabase {
    fn begin(&self) -> Result<Box<dyn Transacting + '_>> {
        Ok(Box::new(MemoryTransaction {
            db: self,
            writes: BTreeMap::new(),
        }))
    }
}

/// Buffered writes over a `MemoryDatabase`; `None` marks a deletion.
struct MemoryTransaction<'a> {
    db: &'a MemoryDatabase,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl Transacting for MemoryTransaction<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.writes.get(key) {
            Some(pending) => Ok(pending.clone()),
            None => Ok(self.db.get(key)),
        }
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn del(&mut self, key: &[u8]) -> Result<()> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction { db, writes } = *self;
        let mut data = db.data.write();
        for (key, value) in writes {
            match value {
                Some(value) => {
                    data.insert(key, value);
                }
                None => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn abort(self: Box<Self>) {}
}

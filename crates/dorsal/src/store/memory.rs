use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use parking_lot::Mutex;

use crate::{
    error::StoreError,
    partition::PartitionKey,
    sequence::{Sequence, Version},
    store::{CasOutcome, SequenceStore},
};

/// A process-local [`SequenceStore`] backed by a mutex-guarded map.
///
/// Cloning a `MemoryStore` yields another handle to the same records, which
/// makes it a convenient stand-in for durable storage: drop an allocator,
/// build a new one over a clone, and the sequence resumes where the committed
/// state left off.
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Lock held only for the duration of one read or one conditional write
/// - ❌ Not durable across process restarts
///
/// ## Recommended When
/// - Tests and benchmarks
/// - Single-process deployments that can afford to lose the sequence on exit
///
/// ## See Also
/// - [`PgSequenceStore`] (feature `postgres`)
///
/// [`PgSequenceStore`]: crate::PgSequenceStore
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    records: Mutex<HashMap<PartitionKey, Sequence>>,
    available: AtomicBool,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches the simulated store on or off.
    ///
    /// While off, every operation fails with [`StoreError::Unavailable`] and
    /// nothing is read or written.
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.inner.available.load(Ordering::SeqCst)
    }

    /// Returns a copy of the committed record for `key`.
    pub fn get(&self, key: &PartitionKey) -> Option<Sequence> {
        self.inner.records.lock().get(key).cloned()
    }

    /// Number of partitions with at least one committed allocation.
    pub fn len(&self) -> usize {
        self.inner.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(StoreError::unavailable("memory store switched off"))
        }
    }
}

impl SequenceStore for MemoryStore {
    async fn load(&self, key: &PartitionKey) -> Result<Option<Sequence>, StoreError> {
        self.ensure_available()?;
        Ok(self.get(key))
    }

    async fn compare_and_swap(
        &self,
        expected: Version,
        next: &Sequence,
    ) -> Result<CasOutcome, StoreError> {
        self.ensure_available()?;

        let mut records = self.inner.records.lock();
        let stored = records
            .get(next.partition_key())
            .map_or(Version::ZERO, Sequence::version);
        if stored != expected {
            return Ok(CasOutcome::Conflict);
        }
        records.insert(next.partition_key().clone(), next.clone());
        Ok(CasOutcome::Applied)
    }
}

use core::future::Future;

use crate::{
    error::StoreError,
    partition::PartitionKey,
    sequence::{Sequence, Version},
};

/// Outcome of a conditional write that reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The stored version matched and the new record is durable.
    Applied,
    /// The stored version did not match. Nothing was written.
    Conflict,
}

/// A minimal interface for durable sequence storage.
///
/// Implementations only need two primitives: a point read and a conditional
/// write equivalent to "update the row where key = K and version = V, else
/// report a conflict". All concurrency control lives in the store; the
/// allocator never keeps authoritative state in memory.
pub trait SequenceStore: Send + Sync {
    /// Reads the durable record for `key`, or `None` if nothing was ever
    /// committed for it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the store cannot be read and
    /// [`StoreError::Corrupt`] when the stored row is invalid.
    fn load(
        &self,
        key: &PartitionKey,
    ) -> impl Future<Output = Result<Option<Sequence>, StoreError>> + Send;

    /// Persists `next` if the stored version for `next.partition_key()` is
    /// still `expected`.
    ///
    /// When `expected` is [`Version::ZERO`] the write is an insert that only
    /// succeeds if no record exists yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the write was certainly not
    /// applied and [`StoreError::Indeterminate`] if it may have been.
    fn compare_and_swap(
        &self,
        expected: Version,
        next: &Sequence,
    ) -> impl Future<Output = Result<CasOutcome, StoreError>> + Send;
}

impl<St> SequenceStore for std::sync::Arc<St>
where
    St: SequenceStore,
{
    fn load(
        &self,
        key: &PartitionKey,
    ) -> impl Future<Output = Result<Option<Sequence>, StoreError>> + Send {
        (**self).load(key)
    }

    fn compare_and_swap(
        &self,
        expected: Version,
        next: &Sequence,
    ) -> impl Future<Output = Result<CasOutcome, StoreError>> + Send {
        (**self).compare_and_swap(expected, next)
    }
}

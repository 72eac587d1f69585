use core::{future::Future, marker::PhantomData, time::Duration};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    allocator::AllocatorConfig,
    error::{Error, Result, StoreError},
    futures::{SleepProvider, TokioSleep},
    partition::PartitionKey,
    sequence::{Sequence, WriterToken},
    status::AllocStatus,
    store::{CasOutcome, SequenceStore},
};

/// A sequence allocator using optimistic concurrency over a durable store.
///
/// Every allocation is one or more passes of
/// `READ_CURRENT -> COMPUTE_NEXT -> CONDITIONAL_WRITE`. A pass whose write
/// loses to a concurrent caller is retried after a backoff pause, up to the
/// configured attempt budget. Values are returned only once the store has
/// confirmed the write, and nothing is cached between passes: a fresh
/// allocator over the same store resumes exactly at the last committed value.
///
/// The allocator holds no lock of its own. Partitions never wait on each
/// other; callers on the same partition only contend inside the store.
///
/// ## See Also
/// - [`SequenceStore`] for the storage contract
/// - [`TokioSleep`] / [`TokioYield`] for backoff strategies
///
/// [`TokioYield`]: crate::TokioYield
///
/// # Example
/// ```
/// use dorsal::{Allocator, AllocatorConfig, Error, MemoryStore};
///
/// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
/// let store = MemoryStore::new();
/// let allocator: Allocator<_> = Allocator::new(store.clone(), AllocatorConfig::default());
///
/// assert_eq!(allocator.allocate("event-42").await, Ok(1));
/// assert!(matches!(
///     allocator.allocate("").await,
///     Err(Error::InvalidPartitionKey { .. })
/// ));
///
/// // A new allocator over the same store picks up where the old one stopped.
/// let restarted: Allocator<_> = Allocator::new(store, AllocatorConfig::default());
/// assert_eq!(restarted.allocate("event-42").await, Ok(2));
/// # });
/// ```
pub struct Allocator<St, S = TokioSleep>
where
    St: SequenceStore,
    S: SleepProvider,
{
    store: St,
    config: AllocatorConfig,
    _sleep: PhantomData<fn() -> S>,
}

impl<St, S> Allocator<St, S>
where
    St: SequenceStore,
    S: SleepProvider,
{
    pub const fn new(store: St, config: AllocatorConfig) -> Self {
        Self {
            store,
            config,
            _sleep: PhantomData,
        }
    }

    pub const fn store(&self) -> &St {
        &self.store
    }

    pub const fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Returns the next value of `partition_key`'s sequence.
    ///
    /// The first call for an unseen key returns `1`. Every successful call
    /// advances the sequence; calling again never returns the same value.
    /// Dropping the returned future after the write committed does not give
    /// the value back: it stays issued.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPartitionKey`] if the key is unusable. The store is
    ///   not touched.
    /// - [`Error::ContentionExhausted`] if every attempt lost to a concurrent
    ///   writer.
    /// - [`Error::StorageUnavailable`] if the store could not be read, or a
    ///   write outcome could not be resolved.
    /// - [`Error::SequenceExhausted`] if the partition has no values left.
    pub async fn allocate(&self, partition_key: &str) -> Result<u64> {
        let key = PartitionKey::new(partition_key)?;
        self.allocate_key(&key).await
    }

    /// Like [`Self::allocate`], for a key that is already validated.
    ///
    /// # Errors
    ///
    /// See [`Self::allocate`].
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(partition_key = %key))
    )]
    pub async fn allocate_key(&self, key: &PartitionKey) -> Result<u64> {
        let max_attempts = self.config.max_attempts();
        for attempt in 1..=max_attempts {
            match self.try_allocate_once(key).await? {
                AllocStatus::Committed { value } => return Ok(value),
                AllocStatus::Conflict if attempt < max_attempts => {
                    let pause = self.config.backoff().delay_for(attempt);
                    #[cfg(feature = "tracing")]
                    tracing::debug!(attempt, ?pause, "conflicting write, retrying");
                    S::sleep_for(pause).await;
                }
                AllocStatus::Conflict => {}
            }
        }

        #[cfg(feature = "tracing")]
        tracing::warn!(attempts = max_attempts, "retry budget exhausted");
        Err(Error::ContentionExhausted {
            partition_key: key.clone(),
            attempts: max_attempts,
        })
    }

    /// Makes exactly one allocation pass for `key`.
    ///
    /// Reads the durable record, computes its successor and writes it
    /// conditioned on the version that was read. A write whose outcome is
    /// unknown is resolved by re-reading before this returns.
    ///
    /// # Returns
    /// - `Ok(AllocStatus::Committed { value })`: `value` is durably issued
    /// - `Ok(AllocStatus::Conflict)`: nothing was issued to this caller;
    ///   re-run to try again
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageUnavailable`] or [`Error::SequenceExhausted`]
    /// as described on [`Self::allocate`].
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "trace", skip_all, fields(partition_key = %key))
    )]
    pub async fn try_allocate_once(&self, key: &PartitionKey) -> Result<AllocStatus> {
        let current = self
            .read(key)
            .await?
            .unwrap_or_else(|| Sequence::vacant(key.clone()));
        let next = current.advance(WriterToken::random())?;

        let outcome = self
            .bounded("conditional write", |reason| StoreError::Indeterminate { reason }, || {
                self.store.compare_and_swap(current.version(), &next)
            })
            .await;

        match outcome {
            Ok(CasOutcome::Applied) => Ok(AllocStatus::Committed {
                value: next.last_issued(),
            }),
            Ok(CasOutcome::Conflict) => Ok(AllocStatus::Conflict),
            Err(StoreError::Indeterminate { reason }) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(%reason, "write outcome unknown, re-reading");
                #[cfg(not(feature = "tracing"))]
                let _ = reason;
                self.resolve(&current, &next).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The last value issued for `partition_key`, or `0` if none.
    ///
    /// Always read from the store; never creates a record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPartitionKey`] or [`Error::StorageUnavailable`].
    pub async fn current(&self, partition_key: &str) -> Result<u64> {
        let key = PartitionKey::new(partition_key)?;
        Ok(self.read(&key).await?.map_or(0, |seq| seq.last_issued()))
    }

    /// Decides what happened to a write whose outcome is unknown.
    ///
    /// Only a record carrying exactly our version and writer token proves the
    /// commit. If the sequence has since moved further, our write may or may
    /// not be among the versions in between; reporting a conflict keeps the
    /// value issued-but-unseen rather than risk handing out someone else's.
    async fn resolve(&self, current: &Sequence, next: &Sequence) -> Result<AllocStatus> {
        let Some(stored) = self.read(next.partition_key()).await? else {
            return Ok(AllocStatus::Conflict);
        };

        if stored.version() == next.version() && stored.writer() == next.writer() {
            #[cfg(feature = "tracing")]
            tracing::debug!(value = next.last_issued(), "unknown write had committed");
            return Ok(AllocStatus::Committed {
                value: next.last_issued(),
            });
        }

        #[cfg(feature = "tracing")]
        if stored.version() != current.version() {
            tracing::warn!(
                written = %next.version(),
                stored = %stored.version(),
                "sequence moved past an unresolved write; value may be skipped"
            );
        }
        #[cfg(not(feature = "tracing"))]
        let _ = current;
        Ok(AllocStatus::Conflict)
    }

    async fn read(&self, key: &PartitionKey) -> Result<Option<Sequence>> {
        let loaded = self
            .bounded("read", |reason| StoreError::Unavailable { reason }, || {
                self.store.load(key)
            })
            .await?;
        Ok(loaded)
    }

    /// Runs one store round trip under the configured timeout, mapping an
    /// elapsed timer through `on_timeout`.
    async fn bounded<T, F, Fut>(
        &self,
        operation: &'static str,
        on_timeout: fn(String) -> StoreError,
        op: F,
    ) -> Result<T, StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let limit: Duration = self.config.store_timeout();
        match tokio::time::timeout(limit, op()).await {
            Ok(result) => result,
            Err(_) => Err(on_timeout(format!("{operation} timed out after {limit:?}"))),
        }
    }
}

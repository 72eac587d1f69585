use crate::partition::PartitionKey;

/// A result type defaulting to the allocator's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that an [`Allocator`] can surface to its caller.
///
/// None of these variants leaves a partially applied write behind: a value is
/// only ever returned after its commit was confirmed, and every error means
/// that this call did not observe a committed allocation.
///
/// [`Allocator`]: crate::Allocator
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The partition key was empty, blank, too long or contained control
    /// characters. The store was not touched.
    #[error("invalid partition key: {reason}")]
    InvalidPartitionKey {
        /// Which validation rule rejected the key.
        reason: &'static str,
    },

    /// Every attempt lost the conditional write to a concurrent caller and
    /// the retry budget ran out. The caller may retry the whole call.
    #[error("partition `{partition_key}` still contended after {attempts} attempts")]
    ContentionExhausted {
        /// The contended partition.
        partition_key: PartitionKey,
        /// How many read/write passes were made.
        attempts: u32,
    },

    /// The durable store could not be reached, timed out on a read, or held
    /// an unreadable record. Not retried internally.
    #[error("sequence store unavailable: {0}")]
    StorageUnavailable(#[from] StoreError),

    /// The partition already issued the largest value every backend can
    /// persist.
    #[error("partition `{partition_key}` has no values left to issue")]
    SequenceExhausted {
        /// The exhausted partition.
        partition_key: PartitionKey,
    },
}

impl Error {
    /// Whether retrying the whole call later can succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ContentionExhausted { .. } | Self::StorageUnavailable(_)
        )
    }
}

/// Failures reported by a [`SequenceStore`] backend.
///
/// The split between [`StoreError::Unavailable`] and
/// [`StoreError::Indeterminate`] matters to the allocator: the former means
/// nothing was written, the latter means a write may have landed and must be
/// resolved by re-reading before anything else happens.
///
/// [`SequenceStore`]: crate::SequenceStore
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The operation definitely did not take effect.
    #[error("store unreachable: {reason}")]
    Unavailable {
        /// Backend-specific description.
        reason: String,
    },

    /// A write was sent but its outcome is unknown.
    #[error("write outcome unknown: {reason}")]
    Indeterminate {
        /// Backend-specific description.
        reason: String,
    },

    /// A stored record violates the sequence invariants.
    #[error("corrupt sequence record: {reason}")]
    Corrupt {
        /// What was wrong with the record.
        reason: String,
    },
}

impl StoreError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn indeterminate(reason: impl Into<String>) -> Self {
        Self::Indeterminate {
            reason: reason.into(),
        }
    }

    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::Corrupt {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_errors_are_retryable() {
        let key = PartitionKey::new("event-1").unwrap();

        assert!(
            Error::ContentionExhausted {
                partition_key: key.clone(),
                attempts: 3
            }
            .is_retryable()
        );
        assert!(Error::from(StoreError::unavailable("down")).is_retryable());
        assert!(!Error::InvalidPartitionKey { reason: "empty" }.is_retryable());
        assert!(!Error::SequenceExhausted { partition_key: key }.is_retryable());
    }

    #[test]
    fn display_names_the_partition() {
        let err = Error::ContentionExhausted {
            partition_key: PartitionKey::new("event-42").unwrap(),
            attempts: 8,
        };
        assert_eq!(
            err.to_string(),
            "partition `event-42` still contended after 8 attempts"
        );
    }
}

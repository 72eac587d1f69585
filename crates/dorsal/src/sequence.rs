use core::fmt;

use crate::{
    error::{Error, Result},
    partition::PartitionKey,
};

/// Largest value a sequence may issue.
///
/// Bounded by the widest integer every backend can persist (PostgreSQL
/// `BIGINT`).
pub const MAX_ISSUABLE: u64 = i64::MAX as u64;

/// Concurrency token of a durable [`Sequence`] record.
///
/// [`Version::ZERO`] stands for "no record yet"; each committed write stores
/// the successor of the version it was conditioned on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Version(u64);

impl Version {
    pub const ZERO: Self = Self(0);

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Random tag written alongside each attempted commit.
///
/// When a store cannot say whether a write landed, the allocator re-reads the
/// record and compares tokens to recognise its own commit. Zero is reserved
/// for records that were never written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WriterToken(u64);

impl WriterToken {
    pub const NONE: Self = Self(0);

    pub fn random() -> Self {
        Self(rand::random::<u64>().max(1))
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn to_raw(self) -> u64 {
        self.0
    }
}

/// The durable state of one partition's counter.
///
/// A `Sequence` is a plain value: stores persist it, the allocator computes
/// the next one with [`Sequence::advance`]. Nothing in memory is ever treated
/// as the source of truth.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sequence {
    partition_key: PartitionKey,
    last_issued: u64,
    version: Version,
    writer: WriterToken,
}

impl Sequence {
    /// The state of a partition that has never allocated: nothing issued,
    /// nothing stored.
    pub const fn vacant(partition_key: PartitionKey) -> Self {
        Self {
            partition_key,
            last_issued: 0,
            version: Version::ZERO,
            writer: WriterToken::NONE,
        }
    }

    /// Rebuilds a record read back from storage.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] when `last_issued` exceeds
    /// [`MAX_ISSUABLE`] or a record with issued values claims
    /// [`Version::ZERO`].
    ///
    /// [`StoreError::Corrupt`]: crate::StoreError::Corrupt
    pub fn from_parts(
        partition_key: PartitionKey,
        last_issued: u64,
        version: Version,
        writer: WriterToken,
    ) -> Result<Self, crate::StoreError> {
        if last_issued > MAX_ISSUABLE {
            return Err(crate::StoreError::corrupt(format!(
                "`{partition_key}` issued {last_issued}, above the representable maximum"
            )));
        }
        if version == Version::ZERO && last_issued != 0 {
            return Err(crate::StoreError::corrupt(format!(
                "`{partition_key}` issued {last_issued} without a version"
            )));
        }
        Ok(Self {
            partition_key,
            last_issued,
            version,
            writer,
        })
    }

    /// Computes the record that issues the next value.
    ///
    /// The returned record carries `last_issued + 1`, the successor version,
    /// and `writer` as its ownership tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SequenceExhausted`] once [`MAX_ISSUABLE`] has been
    /// issued.
    pub fn advance(&self, writer: WriterToken) -> Result<Self> {
        if self.last_issued >= MAX_ISSUABLE {
            return Err(Error::SequenceExhausted {
                partition_key: self.partition_key.clone(),
            });
        }
        Ok(Self {
            partition_key: self.partition_key.clone(),
            last_issued: self.last_issued + 1,
            version: self.version.next(),
            writer,
        })
    }

    pub const fn partition_key(&self) -> &PartitionKey {
        &self.partition_key
    }

    pub const fn last_issued(&self) -> u64 {
        self.last_issued
    }

    pub const fn version(&self) -> Version {
        self.version
    }

    pub const fn writer(&self) -> WriterToken {
        self.writer
    }

    /// Whether this record has never been persisted.
    pub const fn is_vacant(&self) -> bool {
        self.version.get() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;

    fn key() -> PartitionKey {
        PartitionKey::new("event-42").unwrap()
    }

    #[test]
    fn vacant_starts_at_zero() {
        let seq = Sequence::vacant(key());
        assert_eq!(seq.last_issued(), 0);
        assert_eq!(seq.version(), Version::ZERO);
        assert!(seq.is_vacant());
    }

    #[test]
    fn advance_moves_value_and_version_together() {
        let writer = WriterToken::from_raw(7);
        let first = Sequence::vacant(key()).advance(writer).unwrap();
        let second = first.advance(WriterToken::from_raw(9)).unwrap();

        assert_eq!((first.last_issued(), first.version().get()), (1, 1));
        assert_eq!((second.last_issued(), second.version().get()), (2, 2));
        assert_eq!(first.writer(), writer);
        assert!(!first.is_vacant());
    }

    #[test]
    fn advance_stops_at_the_representable_maximum() {
        let full = Sequence::from_parts(key(), MAX_ISSUABLE, Version::new(3), WriterToken::NONE)
            .unwrap();
        assert_eq!(
            full.advance(WriterToken::random()),
            Err(Error::SequenceExhausted {
                partition_key: key()
            })
        );
    }

    #[test]
    fn from_parts_rejects_impossible_records() {
        assert!(matches!(
            Sequence::from_parts(key(), MAX_ISSUABLE + 1, Version::new(1), WriterToken::NONE),
            Err(StoreError::Corrupt { .. })
        ));
        assert!(matches!(
            Sequence::from_parts(key(), 5, Version::ZERO, WriterToken::NONE),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn random_writer_tokens_are_never_none() {
        for _ in 0..1024 {
            assert_ne!(WriterToken::random(), WriterToken::NONE);
        }
    }
}

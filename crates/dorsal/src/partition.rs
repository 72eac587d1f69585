use core::{fmt, str::FromStr};

use crate::error::{Error, Result};

/// Longest accepted partition key, in bytes.
pub const MAX_PARTITION_KEY_LEN: usize = 255;

/// The identifier that scopes one independent sequence, e.g. an event id.
///
/// Keys are stored and compared verbatim: `"Event-1"` and `"event-1"` are
/// different partitions, and surrounding whitespace is kept as-is. The only
/// rejected keys are the ones that cannot be a stable identifier.
///
/// # Example
/// ```
/// use dorsal::{Error, PartitionKey};
///
/// let key = PartitionKey::new("event-42").unwrap();
/// assert_eq!(key.as_str(), "event-42");
///
/// assert!(matches!(PartitionKey::new(""), Err(Error::InvalidPartitionKey { .. })));
/// assert!(matches!(PartitionKey::new("  "), Err(Error::InvalidPartitionKey { .. })));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct PartitionKey(String);

impl PartitionKey {
    /// Validates and wraps a partition key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPartitionKey`] when the key is empty, made only
    /// of whitespace, longer than [`MAX_PARTITION_KEY_LEN`] bytes, or contains
    /// an ASCII control character.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        Self::validate(&key)?;
        Ok(Self(key))
    }

    fn validate(key: &str) -> Result<()> {
        let reason = if key.is_empty() {
            "empty"
        } else if key.trim().is_empty() {
            "blank"
        } else if key.len() > MAX_PARTITION_KEY_LEN {
            "longer than 255 bytes"
        } else if key.chars().any(|c| c.is_ascii_control()) {
            "contains control characters"
        } else {
            return Ok(());
        };
        Err(Error::InvalidPartitionKey { reason })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PartitionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for PartitionKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for PartitionKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for PartitionKey {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PartitionKey> for String {
    fn from(key: PartitionKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejection(key: &str) -> &'static str {
        match PartitionKey::new(key) {
            Err(Error::InvalidPartitionKey { reason }) => reason,
            other => panic!("expected rejection for {key:?}, got {other:?}"),
        }
    }

    #[test]
    fn accepts_ordinary_identifiers() {
        for key in ["event-42", "42", "Tour de France 2026", "évènement"] {
            assert_eq!(PartitionKey::new(key).unwrap().as_str(), key);
        }
    }

    #[test]
    fn rejects_unusable_keys() {
        assert_eq!(rejection(""), "empty");
        assert_eq!(rejection(" \t "), "blank");
        assert_eq!(rejection("event\n42"), "contains control characters");
        assert_eq!(rejection(&"x".repeat(MAX_PARTITION_KEY_LEN + 1)), "longer than 255 bytes");
    }

    #[test]
    fn keeps_keys_verbatim() {
        let padded = PartitionKey::new(" event-1").unwrap();
        let plain = PartitionKey::new("event-1").unwrap();
        assert_ne!(padded, plain);
        assert_eq!(padded.to_string(), " event-1");
    }

    #[test]
    fn max_length_is_inclusive() {
        let key = "k".repeat(MAX_PARTITION_KEY_LEN);
        assert!(PartitionKey::new(key).is_ok());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialization_validates() {
        let key: PartitionKey = serde_json::from_str("\"event-9\"").unwrap();
        assert_eq!(key.as_str(), "event-9");
        assert!(serde_json::from_str::<PartitionKey>("\"\"").is_err());
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"event-9\"");
    }
}

//! PostgreSQL-backed sequence storage.
//!
//! Each partition is one row in `dorsal_sequences`. The conditional write is a
//! plain `UPDATE ... WHERE version = $expected` (or an
//! `INSERT ... ON CONFLICT DO NOTHING` for the first allocation), so every
//! statement runs in its own implicit transaction and row-level locking is
//! left entirely to PostgreSQL.

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::{
    error::StoreError,
    partition::PartitionKey,
    sequence::{Sequence, Version, WriterToken},
    store::{CasOutcome, SequenceStore},
};

const CREATE_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS dorsal_sequences (
        partition_key TEXT PRIMARY KEY,
        last_issued BIGINT NOT NULL CHECK (last_issued >= 0),
        version BIGINT NOT NULL CHECK (version >= 0),
        writer BIGINT NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
";

const SELECT_SEQUENCE: &str = r"
    SELECT last_issued, version, writer
    FROM dorsal_sequences
    WHERE partition_key = $1
";

const INSERT_SEQUENCE: &str = r"
    INSERT INTO dorsal_sequences (partition_key, last_issued, version, writer)
    VALUES ($1, $2, $3, $4)
    ON CONFLICT (partition_key) DO NOTHING
";

const UPDATE_SEQUENCE: &str = r"
    UPDATE dorsal_sequences
    SET last_issued = $2, version = $3, writer = $4, updated_at = now()
    WHERE partition_key = $1 AND version = $5
";

/// A [`SequenceStore`] persisting sequences in PostgreSQL.
///
/// ## Features
/// - ✅ Durable across restarts and shared by every process using the table
/// - ✅ Optimistic concurrency through versioned conditional updates
///
/// Call [`PgSequenceStore::migrate`] once before first use to create the
/// table.
#[derive(Clone, Debug)]
pub struct PgSequenceStore {
    pool: PgPool,
}

impl PgSequenceStore {
    /// Connects a new pool to `database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the database cannot be reached.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))?;
        Ok(Self::from_pool(pool))
    }

    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the `dorsal_sequences` table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the statement fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))?;
        Ok(())
    }
}

impl SequenceStore for PgSequenceStore {
    async fn load(&self, key: &PartitionKey) -> Result<Option<Sequence>, StoreError> {
        let row: Option<(i64, i64, i64)> = sqlx::query_as(SELECT_SEQUENCE)
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))?;

        row.map(|(last_issued, version, writer)| decode(key, last_issued, version, writer))
            .transpose()
    }

    async fn compare_and_swap(
        &self,
        expected: Version,
        next: &Sequence,
    ) -> Result<CasOutcome, StoreError> {
        let last_issued = encode(next.last_issued())?;
        let version = encode(next.version().get())?;
        #[allow(clippy::cast_possible_wrap)]
        let writer = next.writer().to_raw() as i64;

        let query = if expected == Version::ZERO {
            sqlx::query(INSERT_SEQUENCE)
                .bind(next.partition_key().as_str())
                .bind(last_issued)
                .bind(version)
                .bind(writer)
        } else {
            sqlx::query(UPDATE_SEQUENCE)
                .bind(next.partition_key().as_str())
                .bind(last_issued)
                .bind(version)
                .bind(writer)
                .bind(encode(expected.get())?)
        };

        let result = query.execute(&self.pool).await.map_err(classify_write_error)?;
        if result.rows_affected() == 1 {
            Ok(CasOutcome::Applied)
        } else {
            Ok(CasOutcome::Conflict)
        }
    }
}

fn encode(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::corrupt(format!("{value} does not fit BIGINT")))
}

fn decode(
    key: &PartitionKey,
    last_issued: i64,
    version: i64,
    writer: i64,
) -> Result<Sequence, StoreError> {
    let to_u64 = |column: &str, value: i64| {
        u64::try_from(value)
            .map_err(|_| StoreError::corrupt(format!("`{key}` has negative {column} {value}")))
    };
    #[allow(clippy::cast_sign_loss)]
    let writer = WriterToken::from_raw(writer as u64);
    Sequence::from_parts(
        key.clone(),
        to_u64("last_issued", last_issued)?,
        Version::new(to_u64("version", version)?),
        writer,
    )
}

/// Splits write failures into "never sent" and "outcome unknown".
///
/// Only failures that happen before the statement reaches the server are
/// safe to report as [`StoreError::Unavailable`].
fn classify_write_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Configuration(_)
        | sqlx::Error::Tls(_) => StoreError::unavailable(err.to_string()),
        // A database error means the server rejected the statement, so
        // nothing was committed.
        sqlx::Error::Database(_) => StoreError::unavailable(err.to_string()),
        _ => StoreError::indeterminate(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> PartitionKey {
        PartitionKey::new("event-42").unwrap()
    }

    #[test]
    fn writer_tokens_round_trip_through_bigint() {
        let token = WriterToken::from_raw(u64::MAX - 3);
        #[allow(clippy::cast_possible_wrap)]
        let stored = token.to_raw() as i64;
        let seq = decode(&key(), 1, 1, stored).unwrap();
        assert_eq!(seq.writer(), token);
    }

    #[test]
    fn negative_columns_are_corrupt() {
        assert!(matches!(
            decode(&key(), -1, 1, 0),
            Err(StoreError::Corrupt { .. })
        ));
        assert!(matches!(
            decode(&key(), 1, -1, 0),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn pool_failures_are_not_ambiguous() {
        assert!(matches!(
            classify_write_error(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable { .. }
        ));
        assert!(matches!(
            classify_write_error(sqlx::Error::Protocol("reset".into())),
            StoreError::Indeterminate { .. }
        ));
    }
}

use dorsal::{
    CasOutcome, MemoryStore, PartitionKey, PgSequenceStore, Sequence, SequenceStore, StoreError,
    Version,
};

use crate::config::ServerConfig;

/// The store backing the service, picked at start-up.
#[derive(Clone, Debug)]
pub enum AnyStore {
    Memory(MemoryStore),
    Postgres(PgSequenceStore),
}

impl AnyStore {
    /// Connects to PostgreSQL when a database URL is configured, creating the
    /// table if needed; otherwise falls back to an in-memory store.
    pub async fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let Some(url) = config.database_url.as_deref() else {
            tracing::warn!("DATABASE_URL not set, sequences are kept in memory only");
            return Ok(Self::Memory(MemoryStore::new()));
        };

        let store = PgSequenceStore::connect(url, config.database_max_connections).await?;
        store.migrate().await?;
        tracing::info!(
            max_connections = config.database_max_connections,
            "connected to PostgreSQL"
        );
        Ok(Self::Postgres(store))
    }

    pub const fn backend(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }
}

impl SequenceStore for AnyStore {
    async fn load(&self, key: &PartitionKey) -> Result<Option<Sequence>, StoreError> {
        match self {
            Self::Memory(store) => store.load(key).await,
            Self::Postgres(store) => store.load(key).await,
        }
    }

    async fn compare_and_swap(
        &self,
        expected: Version,
        next: &Sequence,
    ) -> Result<CasOutcome, StoreError> {
        match self {
            Self::Memory(store) => store.compare_and_swap(expected, next).await,
            Self::Postgres(store) => store.compare_and_swap(expected, next).await,
        }
    }
}

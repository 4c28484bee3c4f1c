//! Storage factory for runtime storage selection

use std::sync::Arc;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::domain::storage::{Storage, StorageEntity};
use crate::domain::DomainError;

use super::in_memory::InMemoryStorage;
use super::postgres::{PostgresConfig, PostgresStorage};

/// Supported storage types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageType {
    /// In-memory storage (for testing/development)
    InMemory,
    /// PostgreSQL storage
    Postgres,
}

impl StorageType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Some(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            _ => None,
        }
    }
}

/// Storage backend handle shared by every entity table
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    Postgres(PgPool),
}

/// Factory for creating storage instances
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    /// Opens the backend once so all tables share a single connection pool
    pub async fn connect(
        storage_type: &StorageType,
        config: &PostgresConfig,
    ) -> Result<StorageBackend, DomainError> {
        match storage_type {
            StorageType::InMemory => Ok(StorageBackend::InMemory),
            StorageType::Postgres => {
                let pool = PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .min_connections(config.min_connections)
                    .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
                    .idle_timeout(std::time::Duration::from_secs(config.idle_timeout_secs))
                    .connect(&config.url)
                    .await
                    .map_err(|e| {
                        DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e))
                    })?;

                Ok(StorageBackend::Postgres(pool))
            }
        }
    }

    /// Creates a storage for one entity table on the given backend
    pub async fn create<E>(
        backend: &StorageBackend,
        table_name: &str,
    ) -> Result<Arc<dyn Storage<E>>, DomainError>
    where
        E: StorageEntity + 'static,
    {
        match backend {
            StorageBackend::InMemory => Ok(Arc::new(InMemoryStorage::<E>::new())),
            StorageBackend::Postgres(pool) => {
                let storage = PostgresStorage::<E>::new(pool.clone(), table_name);
                storage.ensure_table().await?;
                Ok(Arc::new(storage))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_type_from_str() {
        assert_eq!(StorageType::from_str("memory"), Some(StorageType::InMemory));
        assert_eq!(StorageType::from_str("in-memory"), Some(StorageType::InMemory));
        assert_eq!(StorageType::from_str("postgres"), Some(StorageType::Postgres));
        assert_eq!(StorageType::from_str("pg"), Some(StorageType::Postgres));
        assert_eq!(StorageType::from_str("sqlite"), None);
    }

    #[tokio::test]
    async fn test_in_memory_backend_needs_no_connection() {
        let backend = StorageFactory::connect(&StorageType::InMemory, &PostgresConfig::default())
            .await
            .unwrap();

        assert!(matches!(backend, StorageBackend::InMemory));
    }
}

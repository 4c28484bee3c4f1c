//! PostgreSQL storage: one JSONB row per entity, keyed by its numeric id

use std::fmt::Debug;
use std::marker::PhantomData;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::storage::{Storage, StorageEntity, StorageKey};
use crate::domain::DomainError;

/// Postgres SQLSTATE for a unique constraint violation
const UNIQUE_VIOLATION: &str = "23505";

/// Connection pool settings
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/pmp_recipe_runner".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

/// SQL for one entity table
#[derive(Debug, Clone, PartialEq)]
struct TableStatements {
    create_table: String,
    select_one: String,
    select_all: String,
    insert: String,
    update: String,
    delete: String,
    exists: String,
    max_key: String,
}

impl TableStatements {
    fn for_table(table: &str) -> Self {
        Self {
            create_table: format!(
                "CREATE TABLE IF NOT EXISTS {table} (\
                 key BIGINT PRIMARY KEY, \
                 data JSONB NOT NULL, \
                 created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(), \
                 updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW())"
            ),
            select_one: format!("SELECT data FROM {table} WHERE key = $1"),
            select_all: format!("SELECT data FROM {table} ORDER BY key"),
            insert: format!("INSERT INTO {table} (key, data) VALUES ($1, $2)"),
            update: format!(
                "UPDATE {table} SET data = $2, updated_at = NOW() WHERE key = $1"
            ),
            delete: format!("DELETE FROM {table} WHERE key = $1"),
            exists: format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE key = $1) AS found"),
            max_key: format!("SELECT COALESCE(MAX(key), 0)::BIGINT AS max_key FROM {table}"),
        }
    }
}

/// Entity storage backed by a shared connection pool
pub struct PostgresStorage<E>
where
    E: StorageEntity,
{
    pool: PgPool,
    table_name: String,
    sql: TableStatements,
    _phantom: PhantomData<E>,
}

impl<E> Debug for PostgresStorage<E>
where
    E: StorageEntity,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStorage")
            .field("table_name", &self.table_name)
            .finish()
    }
}

impl<E> PostgresStorage<E>
where
    E: StorageEntity,
{
    pub fn new(pool: PgPool, table_name: impl Into<String>) -> Self {
        let table_name = table_name.into();
        Self {
            pool,
            sql: TableStatements::for_table(&table_name),
            table_name,
            _phantom: PhantomData,
        }
    }

    pub async fn ensure_table(&self) -> Result<(), DomainError> {
        sqlx::query(&self.sql.create_table)
            .execute(&self.pool)
            .await
            .map_err(|e| query_error("create table", &self.table_name, e))?;

        Ok(())
    }
}

fn query_error(operation: &str, table: &str, e: sqlx::Error) -> DomainError {
    DomainError::storage(format!("Failed to {} in {}: {}", operation, table, e))
}

fn encode<E: StorageEntity>(entity: &E) -> Result<Value, DomainError> {
    serde_json::to_value(entity)
        .map_err(|e| DomainError::storage(format!("Failed to serialize entity: {}", e)))
}

fn decode<E: StorageEntity>(data: Value) -> Result<E, DomainError> {
    serde_json::from_value(data)
        .map_err(|e| DomainError::storage(format!("Failed to deserialize entity: {}", e)))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION)
}

#[async_trait]
impl<E> Storage<E> for PostgresStorage<E>
where
    E: StorageEntity + 'static,
{
    async fn get(&self, key: &E::Key) -> Result<Option<E>, DomainError> {
        let row = sqlx::query(&self.sql.select_one)
            .bind(key.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_error("get entity", &self.table_name, e))?;

        row.map(|row| decode(row.get("data"))).transpose()
    }

    async fn list(&self) -> Result<Vec<E>, DomainError> {
        let rows = sqlx::query(&self.sql.select_all)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| query_error("list entities", &self.table_name, e))?;

        rows.into_iter().map(|row| decode(row.get("data"))).collect()
    }

    async fn create(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().value();

        sqlx::query(&self.sql.insert)
            .bind(key)
            .bind(encode(&entity)?)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DomainError::conflict(format!(
                        "{} row {} already exists",
                        self.table_name, key
                    ))
                } else {
                    query_error("create entity", &self.table_name, e)
                }
            })?;

        Ok(entity)
    }

    async fn update(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().value();

        let result = sqlx::query(&self.sql.update)
            .bind(key)
            .bind(encode(&entity)?)
            .execute(&self.pool)
            .await
            .map_err(|e| query_error("update entity", &self.table_name, e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "{} row {} not found",
                self.table_name, key
            )));
        }

        Ok(entity)
    }

    async fn delete(&self, key: &E::Key) -> Result<bool, DomainError> {
        let result = sqlx::query(&self.sql.delete)
            .bind(key.value())
            .execute(&self.pool)
            .await
            .map_err(|e| query_error("delete entity", &self.table_name, e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists(&self, key: &E::Key) -> Result<bool, DomainError> {
        let row = sqlx::query(&self.sql.exists)
            .bind(key.value())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| query_error("check existence", &self.table_name, e))?;

        Ok(row.get("found"))
    }

    async fn max_key(&self) -> Result<i64, DomainError> {
        let row = sqlx::query(&self.sql.max_key)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| query_error("read max key", &self.table_name, e))?;

        Ok(row.get("max_key"))
    }
}

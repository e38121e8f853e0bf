//! PostgreSQL implementation of the DocumentStorage trait.

use async_trait::async_trait;
use medimart_core::Collection;
use medimart_storage::{DocumentStorage, FindQuery, StorageError, StorageResult, StoredDocument};
use serde_json::Value;
use sqlx_postgres::PgPool;

use crate::config::PostgresConfig;
use crate::migrations;
use crate::pool;
use crate::queries::crud;

/// Stores every collection in one JSONB table keyed by `(collection, id)`.
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Connects and, when configured, applies embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created or migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, StorageError> {
        let pool = pool::create_pool(&config).await?;

        if config.run_migrations {
            migrations::run(&pool).await?;
        }

        Ok(Self { pool })
    }

    /// Wraps an existing pool. Migrations are not run.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStorage for PostgresStorage {
    async fn insert(&self, collection: Collection, document: Value) -> StorageResult<StoredDocument> {
        crud::insert(&self.pool, collection, document).await
    }

    async fn get(&self, collection: Collection, id: &str) -> StorageResult<Option<StoredDocument>> {
        crud::read(&self.pool, collection, id).await
    }

    async fn replace(
        &self,
        collection: Collection,
        id: &str,
        document: Value,
    ) -> StorageResult<StoredDocument> {
        crud::replace(&self.pool, collection, id, document).await
    }

    async fn patch(
        &self,
        collection: Collection,
        id: &str,
        fields: Value,
    ) -> StorageResult<StoredDocument> {
        crud::patch(&self.pool, collection, id, fields).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> StorageResult<()> {
        crud::delete(&self.pool, collection, id).await
    }

    async fn find(&self, collection: Collection, query: &FindQuery) -> StorageResult<Vec<StoredDocument>> {
        crud::find(&self.pool, collection, query).await
    }

    async fn count(&self, collection: Collection, query: &FindQuery) -> StorageResult<u64> {
        crud::count(&self.pool, collection, query).await
    }

    async fn ping(&self) -> StorageResult<()> {
        crud::ping(&self.pool).await
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

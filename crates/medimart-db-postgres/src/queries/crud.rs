//! Statements for single-document operations and queries.

use medimart_core::Collection;
use medimart_storage::document::{merge_fields, prepare_new, prepare_replacement, storage_now};
use medimart_storage::{FindQuery, StorageError, StoredDocument};
use serde_json::Value;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::{PgPool, PgTransaction};
use time::OffsetDateTime;

use super::filter::{self, Bind};
use crate::error::sqlx_to_storage;

type Row = (String, Value, OffsetDateTime, OffsetDateTime);

/// Binds collected parameters in order.
macro_rules! bind_all {
    ($q:expr, $binds:expr) => {{
        let mut q = $q;
        for bind in $binds {
            q = match bind {
                Bind::Text(v) => q.bind(v),
                Bind::Path(v) => q.bind(v),
                Bind::Json(v) => q.bind(v),
                Bind::Int(v) => q.bind(v),
            };
        }
        q
    }};
}

fn to_stored(collection: Collection, row: Row) -> StoredDocument {
    let (id, document, created_at, updated_at) = row;
    StoredDocument {
        id,
        collection,
        document,
        created_at,
        updated_at,
    }
}

pub async fn insert(
    pool: &PgPool,
    collection: Collection,
    document: Value,
) -> Result<StoredDocument, StorageError> {
    let now = storage_now();
    let (id, document) = prepare_new(collection, document, now)?;

    let row: Option<Row> = query_as(
        r#"INSERT INTO documents (collection, id, resource, created_at, updated_at)
           VALUES ($1, $2, $3, $4, $4)
           ON CONFLICT (collection, id) DO NOTHING
           RETURNING id, resource, created_at, updated_at"#,
    )
    .bind(collection.as_str())
    .bind(&id)
    .bind(&document)
    .bind(now)
    .fetch_optional(pool)
    .await
    .map_err(sqlx_to_storage)?;

    row.map(|r| to_stored(collection, r))
        .ok_or_else(|| StorageError::already_exists(collection, id))
}

pub async fn read(
    pool: &PgPool,
    collection: Collection,
    id: &str,
) -> Result<Option<StoredDocument>, StorageError> {
    let row: Option<Row> = query_as(
        r#"SELECT id, resource, created_at, updated_at
           FROM documents WHERE collection = $1 AND id = $2"#,
    )
    .bind(collection.as_str())
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(sqlx_to_storage)?;

    Ok(row.map(|r| to_stored(collection, r)))
}

/// Locks the row for the rest of the transaction.
async fn lock_existing(
    tx: &mut PgTransaction<'_>,
    collection: Collection,
    id: &str,
) -> Result<(Value, OffsetDateTime), StorageError> {
    let row: Option<(Value, OffsetDateTime)> = query_as(
        r#"SELECT resource, created_at FROM documents
           WHERE collection = $1 AND id = $2 FOR UPDATE"#,
    )
    .bind(collection.as_str())
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(sqlx_to_storage)?;

    row.ok_or_else(|| StorageError::not_found(collection, id))
}

async fn write_locked(
    tx: &mut PgTransaction<'_>,
    collection: Collection,
    id: &str,
    document: Value,
    created_at: OffsetDateTime,
) -> Result<StoredDocument, StorageError> {
    let now = storage_now();
    let document = prepare_replacement(collection, id, document, created_at, now)?;

    let row: Row = query_as(
        r#"UPDATE documents SET resource = $3, updated_at = $4
           WHERE collection = $1 AND id = $2
           RETURNING id, resource, created_at, updated_at"#,
    )
    .bind(collection.as_str())
    .bind(id)
    .bind(&document)
    .bind(now)
    .fetch_one(&mut **tx)
    .await
    .map_err(sqlx_to_storage)?;

    Ok(to_stored(collection, row))
}

pub async fn replace(
    pool: &PgPool,
    collection: Collection,
    id: &str,
    document: Value,
) -> Result<StoredDocument, StorageError> {
    let mut tx = pool.begin().await.map_err(sqlx_to_storage)?;
    let (_, created_at) = lock_existing(&mut tx, collection, id).await?;
    let stored = write_locked(&mut tx, collection, id, document, created_at).await?;
    tx.commit().await.map_err(sqlx_to_storage)?;
    Ok(stored)
}

pub async fn patch(
    pool: &PgPool,
    collection: Collection,
    id: &str,
    fields: Value,
) -> Result<StoredDocument, StorageError> {
    let mut tx = pool.begin().await.map_err(sqlx_to_storage)?;
    let (existing, created_at) = lock_existing(&mut tx, collection, id).await?;
    let merged = merge_fields(collection, &existing, fields)?;
    let stored = write_locked(&mut tx, collection, id, merged, created_at).await?;
    tx.commit().await.map_err(sqlx_to_storage)?;
    Ok(stored)
}

pub async fn delete(pool: &PgPool, collection: Collection, id: &str) -> Result<(), StorageError> {
    let result = query("DELETE FROM documents WHERE collection = $1 AND id = $2")
        .bind(collection.as_str())
        .bind(id)
        .execute(pool)
        .await
        .map_err(sqlx_to_storage)?;

    if result.rows_affected() == 0 {
        return Err(StorageError::not_found(collection, id));
    }
    Ok(())
}

pub async fn find(
    pool: &PgPool,
    collection: Collection,
    find: &FindQuery,
) -> Result<Vec<StoredDocument>, StorageError> {
    let (sql, binds) = filter::select_sql(collection, find);
    let rows: Vec<Row> = bind_all!(query_as(&sql), binds)
        .fetch_all(pool)
        .await
        .map_err(sqlx_to_storage)?;

    Ok(rows.into_iter().map(|r| to_stored(collection, r)).collect())
}

pub async fn count(pool: &PgPool, collection: Collection, find: &FindQuery) -> Result<u64, StorageError> {
    let (sql, binds) = filter::count_sql(collection, find);
    let n: i64 = bind_all!(query_scalar(&sql), binds)
        .fetch_one(pool)
        .await
        .map_err(sqlx_to_storage)?;

    Ok(u64::try_from(n).unwrap_or(0))
}

pub async fn ping(pool: &PgPool) -> Result<(), StorageError> {
    query("SELECT 1")
        .execute(pool)
        .await
        .map_err(sqlx_to_storage)?;
    Ok(())
}

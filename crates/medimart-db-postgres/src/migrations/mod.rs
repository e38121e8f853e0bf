//! Embedded schema migrations.
//!
//! SQL files under `migrations/` are compiled into the binary; to add one,
//! create the file and append it to `embedded_migrations!`.

use std::borrow::Cow;

use sqlx_core::migrate::{Migration, MigrationType, Migrator};
use sqlx_postgres::PgPool;
use tracing::{info, instrument};

use crate::error::{PostgresError, Result};

macro_rules! embedded_migrations {
    () => {
        &[(
            20250101000001i64,
            "documents",
            include_str!("../../migrations/20250101000001_documents.sql"),
        )]
    };
}

fn build_migrations() -> Vec<Migration> {
    embedded_migrations!()
        .iter()
        .map(|(version, description, sql)| Migration {
            version: *version,
            description: Cow::Borrowed(description),
            migration_type: MigrationType::Simple,
            sql: Cow::Borrowed(sql),
            checksum: Cow::Borrowed(&[]),
            no_tx: false,
        })
        .collect()
}

/// Applies pending migrations, tracked in `_sqlx_migrations`.
#[instrument(skip(pool))]
pub async fn run(pool: &PgPool) -> Result<()> {
    let migrations = build_migrations();
    info!(count = migrations.len(), "Running embedded database migrations");

    let migrator = Migrator {
        migrations: Cow::Owned(migrations),
        ignore_missing: false,
        locking: true,
        no_tx: false,
    };

    migrator
        .run(pool)
        .await
        .map_err(|e| PostgresError::Migration(e.to_string()))?;

    info!("Database migrations completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_ordered() {
        let migrations = build_migrations();
        assert!(!migrations.is_empty());
        assert!(migrations.windows(2).all(|w| w[0].version < w[1].version));
        assert!(migrations[0].sql.contains("CREATE TABLE IF NOT EXISTS documents"));
    }
}

//! SQLite connection setup and the `_sys_schema` bookkeeping table.

use crate::config::FullConfig;
use crate::error::AppError;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Records which declaration each app applied to this database file.
pub const SYS_SCHEMA_TABLE: &str = "_sys_schema";

/// Open (creating the file if absent) a pool with foreign key enforcement on.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;
    tracing::info!(database_url = %database_url, "database opened");
    Ok(pool)
}

pub async fn ensure_sys_tables(pool: &SqlitePool) -> Result<(), AppError> {
    let ddl = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            app TEXT NOT NULL PRIMARY KEY,
            payload TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            version INTEGER NOT NULL DEFAULT 1
        )
        "#,
        SYS_SCHEMA_TABLE
    );
    sqlx::query(&ddl).execute(pool).await?;
    Ok(())
}

/// Outcome of comparing the compiled declaration with the recorded one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaStatus {
    /// First run against this file; the declaration was recorded.
    Recorded,
    Unchanged,
    /// The file was created from a different declaration. Tables are not altered;
    /// delete the file to recreate it.
    Drifted,
}

/// Record the declaration for `app`, or compare it with the one already recorded.
pub async fn record_schema(pool: &SqlitePool, app: &str, config: &FullConfig) -> Result<SchemaStatus, AppError> {
    let payload = serde_json::to_value(config)?;
    let sql = format!("SELECT payload FROM {} WHERE app = ?1", SYS_SCHEMA_TABLE);
    let stored: Option<String> = sqlx::query_scalar(&sql)
        .bind(app)
        .fetch_optional(pool)
        .await?;

    match stored {
        None => {
            let sql = format!("INSERT INTO {} (app, payload) VALUES (?1, ?2)", SYS_SCHEMA_TABLE);
            sqlx::query(&sql)
                .bind(app)
                .bind(payload.to_string())
                .execute(pool)
                .await?;
            Ok(SchemaStatus::Recorded)
        }
        Some(raw) => {
            let previous: Value = serde_json::from_str(&raw)?;
            if previous == payload {
                Ok(SchemaStatus::Unchanged)
            } else {
                tracing::warn!(
                    app = %app,
                    "database was created from a different schema declaration; delete the database file to recreate it"
                );
                Ok(SchemaStatus::Drifted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableConfig;

    async fn temp_pool(dir: &tempfile::TempDir) -> SqlitePool {
        let url = format!("sqlite://{}", dir.path().join("store.db").display());
        connect(&url, 1).await.unwrap()
    }

    #[tokio::test]
    async fn creates_missing_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let _pool = temp_pool(&dir).await;
        assert!(dir.path().join("store.db").exists());
    }

    #[tokio::test]
    async fn records_then_detects_drift() {
        let dir = tempfile::tempdir().unwrap();
        let pool = temp_pool(&dir).await;
        ensure_sys_tables(&pool).await.unwrap();
        ensure_sys_tables(&pool).await.unwrap();

        let mut config = FullConfig::default();
        assert_eq!(record_schema(&pool, "blog", &config).await.unwrap(), SchemaStatus::Recorded);
        assert_eq!(record_schema(&pool, "blog", &config).await.unwrap(), SchemaStatus::Unchanged);

        config.tables.push(TableConfig {
            id: "tags".into(),
            name: "tags".into(),
            comment: None,
            primary_key: "id".into(),
        });
        assert_eq!(record_schema(&pool, "blog", &config).await.unwrap(), SchemaStatus::Drifted);
        assert_eq!(record_schema(&pool, "library", &config).await.unwrap(), SchemaStatus::Recorded);
    }
}

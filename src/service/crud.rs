//! Generic CRUD execution against SQLite.

use crate::config::{ColumnInfo, OnDelete, ResolvedEntity, SqlKind};
use crate::error::AppError;
use crate::sql::{delete, exists_by_column, insert, select_by_column_in, select_by_id, select_list, update, QueryBuf, SqliteBindValue};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::SqlitePool;
use std::collections::HashMap;

pub struct CrudService;

impl CrudService {
    /// Every row, ordered by primary key.
    pub async fn list(pool: &SqlitePool, entity: &ResolvedEntity) -> Result<Vec<Value>, AppError> {
        let q = select_list(entity);
        Self::query_many(pool, entity, &q).await
    }

    /// Fetch one row by primary key. Returns JSON object or None.
    pub async fn read(
        pool: &SqlitePool,
        entity: &ResolvedEntity,
        id: &Value,
    ) -> Result<Option<Value>, AppError> {
        let q = select_by_id(entity, id);
        Self::query_optional(pool, entity, &q).await
    }

    /// Fetch rows from entity where column IN (values). Used for batch-loading related rows.
    pub async fn fetch_where_column_in(
        pool: &SqlitePool,
        entity: &ResolvedEntity,
        column_name: &str,
        values: &[Value],
    ) -> Result<Vec<Value>, AppError> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let q = select_by_column_in(entity, column_name, values);
        Self::query_many(pool, entity, &q).await
    }

    /// Whether any row of `table_name` has `column_name = value`.
    pub async fn exists(
        pool: &SqlitePool,
        table_name: &str,
        column_name: &str,
        value: &Value,
    ) -> Result<bool, AppError> {
        let q = exists_by_column(table_name, column_name, value);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    /// Insert one row and return it. Ids are assigned by the store; a client-supplied PK is ignored.
    ///
    /// Columns listed in the entity's `unique_checks` are looked up first and an existing
    /// match is rejected with "<Column> already exists". The lookup and the insert are separate
    /// statements; the UNIQUE index catches a concurrent duplicate.
    pub async fn create(
        pool: &SqlitePool,
        entity: &ResolvedEntity,
        body: &HashMap<String, Value>,
    ) -> Result<Value, AppError> {
        for col in &entity.unique_checks {
            let Some(v) = body.get(col) else { continue };
            if Self::exists(pool, &entity.table_name, col, v).await? {
                return Err(AppError::BadRequest(format!("{} already exists", capitalize(col))));
            }
        }
        let q = insert(entity, body);
        let row = Self::query_optional(pool, entity, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
        tracing::info!(table = %entity.table_name, "row created");
        Ok(row)
    }

    /// Update one row by id. Returns updated row, or None when the id is unknown.
    pub async fn update(
        pool: &SqlitePool,
        entity: &ResolvedEntity,
        id: &Value,
        body: &HashMap<String, Value>,
    ) -> Result<Option<Value>, AppError> {
        let q = update(entity, id, body);
        Self::query_optional(pool, entity, &q).await
    }

    /// Delete one row by id. Returns deleted row or None.
    ///
    /// Rows still referenced through a `restrict` relationship are not deleted.
    pub async fn delete(
        pool: &SqlitePool,
        entity: &ResolvedEntity,
        id: &Value,
    ) -> Result<Option<Value>, AppError> {
        for dep in entity.dependents().filter(|d| d.on_delete == OnDelete::Restrict) {
            if Self::exists(pool, &dep.related_table_name, &dep.their_key_column, id).await? {
                return Err(AppError::Conflict(format!(
                    "{} {} is still referenced by {}",
                    entity.label, id, dep.name
                )));
            }
        }
        let q = delete(entity, id);
        let row = Self::query_optional(pool, entity, &q).await?;
        if row.is_some() {
            tracing::info!(table = %entity.table_name, id = %id, "row deleted");
        }
        Ok(row)
    }

    async fn query_optional(
        pool: &SqlitePool,
        entity: &ResolvedEntity,
        q: &QueryBuf,
    ) -> Result<Option<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(|r| row_to_json(&r, &entity.columns)))
    }

    async fn query_many(
        pool: &SqlitePool,
        entity: &ResolvedEntity,
        q: &QueryBuf,
    ) -> Result<Vec<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(|r| row_to_json(r, &entity.columns)).collect())
    }
}

fn bind_all<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    params: &[Value],
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    for p in params {
        query = query.bind(SqliteBindValue::from(p));
    }
    query
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Decode a row using the declared column kinds; queries always select the entity's columns.
fn row_to_json(row: &SqliteRow, columns: &[ColumnInfo]) -> Value {
    let mut map = serde_json::Map::new();
    for col in columns {
        map.insert(col.name.clone(), cell_to_value(row, col));
    }
    Value::Object(map)
}

fn cell_to_value(row: &SqliteRow, col: &ColumnInfo) -> Value {
    use sqlx::Row;
    let name = col.name.as_str();
    match col.kind {
        SqlKind::Integer => match row.try_get::<Option<i64>, _>(name) {
            Ok(Some(n)) => Value::Number(n.into()),
            _ => Value::Null,
        },
        SqlKind::Real => match row.try_get::<Option<f64>, _>(name) {
            Ok(Some(n)) => serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null),
            _ => Value::Null,
        },
        SqlKind::Text => match row.try_get::<Option<String>, _>(name) {
            Ok(Some(s)) => Value::String(s),
            _ => Value::Null,
        },
        SqlKind::Timestamp => match row.try_get::<Option<String>, _>(name) {
            Ok(Some(s)) => Value::String(normalize_timestamp(&s)),
            _ => Value::Null,
        },
    }
}

/// RFC 3339 in UTC with millisecond precision; unparseable text is passed through.
fn normalize_timestamp(raw: &str) -> String {
    if let Ok(d) = DateTime::parse_from_rfc3339(raw) {
        return d.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true);
    }
    if let Ok(d) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return d.and_utc().to_rfc3339_opts(SecondsFormat::Millis, true);
    }
    raw.to_string()
}

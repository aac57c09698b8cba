//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from resolved entity.

use crate::config::ResolvedEntity;
use serde_json::Value;
use std::collections::HashMap;

/// Quote identifier for SQLite (safe: only from declarations).
pub(crate) fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Appends a parameter and returns its `?N` placeholder.
    fn push_param(&mut self, v: Value) -> String {
        self.params.push(v);
        format!("?{}", self.params.len())
    }
}

fn select_column_list(entity: &ResolvedEntity) -> String {
    entity
        .columns
        .iter()
        .map(|c| quoted(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT by primary key.
pub fn select_by_id(entity: &ResolvedEntity, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(id.clone());
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(entity),
        quoted(&entity.table_name),
        quoted(&entity.pk_column),
        ph
    );
    q
}

/// SELECT every row, ORDER BY pk.
pub fn select_list(entity: &ResolvedEntity) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        select_column_list(entity),
        quoted(&entity.table_name),
        quoted(&entity.pk_column)
    );
    q
}

/// SELECT rows WHERE column IN (?1, ?2, ...) ORDER BY pk. Used for batch-loading related rows.
pub fn select_by_column_in(entity: &ResolvedEntity, column_name: &str, values: &[Value]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = quoted(&entity.table_name);
    let cols = select_column_list(entity);
    if values.is_empty() {
        q.sql = format!("SELECT {} FROM {} WHERE 1 = 0", cols, table);
        return q;
    }
    let placeholders: Vec<String> = values.iter().map(|v| q.push_param(v.clone())).collect();
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} IN ({}) ORDER BY {}",
        cols,
        table,
        quoted(column_name),
        placeholders.join(", "),
        quoted(&entity.pk_column)
    );
    q
}

/// `SELECT 1 FROM table WHERE column = ?1 LIMIT 1`.
pub fn exists_by_column(table_name: &str, column_name: &str, value: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(value.clone());
    q.sql = format!(
        "SELECT 1 FROM {} WHERE {} = {} LIMIT 1",
        quoted(table_name),
        quoted(column_name),
        ph
    );
    q
}

/// INSERT: columns from entity, values from body. Server-assigned columns (PK, DB default)
/// are left to the store even when the body carries them.
pub fn insert(entity: &ResolvedEntity, body: &HashMap<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in entity.columns.iter().filter(|c| !c.server_assigned()) {
        let val = body.get(&c.name).cloned().unwrap_or(Value::Null);
        placeholders.push(q.push_param(val));
        cols.push(quoted(&c.name));
    }
    let table = quoted(&entity.table_name);
    let returning = select_column_list(entity);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by id: SET only entity columns present in body, skipping server-assigned and immutable columns.
/// With nothing to set, degrades to a SELECT by id so the caller still gets the current row.
pub fn update(entity: &ResolvedEntity, id: &Value, body: &HashMap<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = quoted(&entity.table_name);
    let pk = &entity.pk_column;
    let mut sets = Vec::new();
    // Iterate declared columns rather than the body so SET order is deterministic.
    for c in &entity.columns {
        if c.server_assigned() || entity.immutable_columns.contains(&c.name) {
            continue;
        }
        let Some(v) = body.get(&c.name) else { continue };
        let ph = q.push_param(v.clone());
        sets.push(format!("{} = {}", quoted(&c.name), ph));
    }
    if sets.is_empty() {
        return select_by_id(entity, id);
    }
    let id_ph = q.push_param(id.clone());
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        table,
        sets.join(", "),
        quoted(pk),
        id_ph,
        select_column_list(entity)
    );
    q
}

/// DELETE by id.
pub fn delete(entity: &ResolvedEntity, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(id.clone());
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        quoted(&entity.table_name),
        quoted(&entity.pk_column),
        ph,
        select_column_list(entity)
    );
    q
}

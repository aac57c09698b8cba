//! Apply declarations to the database: CREATE TABLE (with foreign keys) and CREATE INDEX.
//! Everything is `IF NOT EXISTS`; existing tables are never altered.

use crate::config::types::*;
use crate::config::{validate, FullConfig};
use crate::error::{AppError, ConfigError};
use sqlx::SqlitePool;
use std::collections::HashMap;

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Apply a full declaration to the database. Validates first. Idempotent.
pub async fn apply_migrations(pool: &SqlitePool, config: &FullConfig) -> Result<(), AppError> {
    let statements = migration_statements(config)?;
    let mut tx = pool.begin().await?;
    for sql in &statements {
        tracing::debug!(sql = %sql, "migration");
        sqlx::query(sql).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    tracing::info!(tables = config.tables.len(), indexes = config.indexes.len(), "schema applied");
    Ok(())
}

/// DDL for a declaration, in execution order: tables in declaration order, then indexes.
pub fn migration_statements(config: &FullConfig) -> Result<Vec<String>, ConfigError> {
    validate(config)?;

    let tables_by_id: HashMap<_, _> = config.tables.iter().map(|t| (t.id.as_str(), t)).collect();
    let columns_by_id: HashMap<_, _> = config.columns.iter().map(|c| (c.id.as_str(), c)).collect();
    let columns_by_table: HashMap<_, Vec<&ColumnConfig>> = config.columns.iter().fold(
        HashMap::new(),
        |mut m, c| {
            m.entry(c.table_id.as_str()).or_default().push(c);
            m
        },
    );

    let mut out = Vec::new();
    for t in &config.tables {
        let cols = columns_by_table
            .get(t.id.as_str())
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        let mut defs: Vec<String> = Vec::new();
        for c in cols {
            let (typ, _) = c.type_.sql_type()?;
            let mut def = format!("{} {}", quote(&c.name), typ);
            if !c.nullable || c.name == t.primary_key {
                def.push_str(" NOT NULL");
            }
            if c.name == t.primary_key {
                def.push_str(" PRIMARY KEY");
            }
            match &c.default {
                Some(ColumnDefaultConfig::Literal(v)) => {
                    def.push_str(&format!(" DEFAULT '{}'", v.replace('\'', "''")));
                }
                Some(ColumnDefaultConfig::Expression { expression }) => {
                    def.push_str(&format!(" DEFAULT ({})", expression));
                }
                None => {}
            }
            defs.push(def);
        }

        for r in config.relationships.iter().filter(|r| r.from_table_id == t.id) {
            let missing = || ConfigError::MissingReference {
                kind: "relationship",
                id: r.id.clone(),
            };
            let from_col = columns_by_id.get(r.from_column_id.as_str()).ok_or_else(missing)?;
            let to_col = columns_by_id.get(r.to_column_id.as_str()).ok_or_else(missing)?;
            let to_table = tables_by_id.get(r.to_table_id.as_str()).ok_or_else(missing)?;
            defs.push(format!(
                "FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {}",
                quote(&from_col.name),
                quote(&to_table.name),
                quote(&to_col.name),
                r.on_delete.as_sql()
            ));
        }

        out.push(format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            quote(&t.name),
            defs.join(",\n    ")
        ));
    }

    for idx in &config.indexes {
        let table = tables_by_id
            .get(idx.table_id.as_str())
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "table",
                id: idx.table_id.clone(),
            })?;
        let cols: Vec<String> = idx.columns.iter().map(|c| quote(c)).collect();
        out.push(format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
            if idx.unique { "UNIQUE " } else { "" },
            quote(&idx.name),
            quote(&table.name),
            cols.join(", ")
        ));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn config() -> FullConfig {
        parse_config(
            r#"{
                "tables": [
                    {"id": "users", "name": "users", "primary_key": "id"},
                    {"id": "borrows", "name": "borrows", "primary_key": "id"}
                ],
                "columns": [
                    {"id": "users.id", "table_id": "users", "name": "id", "type": "integer"},
                    {"id": "users.email", "table_id": "users", "name": "email", "type": {"name": "varchar", "params": [200]}, "nullable": false},
                    {"id": "borrows.id", "table_id": "borrows", "name": "id", "type": "integer"},
                    {"id": "borrows.user_id", "table_id": "borrows", "name": "user_id", "type": "integer", "nullable": false},
                    {"id": "borrows.at", "table_id": "borrows", "name": "at", "type": "timestamp", "nullable": false,
                     "default": {"expression": "CURRENT_TIMESTAMP"}}
                ],
                "indexes": [
                    {"id": "users_email", "table_id": "users", "name": "users_email_key", "unique": true, "columns": ["email"]}
                ],
                "relationships": [
                    {"id": "borrows_user", "from_table_id": "borrows", "from_column_id": "borrows.user_id",
                     "to_table_id": "users", "to_column_id": "users.id"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn emits_tables_then_indexes() {
        let stmts = migration_statements(&config()).unwrap();
        assert_eq!(stmts.len(), 3);
        assert_eq!(
            stmts[0],
            "CREATE TABLE IF NOT EXISTS \"users\" (\n    \"id\" INTEGER NOT NULL PRIMARY KEY,\n    \"email\" VARCHAR(200) NOT NULL\n)"
        );
        assert_eq!(
            stmts[2],
            r#"CREATE UNIQUE INDEX IF NOT EXISTS "users_email_key" ON "users" ("email")"#
        );
    }

    #[test]
    fn foreign_keys_and_defaults_are_inline() {
        let stmts = migration_statements(&config()).unwrap();
        let borrows = &stmts[1];
        assert!(borrows.contains(r#""at" TIMESTAMP NOT NULL DEFAULT (CURRENT_TIMESTAMP)"#));
        assert!(borrows.contains(
            r#"FOREIGN KEY ("user_id") REFERENCES "users" ("id") ON DELETE RESTRICT"#
        ));
    }

    #[test]
    fn invalid_declaration_produces_no_ddl() {
        let mut config = config();
        config.indexes[0].columns = vec!["phone".into()];
        assert!(migration_statements(&config).is_err());
    }
}

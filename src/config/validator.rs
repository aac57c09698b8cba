//! Declaration validation: referential integrity and API consistency.

use crate::config::FullConfig;
use crate::error::ConfigError;
use std::collections::{HashMap, HashSet};

pub fn validate(config: &FullConfig) -> Result<(), ConfigError> {
    let mut table_ids = HashSet::new();
    for t in &config.tables {
        if !table_ids.insert(t.id.as_str()) {
            return Err(ConfigError::Validation(format!("duplicate table id: {}", t.id)));
        }
    }

    let mut column_ids = HashSet::new();
    let mut columns_by_table: HashMap<&str, HashSet<&str>> = HashMap::new();
    for c in &config.columns {
        if !table_ids.contains(c.table_id.as_str()) {
            return Err(ConfigError::MissingReference {
                kind: "table",
                id: c.table_id.clone(),
            });
        }
        if !column_ids.insert(c.id.as_str()) {
            return Err(ConfigError::Validation(format!("duplicate column id: {}", c.id)));
        }
        c.type_.sql_type()?;
        columns_by_table
            .entry(c.table_id.as_str())
            .or_default()
            .insert(c.name.as_str());
    }

    for t in &config.tables {
        let has_pk = columns_by_table
            .get(t.id.as_str())
            .map(|cols| cols.contains(t.primary_key.as_str()))
            .unwrap_or(false);
        if !has_pk {
            return Err(ConfigError::InvalidPrimaryKey {
                table_id: t.id.clone(),
                column: t.primary_key.clone(),
            });
        }
    }

    for idx in &config.indexes {
        let cols = columns_by_table
            .get(idx.table_id.as_str())
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "table",
                id: idx.table_id.clone(),
            })?;
        if idx.columns.is_empty() {
            return Err(ConfigError::Validation(format!("index {} has no columns", idx.id)));
        }
        for col in &idx.columns {
            if !cols.contains(col.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "index column",
                    id: format!("{}.{}", idx.table_id, col),
                });
            }
        }
    }

    let column_table: HashMap<&str, &str> = config
        .columns
        .iter()
        .map(|c| (c.id.as_str(), c.table_id.as_str()))
        .collect();
    for r in &config.relationships {
        let from_ok = column_table.get(r.from_column_id.as_str()) == Some(&r.from_table_id.as_str());
        let to_ok = column_table.get(r.to_column_id.as_str()) == Some(&r.to_table_id.as_str());
        if !from_ok || !to_ok {
            return Err(ConfigError::MissingReference {
                kind: "relationship",
                id: r.id.clone(),
            });
        }
    }

    let mut path_segments = HashSet::new();
    for api in &config.api_entities {
        let cols = columns_by_table
            .get(api.entity_id.as_str())
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "table",
                id: api.entity_id.clone(),
            })?;
        if !path_segments.insert(api.path_segment.as_str()) {
            return Err(ConfigError::DuplicatePathSegment(api.path_segment.clone()));
        }
        let referenced = api
            .immutable_columns
            .iter()
            .chain(api.unique_checks.iter())
            .chain(api.validation.keys());
        for col in referenced {
            if !cols.contains(col.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "column",
                    id: format!("{}.{}", api.entity_id, col),
                });
            }
        }
    }

    Ok(())
}

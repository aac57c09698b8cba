//! Parse schema declarations and resolve them into the runtime model.

use crate::config::resolved::{ColumnInfo, IncludeDirection, IncludeSpec, PkType, ResolvedEntity, ResolvedModel};
use crate::config::types::*;
use crate::config::{validate, FullConfig};
use crate::error::ConfigError;
use std::collections::{HashMap, HashSet};

/// Parse a JSON schema declaration (see `schemas/`).
pub fn parse_config(source: &str) -> Result<FullConfig, ConfigError> {
    serde_json::from_str(source).map_err(|e| ConfigError::Load(e.to_string()))
}

/// Build resolved model from a full declaration (validates first).
pub fn resolve(config: &FullConfig) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;

    let tables_by_id: HashMap<_, _> = config.tables.iter().map(|t| (t.id.as_str(), t)).collect();
    let columns_by_table: HashMap<_, Vec<&ColumnConfig>> = config
        .columns
        .iter()
        .fold(HashMap::new(), |mut m, c| {
            m.entry(c.table_id.as_str()).or_default().push(c);
            m
        });
    let column_id_to_name: HashMap<&str, &str> = config.columns.iter().map(|c| (c.id.as_str(), c.name.as_str())).collect();
    let table_id_to_path: HashMap<&str, &str> = config
        .api_entities
        .iter()
        .map(|api| (api.entity_id.as_str(), api.path_segment.as_str()))
        .collect();

    let mut entities = Vec::new();
    let mut entity_by_path = HashMap::new();

    for api in &config.api_entities {
        let table = tables_by_id
            .get(api.entity_id.as_str())
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "table",
                id: api.entity_id.clone(),
            })?;
        let table_columns = columns_by_table
            .get(table.id.as_str())
            .map(|v| v.as_slice())
            .unwrap_or(&[]);

        let pk_col = table_columns
            .iter()
            .find(|c| c.name == table.primary_key)
            .ok_or_else(|| ConfigError::InvalidPrimaryKey {
                table_id: table.id.clone(),
                column: table.primary_key.clone(),
            })?;
        let (_, pk_kind) = pk_col.type_.sql_type()?;
        let pk_type = if pk_kind == SqlKind::Integer { PkType::Int } else { PkType::Text };

        let mut columns = Vec::with_capacity(table_columns.len());
        let mut validation = HashMap::new();
        for c in table_columns {
            let is_pk = c.name == table.primary_key;
            let (_, kind) = c.type_.sql_type()?;
            let info = ColumnInfo {
                name: c.name.clone(),
                pk_type: if is_pk { Some(pk_type) } else { None },
                nullable: c.nullable,
                has_default: c.default.is_some(),
                kind,
            };
            if !info.server_assigned() {
                let declared = api.validation.get(&c.name).cloned().unwrap_or_default();
                validation.insert(c.name.clone(), implied_rule(c, &info, declared));
            }
            columns.push(info);
        }

        let includes = build_includes_for_table(
            &table.id,
            &config.relationships,
            &column_id_to_name,
            &table_id_to_path,
            &tables_by_id,
        );
        let entity = ResolvedEntity {
            table_id: table.id.clone(),
            table_name: table.name.clone(),
            path_segment: api.path_segment.clone(),
            label: api.label.clone(),
            pk_column: table.primary_key.clone(),
            pk_type,
            columns,
            operations: api.operations.iter().copied().collect(),
            write_response: api.write_response,
            immutable_columns: api.immutable_columns.iter().cloned().collect::<HashSet<_>>(),
            unique_checks: api.unique_checks.clone(),
            includes,
            validation,
        };
        entity_by_path.insert(api.path_segment.clone(), entity.clone());
        entities.push(entity);
    }

    Ok(ResolvedModel {
        entities,
        entity_by_path,
    })
}

/// Merge a declared rule with what the column itself implies. Declared values win.
fn implied_rule(column: &ColumnConfig, info: &ColumnInfo, declared: ValidationRule) -> ValidationRule {
    let value_type = match info.kind {
        SqlKind::Integer => ValueType::Integer,
        SqlKind::Real => ValueType::Number,
        SqlKind::Text | SqlKind::Timestamp => ValueType::String,
    };
    ValidationRule {
        required: declared.required.or(Some(!info.nullable)),
        value_type: declared.value_type.or(Some(value_type)),
        max_length: declared.max_length.or_else(|| column.type_.max_length()),
        ..declared
    }
}

fn build_includes_for_table(
    our_table_id: &str,
    relationships: &[RelationshipConfig],
    column_id_to_name: &HashMap<&str, &str>,
    table_id_to_path: &HashMap<&str, &str>,
    tables_by_id: &HashMap<&str, &TableConfig>,
) -> Vec<IncludeSpec> {
    let mut includes = Vec::new();
    for rel in relationships {
        let from_col = column_id_to_name.get(rel.from_column_id.as_str()).map(|s| s.to_string());
        let to_col = column_id_to_name.get(rel.to_column_id.as_str()).map(|s| s.to_string());
        let from_path = table_id_to_path.get(rel.from_table_id.as_str()).map(|s| s.to_string());
        let to_path = table_id_to_path.get(rel.to_table_id.as_str()).map(|s| s.to_string());
        let from_table = tables_by_id.get(rel.from_table_id.as_str()).map(|t| t.name.clone());
        let to_table = tables_by_id.get(rel.to_table_id.as_str()).map(|t| t.name.clone());

        if rel.from_table_id == our_table_id {
            if let (Some(our_key), Some(their_key), Some(related_path), Some(related_table)) =
                (from_col.clone(), to_col.clone(), to_path.clone(), to_table)
            {
                let name = our_key.strip_suffix("_id").unwrap_or(&our_key).to_string();
                includes.push(IncludeSpec {
                    name,
                    direction: IncludeDirection::ToOne,
                    related_path_segment: related_path,
                    related_table_name: related_table,
                    our_key_column: our_key,
                    their_key_column: their_key,
                    on_delete: rel.on_delete,
                });
            }
        }
        if rel.to_table_id == our_table_id {
            if let (Some(our_key), Some(their_key), Some(related_path), Some(related_table)) =
                (to_col, from_col, from_path, from_table)
            {
                includes.push(IncludeSpec {
                    name: rel.name.clone().unwrap_or_else(|| related_path.clone()),
                    direction: IncludeDirection::ToMany,
                    related_path_segment: related_path,
                    related_table_name: related_table,
                    our_key_column: our_key,
                    their_key_column: their_key,
                    on_delete: rel.on_delete,
                });
            }
        }
    }
    includes
}

//! Resolved entity model: declarations validated and flattened for runtime use.

use crate::config::{OnDelete, Operation, SqlKind, ValidationRule, WriteResponse};
use std::collections::{HashMap, HashSet};

/// Direction of a relation as seen from one entity: to_one (we hold the FK) or to_many (they hold an FK to us).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IncludeDirection {
    ToOne,
    ToMany,
}

/// One side of a declared relationship, named explicitly on each entity.
#[derive(Clone, Debug)]
pub struct IncludeSpec {
    /// Navigation name ("posts", "books", "author").
    pub name: String,
    pub direction: IncludeDirection,
    /// Path segment of the related entity (for lookup in model).
    pub related_path_segment: String,
    pub related_table_name: String,
    /// Our column used in the join (our FK for to_one; our PK for to_many).
    pub our_key_column: String,
    /// Their column used in the join (their PK for to_one; their FK for to_many).
    pub their_key_column: String,
    pub on_delete: OnDelete,
}

/// Primary key type for parsing path ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkType {
    Int,
    Text,
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub pk_type: Option<PkType>,
    pub nullable: bool,
    /// Whether the column has a DB default (e.g. the borrow timestamp).
    pub has_default: bool,
    pub kind: SqlKind,
}

impl ColumnInfo {
    /// Filled in by the store (PK, DB default); never written from a request body.
    pub fn server_assigned(&self) -> bool {
        self.pk_type.is_some() || self.has_default
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub table_id: String,
    pub table_name: String,
    pub path_segment: String,
    pub label: String,
    pub pk_column: String,
    pub pk_type: PkType,
    pub columns: Vec<ColumnInfo>,
    pub operations: HashSet<Operation>,
    pub write_response: WriteResponse,
    pub immutable_columns: HashSet<String>,
    pub unique_checks: Vec<String>,
    pub includes: Vec<IncludeSpec>,
    /// Per-column rules: declared ones merged with those implied by the column (type, length, NOT NULL).
    pub validation: HashMap<String, ValidationRule>,
}

impl ResolvedEntity {
    pub fn allows(&self, op: Operation) -> bool {
        self.operations.contains(&op)
    }

    /// Navigation by name ("books", "borrows", "user").
    pub fn include(&self, name: &str) -> Option<&IncludeSpec> {
        self.includes.iter().find(|i| i.name == name)
    }

    /// Relations whose rows point at this entity.
    pub fn dependents(&self) -> impl Iterator<Item = &IncludeSpec> {
        self.includes
            .iter()
            .filter(|i| i.direction == IncludeDirection::ToMany)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub entities: Vec<ResolvedEntity>,
    pub entity_by_path: HashMap<String, ResolvedEntity>,
}

impl ResolvedModel {
    pub fn entity_by_path(&self, path: &str) -> Option<&ResolvedEntity> {
        self.entity_by_path.get(path)
    }
}

//! Schema differ.
//!
//! Compares a declared model against a live table and produces the DDL
//! needed to reconcile them. Columns the model does not declare are
//! dropped; everything else is added or changed in place.

use std::collections::HashSet;

use super::introspect::{FieldInfo, IntrospectedTable};
use super::plan::MigrationPlan;
use crate::catalog::{
    IdMode, IndexKind, IndexMethod, ModelSchema, PropertyDef, ID_COLUMN, PRIMARY_INDEX,
};
use crate::codec::{column_ddl, column_type, escape_identifier};
use crate::error::Result;

/// Id column type in uuid mode.
pub const UUID_ID_TYPE: &str = "CHAR(36)";

/// Id column type for a declared string id.
pub const STRING_ID_TYPE: &str = "VARCHAR(100)";

/// Id column type for an auto-increment id.
pub const SERIAL_ID_TYPE: &str = "INT(11)";

/// An index the model expects to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DeclaredIndex<'a> {
    name: &'a str,
    columns: Vec<&'a str>,
    kind: Option<IndexKind>,
    method: Option<IndexMethod>,
}

impl DeclaredIndex<'_> {
    fn definition(&self) -> String {
        let mut sql = String::new();
        if let Some(kind) = self.kind {
            sql.push_str(kind.as_sql());
            sql.push(' ');
        }
        let columns: Vec<String> = self.columns.iter().map(|c| escape_identifier(c)).collect();
        sql.push_str(&format!(
            "INDEX {} ({})",
            escape_identifier(self.name),
            columns.join(", ")
        ));
        if let Some(method) = self.method {
            sql.push_str(" USING ");
            sql.push_str(method.as_sql());
        }
        sql
    }

    fn matches(&self, live: &[String]) -> bool {
        self.columns.len() == live.len()
            && self.columns.iter().zip(live).all(|(a, b)| *a == b.as_str())
    }
}

/// Computes DDL plans for one model.
#[derive(Debug, Clone, Copy)]
pub struct SchemaDiffer<'a> {
    model: &'a ModelSchema,
}

impl<'a> SchemaDiffer<'a> {
    /// Create a differ for a model.
    pub fn new(model: &'a ModelSchema) -> Self {
        Self { model }
    }

    /// Diff the model against a live table.
    ///
    /// `None`, or a table with no fields, yields a create plan. Otherwise the
    /// plan holds the `ALTER TABLE` clauses, possibly none.
    pub fn diff(&self, live: Option<&IntrospectedTable>) -> Result<MigrationPlan> {
        self.model.validate()?;
        if let Some(live) = live {
            live.validate()?;
        }
        let table = escape_identifier(self.model.table_name());

        let plan = match live.filter(|t| !t.is_empty()) {
            None => MigrationPlan::create(table, self.create_table_sql()),
            Some(live) => MigrationPlan::alter(table, self.alter_clauses(live)),
        };

        tracing::debug!(
            model = %self.model.name,
            kind = %plan.kind,
            statements = plan.len(),
            "computed schema diff"
        );
        Ok(plan)
    }

    /// Full `CREATE TABLE` statement for the model.
    pub fn create_table_sql(&self) -> String {
        let mut lines = vec![format!(
            "{} {}",
            escape_identifier(ID_COLUMN),
            self.id_definition()
        )];
        for prop in self.model.column_properties() {
            lines.push(format!("{} {}", escape_identifier(&prop.name), column_ddl(prop)));
        }
        for index in self.declared_indexes() {
            lines.push(index.definition());
        }

        let mut sql = format!(
            "CREATE TABLE {} (\n  {}\n)",
            escape_identifier(self.model.table_name()),
            lines.join(",\n  ")
        );
        if let Some(engine) = &self.model.settings.engine {
            sql.push_str(" ENGINE ");
            sql.push_str(engine);
        }
        sql
    }

    /// Expected type of the id column for the configured mode.
    pub fn expected_id_type(&self) -> &'static str {
        if self.model.id_mode().is_uuid() {
            UUID_ID_TYPE
        } else if self.model.has_string_id() {
            STRING_ID_TYPE
        } else {
            SERIAL_ID_TYPE
        }
    }

    fn id_definition(&self) -> String {
        match self.model.id_mode() {
            IdMode::V1 | IdMode::V4 => format!("{UUID_ID_TYPE} NOT NULL PRIMARY KEY"),
            IdMode::None if self.model.has_string_id() => {
                format!("{STRING_ID_TYPE} NOT NULL PRIMARY KEY")
            }
            IdMode::None => format!("{SERIAL_ID_TYPE} NOT NULL AUTO_INCREMENT PRIMARY KEY"),
        }
    }

    fn alter_clauses(&self, live: &IntrospectedTable) -> Vec<String> {
        let mut clauses = Vec::new();

        if let Some(id) = live.field(ID_COLUMN) {
            let expected = self.expected_id_type();
            if normalize_type(&id.column_type) != normalize_type(expected) {
                let column = escape_identifier(ID_COLUMN);
                let suffix = if expected == SERIAL_ID_TYPE {
                    " AUTO_INCREMENT"
                } else {
                    ""
                };
                clauses.push(format!(
                    "CHANGE COLUMN {column} {column} {expected} NOT NULL{suffix}"
                ));
            }
        }

        for prop in self.model.column_properties() {
            let column = escape_identifier(&prop.name);
            match live.field(&prop.name) {
                None => clauses.push(format!("ADD COLUMN {column} {}", column_ddl(prop))),
                Some(field) if column_changed(prop, field) => clauses.push(format!(
                    "CHANGE COLUMN {column} {column} {}",
                    column_ddl(prop)
                )),
                Some(_) => {}
            }
        }

        for field in &live.fields {
            if field.name != ID_COLUMN && self.model.get_property(&field.name).is_none() {
                clauses.push(format!("DROP COLUMN {}", escape_identifier(&field.name)));
            }
        }

        let declared = self.declared_indexes();
        let mut present: HashSet<String> = HashSet::new();
        for (name, columns) in live.index_columns() {
            if name == PRIMARY_INDEX || name == ID_COLUMN {
                continue;
            }
            match declared.iter().find(|d| d.name == name) {
                Some(index) if index.matches(&columns) => {
                    present.insert(name);
                }
                _ => clauses.push(format!("DROP INDEX {}", escape_identifier(&name))),
            }
        }

        for index in declared.iter().filter(|d| !present.contains(d.name)) {
            clauses.push(format!("ADD {}", index.definition()));
        }

        clauses
    }

    /// Single-column indexes first, then multi-column ones, in declaration order.
    fn declared_indexes(&self) -> Vec<DeclaredIndex<'a>> {
        let model = self.model;
        let single = model
            .column_properties()
            .filter(|p| p.wants_index())
            .map(|p| {
                let spec = p.index.unwrap_or_default();
                DeclaredIndex {
                    name: p.name.as_str(),
                    columns: vec![p.name.as_str()],
                    kind: spec.kind,
                    method: spec.method,
                }
            });
        let multi = model.indexes.iter().map(|i| DeclaredIndex {
            name: i.name.as_str(),
            columns: i.columns.iter().map(String::as_str).collect(),
            kind: i.kind,
            method: i.method,
        });
        single.chain(multi).collect()
    }
}

/// Whether a live column differs from its declaration.
///
/// A live `NOT NULL` column with undeclared nullability counts as changed:
/// the declaration renders as `NULL`, so the column is rewritten once and
/// compares equal from then on.
fn column_changed(prop: &PropertyDef, live: &FieldInfo) -> bool {
    let nullability_changed = match (live.nullable, prop.nullable) {
        (true, Some(false)) => true,
        (false, Some(true)) | (false, None) => true,
        _ => false,
    };
    nullability_changed || normalize_type(&live.column_type) != normalize_type(&column_type(prop))
}

const INTEGER_TYPES: [&str; 6] = ["tinyint", "smallint", "mediumint", "bigint", "integer", "int"];

/// Comparable form of a column type.
///
/// MySQL 8 drops the integer display width (`int` for `int(11)`) and
/// reports quotes inside enum values doubled rather than backslashed.
fn normalize_type(sql_type: &str) -> String {
    let lower = sql_type.trim().to_ascii_lowercase().replace("\\'", "''");
    for name in INTEGER_TYPES {
        let Some(args) = lower.strip_prefix(name).and_then(|r| r.strip_prefix('(')) else {
            continue;
        };
        if let Some(close) = args.find(')') {
            if args[..close].chars().all(|c| c.is_ascii_digit()) {
                return format!("{name}{}", &args[close + 1..]);
            }
        }
        break;
    }
    lower
}

//! Schema migration for MySQL tables.
//!
//! [`SchemaDiffer`] compares a declared [`ModelSchema`](crate::catalog::ModelSchema)
//! with an [`IntrospectedTable`] and returns a [`MigrationPlan`]:
//!
//! - no live table: one `CREATE TABLE` with columns, indexes and engine;
//! - live table: `ALTER TABLE` clauses that fix the id column, add or change
//!   declared columns, drop undeclared ones, and rebuild stale indexes.
//!
//! Running the differ again after applying its plan yields an empty plan.

mod diff;
mod introspect;
mod plan;

pub use diff::{SchemaDiffer, SERIAL_ID_TYPE, STRING_ID_TYPE, UUID_ID_TYPE};
pub use introspect::{FieldInfo, IndexEntry, IntrospectedTable, MAX_KEY_PARTS};
pub use plan::{MigrationPlan, PlanKind};

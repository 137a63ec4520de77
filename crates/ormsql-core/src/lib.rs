//! ormsql core - SQL compilation, value codec, and schema diffing for MySQL.
//!
//! This crate is pure and synchronous: it turns declared models, filters and
//! data maps into MySQL statements, and decodes result rows back into model
//! values. Executing the SQL is left to `ormsql-adapter`.

pub mod catalog;
pub mod codec;
pub mod error;
pub mod migration;
pub mod query;
pub mod value;

pub use catalog::{
    IdMode, IndexDef, IndexKind, IndexMethod, ModelSchema, ModelSettings, PropertyDef,
    PropertyIndex, PropertyType, ID_COLUMN, PRIMARY_INDEX,
};
pub use codec::{column_ddl, column_type, escape_identifier, escape_string, SqlLiteral, ValueCodec};
pub use error::{Error, Result};
pub use migration::{
    FieldInfo, IndexEntry, IntrospectedTable, MigrationPlan, PlanKind, SchemaDiffer, MAX_KEY_PARTS,
};
pub use query::{
    row_from_json, CompareOp, Condition, ConditionTree, Filter, FilterCompiler, OrderSpec,
    SortDirection, UpdateSpec,
};
pub use value::{row_get, Row, Value};

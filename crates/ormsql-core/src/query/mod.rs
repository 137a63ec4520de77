//! Filter compilation for MySQL.
//!
//! A [`Filter`] holds a [`ConditionTree`] plus ordering, grouping and paging.
//! [`FilterCompiler`] turns filters and data maps into `SELECT`, `INSERT`,
//! upsert and `UPDATE` statements for one model.

mod compiler;
mod condition;
mod filter;

pub use compiler::FilterCompiler;
pub use condition::{CompareOp, Condition, ConditionTree, OR_KEY};
pub use filter::{row_from_json, Filter, OrderSpec, SortDirection, UpdateSpec};

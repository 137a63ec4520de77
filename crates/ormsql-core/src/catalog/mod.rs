//! Model catalog for the adapter.
//!
//! Declared models, their properties, and their indexes. Everything here is
//! an immutable snapshot once handed to the compiler or the differ.

mod index;
mod model;
mod property;
mod types;

pub use index::IndexDef;
pub use model::{ModelSchema, ModelSettings, ID_COLUMN, PRIMARY_INDEX};
pub use property::{PropertyDef, PropertyIndex};
pub use types::{IdMode, IndexKind, IndexMethod, PropertyType};

//! Model (table) schema definitions.

use super::index::IndexDef;
use super::property::PropertyDef;
use super::types::{IdMode, PropertyType};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Name of the primary-key column. Every model has one, declared or not.
pub const ID_COLUMN: &str = "id";

/// Reserved index name MySQL uses for the primary key.
pub const PRIMARY_INDEX: &str = "PRIMARY";

/// A declared model: properties, indexes, and table-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSchema {
    /// Model name.
    pub name: String,
    /// Table name override. Defaults to the model name.
    #[serde(default)]
    pub table: Option<String>,
    /// Properties in declaration order (drives DDL column order).
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
    /// Multi-column indexes.
    #[serde(default)]
    pub indexes: Vec<IndexDef>,
    /// Table-level settings.
    #[serde(default)]
    pub settings: ModelSettings,
}

/// Table-level settings for a model.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Storage engine (e.g. `InnoDB`).
    #[serde(default)]
    pub engine: Option<String>,
    /// Primary-key generation strategy.
    #[serde(default, rename = "uuid")]
    pub id_mode: IdMode,
}

impl ModelSchema {
    /// Create an empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            properties: Vec::new(),
            indexes: Vec::new(),
            settings: ModelSettings::default(),
        }
    }

    /// Add a property.
    pub fn with_property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }

    /// Add multiple properties.
    pub fn with_properties(mut self, properties: impl IntoIterator<Item = PropertyDef>) -> Self {
        self.properties.extend(properties);
        self
    }

    /// Add a multi-column index.
    pub fn with_index(mut self, index: IndexDef) -> Self {
        self.indexes.push(index);
        self
    }

    /// Override the table name.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Set the storage engine.
    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.settings.engine = Some(engine.into());
        self
    }

    /// Set the id generation mode.
    pub fn with_id_mode(mut self, mode: IdMode) -> Self {
        self.settings.id_mode = mode;
        self
    }

    /// Name of the backing table.
    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.name)
    }

    /// Id generation mode.
    pub fn id_mode(&self) -> IdMode {
        self.settings.id_mode
    }

    /// Get a property by name.
    pub fn get_property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Get a multi-column index by name.
    pub fn get_index(&self, name: &str) -> Option<&IndexDef> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// The explicitly declared id property, if any.
    pub fn id_property(&self) -> Option<&PropertyDef> {
        self.get_property(ID_COLUMN)
    }

    /// Whether the id is a client-declared string (not uuid, not auto-increment).
    pub fn has_string_id(&self) -> bool {
        !self.id_mode().is_uuid()
            && self
                .id_property()
                .is_some_and(|p| p.property_type == PropertyType::String)
    }

    /// Properties other than id, in declaration order.
    pub fn column_properties(&self) -> impl Iterator<Item = &PropertyDef> {
        self.properties.iter().filter(|p| p.name != ID_COLUMN)
    }

    /// Check the schema invariants.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidSchema("model name is empty".into()));
        }

        let mut seen = HashSet::new();
        for prop in &self.properties {
            if prop.name.is_empty() {
                return Err(Error::InvalidSchema(format!(
                    "model `{}` has a property with an empty name",
                    self.name
                )));
            }
            if !seen.insert(prop.name.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "model `{}` declares property `{}` twice",
                    self.name, prop.name
                )));
            }
        }

        let mut index_names = HashSet::new();
        for index in &self.indexes {
            if index.columns.is_empty() {
                return Err(Error::InvalidSchema(format!(
                    "index `{}` on `{}` has no columns",
                    index.name, self.name
                )));
            }
            if index.name.eq_ignore_ascii_case(PRIMARY_INDEX) {
                return Err(Error::InvalidSchema(format!(
                    "index name `{}` is reserved",
                    index.name
                )));
            }
            if !index_names.insert(index.name.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "model `{}` declares index `{}` twice",
                    self.name, index.name
                )));
            }
        }

        Ok(())
    }
}

//! Property definitions for models.

use super::types::{IndexKind, IndexMethod, PropertyType};
use serde::{Deserialize, Serialize};

/// A property (column) declared on a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDef {
    /// Property name, also the column name.
    pub name: String,
    /// Semantic type.
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    /// Declared nullability. `None` means the model did not say.
    #[serde(default)]
    pub nullable: Option<bool>,
    /// Storage type override (e.g. `BIGINT`, `DECIMAL`, `CHAR`, `TEXT`).
    #[serde(default)]
    pub data_type: Option<String>,
    /// Character length (string family) or digit width (integer family).
    #[serde(default)]
    pub limit: Option<u32>,
    /// Character length; used when `limit` is absent.
    #[serde(default)]
    pub length: Option<u32>,
    /// Integer display width.
    #[serde(default)]
    pub display: Option<u32>,
    /// Numeric precision.
    #[serde(default)]
    pub precision: Option<u32>,
    /// Numeric scale.
    #[serde(default)]
    pub scale: Option<u32>,
    /// Unsigned numeric column.
    #[serde(default)]
    pub unsigned: bool,
    /// Column character set.
    #[serde(default)]
    pub charset: Option<String>,
    /// Column collation.
    #[serde(default)]
    pub collation: Option<String>,
    /// Single-column index on this property.
    #[serde(default)]
    pub index: Option<PropertyIndex>,
}

/// Single-column index declared inline on a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PropertyIndex {
    /// Index kind (e.g. unique).
    #[serde(default)]
    pub kind: Option<IndexKind>,
    /// Index method (e.g. hash).
    #[serde(default, rename = "type")]
    pub method: Option<IndexMethod>,
}

impl PropertyDef {
    /// Create a property with no facets.
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            property_type,
            nullable: None,
            data_type: None,
            limit: None,
            length: None,
            display: None,
            precision: None,
            scale: None,
            unsigned: false,
            charset: None,
            collation: None,
            index: None,
        }
    }

    /// Declare the column NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = Some(false);
        self
    }

    /// Declare the column explicitly nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = Some(true);
        self
    }

    /// Override the storage type.
    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    /// Set the length/limit facet.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the integer display width.
    pub fn with_display(mut self, display: u32) -> Self {
        self.display = Some(display);
        self
    }

    /// Set numeric precision and optional scale.
    pub fn with_precision(mut self, precision: u32, scale: Option<u32>) -> Self {
        self.precision = Some(precision);
        self.scale = scale;
        self
    }

    /// Mark as unsigned.
    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    /// Set character set and/or collation.
    pub fn with_charset(mut self, charset: Option<&str>, collation: Option<&str>) -> Self {
        self.charset = charset.map(str::to_string);
        self.collation = collation.map(str::to_string);
        self
    }

    /// Add a plain single-column index.
    pub fn with_index(mut self) -> Self {
        self.index = Some(PropertyIndex::default());
        self
    }

    /// Add a qualified single-column index.
    pub fn with_index_spec(mut self, kind: Option<IndexKind>, method: Option<IndexMethod>) -> Self {
        self.index = Some(PropertyIndex { kind, method });
        self
    }

    /// Whether the column is declared NOT NULL.
    pub fn is_not_null(&self) -> bool {
        self.nullable == Some(false)
    }

    /// Whether a single-column index should exist for this property.
    ///
    /// Serialized (JSON/array) columns are never indexed.
    pub fn wants_index(&self) -> bool {
        self.index.is_some() && !self.property_type.is_serialized()
    }
}

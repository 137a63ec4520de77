//! Core type definitions for the catalog.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type of a model property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    /// Short string, stored as VARCHAR.
    String,
    /// Long text, stored as LONGTEXT.
    Text,
    /// Numeric value. The storage family comes from the `data_type` facet.
    Number,
    /// Boolean, stored as TINYINT(1).
    Boolean,
    /// Date and time, stored as DATETIME in UTC.
    Date,
    /// Arbitrary document, serialized to text.
    Json,
    /// Enumeration over a fixed list of values.
    Enum(Vec<String>),
    /// Spatial point.
    Point,
    /// Array of an inner type, serialized to text.
    Array(Box<PropertyType>),
}

impl PropertyType {
    /// Create an enum type from its allowed values.
    pub fn enum_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PropertyType::Enum(values.into_iter().map(Into::into).collect())
    }

    /// Create an array type.
    pub fn array_of(inner: PropertyType) -> Self {
        PropertyType::Array(Box::new(inner))
    }

    /// Values of this type are stored as serialized JSON text.
    pub fn is_serialized(&self) -> bool {
        matches!(self, PropertyType::Json | PropertyType::Array(_))
    }

    /// Whether columns of this type accept character set/collation options.
    pub fn accepts_charset(&self) -> bool {
        matches!(
            self,
            PropertyType::String | PropertyType::Text | PropertyType::Json | PropertyType::Enum(_)
        )
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyType::String => write!(f, "String"),
            PropertyType::Text => write!(f, "Text"),
            PropertyType::Number => write!(f, "Number"),
            PropertyType::Boolean => write!(f, "Boolean"),
            PropertyType::Date => write!(f, "Date"),
            PropertyType::Json => write!(f, "JSON"),
            PropertyType::Enum(_) => write!(f, "Enum"),
            PropertyType::Point => write!(f, "Point"),
            PropertyType::Array(inner) => write!(f, "[{inner}]"),
        }
    }
}

/// Primary-key generation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdMode {
    /// Database-assigned id (auto-increment) or a client-declared string id.
    #[default]
    None,
    /// Time-based UUID generated by the adapter.
    V1,
    /// Random UUID generated by the adapter.
    V4,
}

impl IdMode {
    /// Ids are opaque UUID strings generated client-side.
    pub fn is_uuid(&self) -> bool {
        matches!(self, IdMode::V1 | IdMode::V4)
    }
}

/// Index kind qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// UNIQUE index.
    Unique,
    /// FULLTEXT index.
    Fulltext,
    /// SPATIAL index.
    Spatial,
}

impl IndexKind {
    /// SQL keyword for this kind.
    pub fn as_sql(&self) -> &'static str {
        match self {
            IndexKind::Unique => "UNIQUE",
            IndexKind::Fulltext => "FULLTEXT",
            IndexKind::Spatial => "SPATIAL",
        }
    }
}

/// Index storage method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMethod {
    /// B-tree index.
    Btree,
    /// Hash index.
    Hash,
}

impl IndexMethod {
    /// SQL keyword for this method.
    pub fn as_sql(&self) -> &'static str {
        match self {
            IndexMethod::Btree => "BTREE",
            IndexMethod::Hash => "HASH",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_types() {
        assert!(PropertyType::Json.is_serialized());
        assert!(PropertyType::array_of(PropertyType::Number).is_serialized());
        assert!(!PropertyType::String.is_serialized());
    }

    #[test]
    fn test_id_mode() {
        assert!(IdMode::V1.is_uuid());
        assert!(IdMode::V4.is_uuid());
        assert!(!IdMode::None.is_uuid());
        assert_eq!(IdMode::default(), IdMode::None);
    }

    #[test]
    fn test_type_serde() {
        let ty: PropertyType = serde_json::from_str(r#"{"enum":["a","b"]}"#).unwrap();
        assert_eq!(ty, PropertyType::enum_of(["a", "b"]));

        let ty: PropertyType = serde_json::from_str(r#"{"array":"string"}"#).unwrap();
        assert_eq!(ty, PropertyType::array_of(PropertyType::String));

        let mode: IdMode = serde_json::from_str(r#""v4""#).unwrap();
        assert_eq!(mode, IdMode::V4);
    }
}

//! Multi-column index definitions.

use super::types::{IndexKind, IndexMethod};
use serde::{Deserialize, Serialize};

/// An index declared in model settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    /// Index name, compared against introspected `Key_name`.
    pub name: String,
    /// Ordered column list. Never empty.
    pub columns: Vec<String>,
    /// Index kind (e.g. unique).
    #[serde(default)]
    pub kind: Option<IndexKind>,
    /// Index method (e.g. hash).
    #[serde(default, rename = "type")]
    pub method: Option<IndexMethod>,
}

impl IndexDef {
    /// Create a plain index over the given columns.
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            kind: None,
            method: None,
        }
    }

    /// Make this a unique index.
    pub fn unique(mut self) -> Self {
        self.kind = Some(IndexKind::Unique);
        self
    }

    /// Set the index kind.
    pub fn with_kind(mut self, kind: IndexKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Set the index method.
    pub fn with_method(mut self, method: IndexMethod) -> Self {
        self.method = Some(method);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_builder() {
        let idx = IndexDef::new("name_age", ["name", "age"])
            .unique()
            .with_method(IndexMethod::Btree);
        assert_eq!(idx.columns, vec!["name", "age"]);
        assert_eq!(idx.kind, Some(IndexKind::Unique));
        assert_eq!(idx.method, Some(IndexMethod::Btree));
    }
}

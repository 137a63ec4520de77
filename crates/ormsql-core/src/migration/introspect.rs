//! Live table description, as reported by `SHOW FIELDS` and `SHOW INDEXES`.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::value::{row_get, Value};

/// Most columns MySQL allows in one index.
pub const MAX_KEY_PARTS: u32 = 16;

/// One column of a live table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Column name (`Field`).
    pub name: String,
    /// Raw type text (`Type`), e.g. `int(11) unsigned`.
    pub column_type: String,
    /// Whether the column accepts NULL (`Null = YES`).
    pub nullable: bool,
}

impl FieldInfo {
    /// Create a field description.
    pub fn new(name: impl Into<String>, column_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            nullable,
        }
    }

    /// Build from a `SHOW FIELDS` result row.
    pub fn from_row(row: &[(String, Value)]) -> Result<Self> {
        Ok(Self {
            name: text_column(row, "Field")?,
            column_type: text_column(row, "Type")?,
            nullable: text_column(row, "Null")?.eq_ignore_ascii_case("YES"),
        })
    }
}

/// One column of one index of a live table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Index name (`Key_name`).
    pub index_name: String,
    /// Indexed column (`Column_name`).
    pub column_name: String,
    /// 1-based position of the column in the index (`Seq_in_index`).
    pub seq_in_index: u32,
}

impl IndexEntry {
    /// Create an index entry.
    pub fn new(index_name: impl Into<String>, column_name: impl Into<String>, seq_in_index: u32) -> Self {
        Self {
            index_name: index_name.into(),
            column_name: column_name.into(),
            seq_in_index,
        }
    }

    /// Build from a `SHOW INDEXES` result row.
    pub fn from_row(row: &[(String, Value)]) -> Result<Self> {
        let seq = match row_get(row, "Seq_in_index") {
            Some(Value::Int(n)) => u32::try_from(*n).ok(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| Error::InvalidSchema("index row has no usable `Seq_in_index`".into()))?;

        let entry = Self {
            index_name: text_column(row, "Key_name")?,
            column_name: text_column(row, "Column_name")?,
            seq_in_index: seq,
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Check that the key position is within `1..=MAX_KEY_PARTS`.
    pub fn validate(&self) -> Result<()> {
        if (1..=MAX_KEY_PARTS).contains(&self.seq_in_index) {
            Ok(())
        } else {
            Err(Error::InvalidSchema(format!(
                "index `{}` lists `{}` at position {}, expected 1..={MAX_KEY_PARTS}",
                self.index_name, self.column_name, self.seq_in_index
            )))
        }
    }
}

/// Fields and indexes of a live table.
///
/// A table with no fields is treated as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntrospectedTable {
    /// Columns in table order.
    pub fields: Vec<FieldInfo>,
    /// Flat index entries in the order the server listed them.
    pub indexes: Vec<IndexEntry>,
}

impl IntrospectedTable {
    /// Create a table description.
    pub fn new(fields: Vec<FieldInfo>, indexes: Vec<IndexEntry>) -> Self {
        Self { fields, indexes }
    }

    /// Build from raw `SHOW FIELDS` and `SHOW INDEXES` rows.
    pub fn from_rows(field_rows: &[Vec<(String, Value)>], index_rows: &[Vec<(String, Value)>]) -> Result<Self> {
        let fields = field_rows
            .iter()
            .map(|r| FieldInfo::from_row(r))
            .collect::<Result<Vec<_>>>()?;
        let indexes = index_rows
            .iter()
            .map(|r| IndexEntry::from_row(r))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(fields, indexes))
    }

    /// Check every index entry.
    pub fn validate(&self) -> Result<()> {
        self.indexes.iter().try_for_each(IndexEntry::validate)
    }

    /// Whether the table has no columns.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a column by name.
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Group index entries into `(name, ordered columns)`.
    ///
    /// Indexes keep first-seen order; each column lands at its
    /// `Seq_in_index` slot regardless of listing order. Entries that fail
    /// [`IndexEntry::validate`] are skipped.
    pub fn index_columns(&self) -> Vec<(String, Vec<String>)> {
        let mut slots: Vec<(String, Vec<Option<String>>)> = Vec::new();
        let mut by_name: HashMap<&str, usize> = HashMap::new();

        for entry in self.indexes.iter().filter(|e| e.validate().is_ok()) {
            let idx = *by_name.entry(entry.index_name.as_str()).or_insert_with(|| {
                slots.push((entry.index_name.clone(), Vec::new()));
                slots.len() - 1
            });
            let columns = &mut slots[idx].1;
            let pos = (entry.seq_in_index - 1) as usize;
            if columns.len() <= pos {
                columns.resize(pos + 1, None);
            }
            columns[pos] = Some(entry.column_name.clone());
        }

        slots
            .into_iter()
            .map(|(name, columns)| (name, columns.into_iter().flatten().collect()))
            .collect()
    }
}

fn text_column(row: &[(String, Value)], column: &str) -> Result<String> {
    match row_get(row, column) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Int(i)) => Ok(i.to_string()),
        _ => Err(Error::InvalidSchema(format!(
            "introspection row has no text `{column}` column"
        ))),
    }
}

//! Query filters and update specs.

use std::fmt;
use std::str::FromStr;

use serde_json::Value as JsonValue;

use super::condition::ConditionTree;
use crate::error::{Error, Result};
use crate::value::{Row, Value};

/// Sort direction for ORDER BY and GROUP BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl SortDirection {
    /// SQL keyword.
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(SortDirection::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(SortDirection::Desc)
        } else {
            Err(Error::InvalidFilter(format!(
                "invalid sort direction `{s}`, expected ASC or DESC"
            )))
        }
    }
}

/// One ORDER BY / GROUP BY term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    /// Column name.
    pub column: String,
    /// Direction, if given.
    pub direction: Option<SortDirection>,
}

impl OrderSpec {
    /// Term with no explicit direction.
    pub fn column(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: None,
        }
    }

    /// Ascending term.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Some(SortDirection::Asc),
        }
    }

    /// Descending term.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Some(SortDirection::Desc),
        }
    }

    /// Parse a comma-separated list such as `"name DESC, age"`.
    pub fn parse_list(s: &str) -> Result<Vec<OrderSpec>> {
        s.split(',')
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for OrderSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let column = parts
            .next()
            .ok_or_else(|| Error::InvalidFilter("empty order term".into()))?;
        let direction = parts.next().map(str::parse).transpose()?;
        if let Some(extra) = parts.next() {
            return Err(Error::InvalidFilter(format!(
                "unexpected `{extra}` in order term `{s}`"
            )));
        }
        Ok(OrderSpec {
            column: column.to_string(),
            direction,
        })
    }
}

impl fmt::Display for OrderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Some(d) => write!(f, "{} {}", self.column, d.as_sql()),
            None => write!(f, "{}", self.column),
        }
    }
}

/// Query description for `find`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    /// Row condition. `Some` with an empty tree is rejected at compile time.
    pub where_clause: Option<ConditionTree>,
    /// ORDER BY terms.
    pub order: Vec<OrderSpec>,
    /// GROUP BY terms.
    pub group: Vec<OrderSpec>,
    /// Row limit. Zero means no limit.
    pub limit: Option<u64>,
    /// Rows to skip. Only applies with a limit.
    pub skip: Option<u64>,
    /// Projected columns. `None` selects all.
    pub attributes: Option<Vec<String>>,
}

impl Filter {
    /// Empty filter selecting every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the row condition.
    pub fn with_where(mut self, tree: ConditionTree) -> Self {
        self.where_clause = Some(tree);
        self
    }

    /// Append an ORDER BY term.
    pub fn order_by(mut self, spec: OrderSpec) -> Self {
        self.order.push(spec);
        self
    }

    /// Append a GROUP BY term.
    pub fn group_by(mut self, spec: OrderSpec) -> Self {
        self.group.push(spec);
        self
    }

    /// Set the row limit.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the number of rows to skip.
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Restrict the projected columns.
    pub fn with_attributes<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Parse a filter from its JSON shape.
    ///
    /// Recognised keys are `where`, `order`, `group`, `limit`, `skip`
    /// (or `offset`) and `attributes`; anything else is ignored.
    pub fn from_json(json: &JsonValue) -> Result<Self> {
        let JsonValue::Object(obj) = json else {
            return Err(Error::InvalidFilter(format!(
                "filter must be an object, got {json}"
            )));
        };

        let mut filter = Filter::new();
        if let Some(w) = obj.get("where").filter(|w| !w.is_null()) {
            filter.where_clause = Some(ConditionTree::from_json(w)?);
        }
        if let Some(order) = obj.get("order") {
            filter.order = order_terms("order", order)?;
        }
        if let Some(group) = obj.get("group") {
            filter.group = order_terms("group", group)?;
        }
        filter.limit = count_field(obj.get("limit"), "limit")?;
        filter.skip = match count_field(obj.get("skip"), "skip")? {
            Some(skip) => Some(skip),
            None => count_field(obj.get("offset"), "offset")?,
        };
        if let Some(attrs) = obj.get("attributes").filter(|a| !a.is_null()) {
            filter.attributes = Some(string_list("attributes", attrs)?);
        }
        Ok(filter)
    }
}

fn order_terms(key: &str, json: &JsonValue) -> Result<Vec<OrderSpec>> {
    let mut terms = Vec::new();
    for s in string_list(key, json)? {
        terms.extend(OrderSpec::parse_list(&s)?);
    }
    Ok(terms)
}

fn string_list(key: &str, json: &JsonValue) -> Result<Vec<String>> {
    let not_string = || Error::InvalidFilter(format!("`{key}` expects a string or list of strings"));
    match json {
        JsonValue::Null => Ok(Vec::new()),
        JsonValue::String(s) => Ok(vec![s.clone()]),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(not_string))
            .collect(),
        _ => Err(not_string()),
    }
}

fn count_field(json: Option<&JsonValue>, key: &str) -> Result<Option<u64>> {
    match json {
        None | Some(JsonValue::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
            .map(Some)
            .ok_or_else(|| {
                Error::InvalidFilter(format!("`{key}` must be a non-negative integer, got {v}"))
            }),
    }
}

/// One item of a bulk update: a row condition plus the fields to set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSpec {
    /// Rows to update.
    pub where_clause: Option<ConditionTree>,
    /// Fields to set, in order.
    pub update: Option<Row>,
}

impl UpdateSpec {
    /// Create an update spec.
    pub fn new(where_clause: ConditionTree, update: Row) -> Self {
        Self {
            where_clause: Some(where_clause),
            update: Some(update),
        }
    }

    /// Parse `{"where": {...}, "update": {...}}`.
    ///
    /// Missing parts stay `None`; compiling reports them per item.
    pub fn from_json(json: &JsonValue) -> Result<Self> {
        let mut spec = UpdateSpec::default();
        if let Some(w) = json.get("where").filter(|w| !w.is_null()) {
            spec.where_clause = Some(ConditionTree::from_json(w)?);
        }
        if let Some(u) = json.get("update").filter(|u| !u.is_null()) {
            spec.update = Some(row_from_json(u)?);
        }
        Ok(spec)
    }
}

/// Convert a JSON object into an ordered data row.
pub fn row_from_json(json: &JsonValue) -> Result<Row> {
    match json {
        JsonValue::Object(obj) => Ok(obj
            .iter()
            .map(|(k, v)| (k.clone(), Value::from_json(v.clone())))
            .collect()),
        other => Err(Error::InvalidData(format!(
            "expected an object of fields, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_spec_parse() {
        assert_eq!("name".parse::<OrderSpec>().unwrap(), OrderSpec::column("name"));
        assert_eq!("age desc".parse::<OrderSpec>().unwrap(), OrderSpec::desc("age"));
        assert_eq!(
            OrderSpec::parse_list("name ASC, age DESC").unwrap(),
            vec![OrderSpec::asc("name"), OrderSpec::desc("age")]
        );
    }

    #[test]
    fn test_order_spec_rejects_bad_direction() {
        let err = "name; DROP TABLE x".parse::<OrderSpec>().unwrap_err();
        assert!(matches!(err, Error::InvalidFilter(_)));
        assert!("name sideways".parse::<OrderSpec>().is_err());
    }

    #[test]
    fn test_filter_from_json() {
        let filter = Filter::from_json(&json!({
            "where": {"age": {"gt": 18}},
            "order": ["name DESC", "age"],
            "group": "city",
            "limit": 10,
            "skip": 20,
            "attributes": ["name", "age"]
        }))
        .unwrap();

        assert_eq!(filter.where_clause.unwrap().len(), 1);
        assert_eq!(filter.order, vec![OrderSpec::desc("name"), OrderSpec::column("age")]);
        assert_eq!(filter.group, vec![OrderSpec::column("city")]);
        assert_eq!(filter.limit, Some(10));
        assert_eq!(filter.skip, Some(20));
        assert_eq!(filter.attributes.unwrap(), vec!["name", "age"]);
    }

    #[test]
    fn test_filter_offset_alias() {
        let filter = Filter::from_json(&json!({"limit": 5, "offset": 15})).unwrap();
        assert_eq!(filter.skip, Some(15));
    }

    #[test]
    fn test_filter_rejects_negative_limit() {
        assert!(Filter::from_json(&json!({"limit": -1})).is_err());
        assert!(Filter::from_json(&json!({"order": 5})).is_err());
    }

    #[test]
    fn test_update_spec_from_json() {
        let spec = UpdateSpec::from_json(&json!({
            "where": {"id": 1},
            "update": {"name": "A", "age": null}
        }))
        .unwrap();
        assert!(spec.where_clause.is_some());
        assert_eq!(
            spec.update.unwrap(),
            vec![("name".to_string(), Value::from("A")), ("age".to_string(), Value::Null)]
        );

        let partial = UpdateSpec::from_json(&json!({"update": {"name": "A"}})).unwrap();
        assert!(partial.where_clause.is_none());
    }
}

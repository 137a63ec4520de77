//! Condition trees: the `where` part of a filter.

use serde_json::{Map, Value as JsonValue};

use crate::error::{Error, Result};
use crate::value::Value;

/// Reserved key holding a list of disjuncts.
pub const OR_KEY: &str = "or";

/// Binary comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `!=`
    Neq,
}

impl CompareOp {
    /// SQL operator text.
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Neq => "!=",
        }
    }
}

/// Condition on a single field.
///
/// Each variant maps to exactly one SQL shape; the compiler never has to
/// guess from the runtime shape of a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Equality, or `IS NULL` when the value is null.
    Scalar(Value),
    /// `BETWEEN low AND high`.
    Range(Value, Value),
    /// Membership: `IN (...)`, or `NOT IN (...)` when negated.
    List {
        /// Candidate values.
        values: Vec<Value>,
        /// Render as `NOT IN`.
        negated: bool,
    },
    /// Comparison against a single value.
    Compare(CompareOp, Value),
    /// `LIKE` pattern.
    Like(String),
    /// Disjunction of nested trees. Only valid under the `or` key.
    Or(Vec<ConditionTree>),
}

impl Condition {
    /// Equality condition.
    pub fn eq(value: impl Into<Value>) -> Self {
        Condition::Scalar(value.into())
    }

    /// `IS NULL` condition.
    pub fn is_null() -> Self {
        Condition::Scalar(Value::Null)
    }

    /// `>` condition.
    pub fn gt(value: impl Into<Value>) -> Self {
        Condition::Compare(CompareOp::Gt, value.into())
    }

    /// `>=` condition.
    pub fn gte(value: impl Into<Value>) -> Self {
        Condition::Compare(CompareOp::Gte, value.into())
    }

    /// `<` condition.
    pub fn lt(value: impl Into<Value>) -> Self {
        Condition::Compare(CompareOp::Lt, value.into())
    }

    /// `<=` condition.
    pub fn lte(value: impl Into<Value>) -> Self {
        Condition::Compare(CompareOp::Lte, value.into())
    }

    /// `!=` condition.
    pub fn neq(value: impl Into<Value>) -> Self {
        Condition::Compare(CompareOp::Neq, value.into())
    }

    /// `BETWEEN` condition.
    pub fn between(low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Condition::Range(low.into(), high.into())
    }

    /// `IN` condition.
    pub fn inq<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Condition::List {
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    /// `NOT IN` condition.
    pub fn nin<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Condition::List {
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        }
    }

    /// `LIKE` condition.
    pub fn like(pattern: impl Into<String>) -> Self {
        Condition::Like(pattern.into())
    }

    /// Parse a condition from its JSON shape.
    ///
    /// Null and scalars are equality, arrays are membership, and a
    /// single-key object is an operator. `{}` means null.
    pub fn from_json(field: &str, json: &JsonValue) -> Result<Self> {
        match json {
            JsonValue::Array(items) => Ok(Condition::List {
                values: items.iter().cloned().map(Value::from_json).collect(),
                negated: false,
            }),
            JsonValue::Object(obj) => Self::from_operator_object(field, obj),
            other => Ok(Condition::Scalar(Value::from_json(other.clone()))),
        }
    }

    fn from_operator_object(field: &str, obj: &Map<String, JsonValue>) -> Result<Self> {
        let mut entries = obj.iter();
        let Some((op, operand)) = entries.next() else {
            return Ok(Condition::is_null());
        };
        if entries.next().is_some() {
            let ops: Vec<_> = obj.keys().map(String::as_str).collect();
            return Err(Error::InvalidFilter(format!(
                "condition on `{field}` has {} operators ({}); exactly one is allowed",
                ops.len(),
                ops.join(", ")
            )));
        }

        let value = || Value::from_json(operand.clone());
        match op.as_str() {
            "gt" => Ok(Condition::Compare(CompareOp::Gt, value())),
            "gte" => Ok(Condition::Compare(CompareOp::Gte, value())),
            "lt" => Ok(Condition::Compare(CompareOp::Lt, value())),
            "lte" => Ok(Condition::Compare(CompareOp::Lte, value())),
            "neq" => Ok(Condition::Compare(CompareOp::Neq, value())),
            "between" => match operand {
                JsonValue::Array(pair) if pair.len() == 2 => Ok(Condition::Range(
                    Value::from_json(pair[0].clone()),
                    Value::from_json(pair[1].clone()),
                )),
                _ => Err(Error::InvalidFilter(format!(
                    "`between` on `{field}` expects a two-element array"
                ))),
            },
            "inq" | "nin" => {
                let values = match operand {
                    JsonValue::Array(items) => items.iter().cloned().map(Value::from_json).collect(),
                    single => vec![Value::from_json(single.clone())],
                };
                Ok(Condition::List {
                    values,
                    negated: op == "nin",
                })
            }
            "like" => match operand {
                JsonValue::String(pattern) => Ok(Condition::Like(pattern.clone())),
                _ => Err(Error::InvalidFilter(format!(
                    "`like` on `{field}` expects a string pattern"
                ))),
            },
            unknown => Err(Error::InvalidFilter(format!(
                "unknown operator `{unknown}` on `{field}`"
            ))),
        }
    }
}

/// Ordered mapping of field name to condition.
///
/// Entries compile in insertion order and are joined with `AND`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionTree {
    entries: Vec<(String, Condition)>,
}

impl ConditionTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition on a field.
    pub fn with(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.entries.push((field.into(), condition));
        self
    }

    /// Add an equality condition.
    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::eq(value))
    }

    /// Add an `or` group.
    pub fn or(self, disjuncts: Vec<ConditionTree>) -> Self {
        self.with(OR_KEY, Condition::Or(disjuncts))
    }

    /// Append a condition in place.
    pub fn push(&mut self, field: impl Into<String>, condition: Condition) {
        self.entries.push((field.into(), condition));
    }

    /// Whether the tree has no conditions.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of top-level conditions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate over `(field, condition)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.entries.iter().map(|(k, c)| (k.as_str(), c))
    }

    /// Parse a tree from a JSON object, keeping key order.
    pub fn from_json(json: &JsonValue) -> Result<Self> {
        let JsonValue::Object(obj) = json else {
            return Err(Error::InvalidFilter(format!(
                "where must be an object, got {json}"
            )));
        };

        let mut tree = ConditionTree::new();
        for (key, value) in obj {
            if key.eq_ignore_ascii_case(OR_KEY) {
                let JsonValue::Array(items) = value else {
                    return Err(Error::InvalidFilter(
                        "`or` expects an array of conditions".into(),
                    ));
                };
                let disjuncts = items
                    .iter()
                    .map(ConditionTree::from_json)
                    .collect::<Result<Vec<_>>>()?;
                tree.push(OR_KEY, Condition::Or(disjuncts));
            } else {
                tree.push(key.clone(), Condition::from_json(key, value)?);
            }
        }
        Ok(tree)
    }
}

impl<K: Into<String>> FromIterator<(K, Condition)> for ConditionTree {
    fn from_iter<T: IntoIterator<Item = (K, Condition)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, c)| (k.into(), c)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_operator_shapes() {
        let tree = ConditionTree::from_json(&json!({
            "age": {"gt": 18},
            "name": {"like": "A%"},
            "score": {"between": [1, 5]},
            "tag": {"nin": ["x"]},
            "city": ["Oslo", "Rome"],
            "deleted": null,
            "status": "active"
        }))
        .unwrap();

        let conds: Vec<_> = tree.iter().collect();
        assert_eq!(conds[0], ("age", &Condition::gt(18i64)));
        assert_eq!(conds[1], ("name", &Condition::like("A%")));
        assert_eq!(conds[2], ("score", &Condition::between(1i64, 5i64)));
        assert_eq!(conds[3], ("tag", &Condition::nin(["x"])));
        assert_eq!(conds[4], ("city", &Condition::inq(["Oslo", "Rome"])));
        assert_eq!(conds[5], ("deleted", &Condition::is_null()));
        assert_eq!(conds[6], ("status", &Condition::eq("active")));
    }

    #[test]
    fn test_parse_keeps_declaration_order() {
        let tree = ConditionTree::from_json(&json!({"z": 1, "a": 2, "m": 3})).unwrap();
        let keys: Vec<_> = tree.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_parse_or() {
        let tree = ConditionTree::from_json(&json!({
            "or": [{"status": "active"}, {"status": "pending"}]
        }))
        .unwrap();
        let (key, cond) = tree.iter().next().unwrap();
        assert_eq!(key, "or");
        assert!(matches!(cond, Condition::Or(d) if d.len() == 2));
    }

    #[test]
    fn test_reject_multi_key_operator() {
        let err = ConditionTree::from_json(&json!({"age": {"gt": 1, "lt": 5}})).unwrap_err();
        assert!(matches!(err, Error::InvalidFilter(msg) if msg.contains("exactly one")));
    }

    #[test]
    fn test_reject_unknown_operator() {
        let err = ConditionTree::from_json(&json!({"age": {"regexp": "x"}})).unwrap_err();
        assert!(matches!(err, Error::InvalidFilter(msg) if msg.contains("regexp")));
    }

    #[test]
    fn test_reject_malformed_operands() {
        assert!(ConditionTree::from_json(&json!({"age": {"between": [1]}})).is_err());
        assert!(ConditionTree::from_json(&json!({"name": {"like": 3}})).is_err());
        assert!(ConditionTree::from_json(&json!({"or": {"a": 1}})).is_err());
        assert!(ConditionTree::from_json(&json!(["a"])).is_err());
    }

    #[test]
    fn test_empty_operator_object_is_null() {
        let tree = ConditionTree::from_json(&json!({"age": {}})).unwrap();
        assert_eq!(tree.iter().next().unwrap().1, &Condition::is_null());
    }

    #[test]
    fn test_scalar_inq_operand() {
        let tree = ConditionTree::from_json(&json!({"id": {"inq": 3}})).unwrap();
        assert_eq!(tree.iter().next().unwrap().1, &Condition::inq([3i64]));
    }
}

//! Bidirectional value codec between model values and MySQL column text.
//!
//! Encoding produces SQL-literal-safe text for a value, driven by the
//! property's declared type. Decoding hydrates raw driver values back into
//! model-shaped values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use super::escape::escape_string;
use crate::catalog::{ModelSchema, PropertyDef, PropertyType, ID_COLUMN};
use crate::error::{Error, Result};
use crate::query::Condition;
use crate::value::{Row, Value};

/// Literal `NULL`.
pub const NULL_LITERAL: &str = "NULL";

/// Fixed-width MySQL DATETIME format with millisecond precision.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Encoded form of a model value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlLiteral {
    /// A single literal.
    Scalar(String),
    /// One literal per element of an array input. The caller joins them.
    List(Vec<String>),
}

impl SqlLiteral {
    /// Render as text, joining list elements with `sep`.
    pub fn join(self, sep: &str) -> String {
        match self {
            SqlLiteral::Scalar(s) => s,
            SqlLiteral::List(items) => items.join(sep),
        }
    }
}

/// Value codec bound to one model snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ValueCodec<'a> {
    model: &'a ModelSchema,
}

impl<'a> ValueCodec<'a> {
    /// Create a codec for a model.
    pub fn new(model: &'a ModelSchema) -> Self {
        Self { model }
    }

    /// The model this codec encodes for.
    pub fn model(&self) -> &'a ModelSchema {
        self.model
    }

    /// Encode a value for column `key`.
    ///
    /// Keys with no declared property are encoded from the value's own shape.
    pub fn to_column_value(&self, key: &str, value: &Value) -> Result<SqlLiteral> {
        if value.is_null() {
            return Ok(SqlLiteral::Scalar(NULL_LITERAL.to_string()));
        }

        let uuid_id = key == ID_COLUMN && self.model.id_mode().is_uuid();
        let prop = self.model.get_property(key);
        if let Some(p) = prop.filter(|_| !uuid_id) {
            if p.property_type.is_serialized() {
                return Ok(SqlLiteral::Scalar(escape_string(&value.to_json().to_string())));
            }
        }

        let encode = |item: &Value| {
            if uuid_id && !item.is_null() {
                Ok(escape_string(&text_of(item)))
            } else {
                encode_scalar(key, prop, item)
            }
        };

        match value {
            Value::Array(items) => items
                .iter()
                .map(encode)
                .collect::<Result<Vec<_>>>()
                .map(SqlLiteral::List),
            other => encode(other).map(SqlLiteral::Scalar),
        }
    }

    /// Encode a value that must produce exactly one literal.
    pub fn scalar_literal(&self, key: &str, value: &Value) -> Result<String> {
        match self.to_column_value(key, value)? {
            SqlLiteral::Scalar(s) => Ok(s),
            SqlLiteral::List(_) => Err(Error::InvalidFilter(format!(
                "`{key}` expects a single value, got a list"
            ))),
        }
    }

    /// Encode the operand side of a condition.
    ///
    /// `between` yields `<lo> AND <hi>`; membership lists yield a
    /// comma-joined literal list.
    pub fn operand_literal(&self, key: &str, condition: &Condition) -> Result<String> {
        match condition {
            Condition::Scalar(v) | Condition::Compare(_, v) => self.scalar_literal(key, v),
            Condition::Range(low, high) => Ok(format!(
                "{} AND {}",
                self.scalar_literal(key, low)?,
                self.scalar_literal(key, high)?
            )),
            Condition::List { values, .. } => {
                let literals = values
                    .iter()
                    .map(|v| self.scalar_literal(key, v))
                    .collect::<Result<Vec<_>>>()?;
                Ok(literals.join(","))
            }
            Condition::Like(pattern) => Ok(escape_string(pattern)),
            Condition::Or(_) => Err(Error::InvalidFilter(
                "`or` cannot be used as an operand".into(),
            )),
        }
    }

    /// Decode a raw column value for `key` into a model value.
    ///
    /// JSON that fails to parse decodes to `Null`; the failure is logged,
    /// not returned.
    pub fn from_column_value(&self, key: &str, raw: Value) -> Value {
        if raw.is_null() {
            return raw;
        }
        let Some(prop) = self.model.get_property(key) else {
            return raw;
        };

        match &prop.property_type {
            PropertyType::Date => match raw {
                Value::Date(_) => raw,
                Value::String(ref s) => match parse_datetime(s) {
                    Some(d) => Value::Date(d),
                    None => {
                        tracing::debug!(field = key, raw = %s, "unparsable date column");
                        Value::Null
                    }
                },
                Value::Int(ms) => DateTime::from_timestamp_millis(ms)
                    .map(Value::Date)
                    .unwrap_or(Value::Null),
                other => other,
            },
            PropertyType::Boolean => Value::Bool(raw.is_truthy()),
            PropertyType::Json | PropertyType::Array(_) => match raw {
                Value::String(ref s) => decode_json(key, prop, s),
                other => other,
            },
            _ => raw,
        }
    }

    /// Decode every column of a result row.
    pub fn hydrate(&self, row: Row) -> Row {
        row.into_iter()
            .map(|(name, raw)| {
                let value = self.from_column_value(&name, raw);
                (name, value)
            })
            .collect()
    }
}

fn decode_json(key: &str, prop: &PropertyDef, text: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(parsed) if prop.property_type == PropertyType::Json => Value::Json(parsed),
        Ok(parsed) => Value::from_json(parsed),
        Err(e) => {
            tracing::debug!(field = key, error = %e, "json column did not parse, using NULL");
            Value::Null
        }
    }
}

fn encode_scalar(key: &str, prop: Option<&PropertyDef>, value: &Value) -> Result<String> {
    if value.is_null() {
        return Ok(NULL_LITERAL.to_string());
    }
    let Some(prop) = prop else {
        return Ok(untyped_literal(value));
    };

    match &prop.property_type {
        PropertyType::Number => number_literal(key, value),
        PropertyType::Date => date_literal(key, value),
        PropertyType::Boolean => Ok(bool_literal(value.is_truthy()).to_string()),
        _ => Ok(escape_string(&text_of(value))),
    }
}

fn untyped_literal(value: &Value) -> String {
    match value {
        Value::Null => NULL_LITERAL.to_string(),
        Value::Bool(b) => bool_literal(*b).to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) if f.is_finite() => format_number(*f),
        Value::Date(d) => escape_string(&format_datetime(d)),
        other => escape_string(&text_of(other)),
    }
}

fn bool_literal(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

fn number_literal(key: &str, value: &Value) -> Result<String> {
    match value {
        Value::Int(i) => Ok(i.to_string()),
        Value::Float(f) if f.is_finite() => Ok(format_number(*f)),
        Value::Float(f) => Err(Error::invalid_value(key, format!("{f} is not a finite number"))),
        Value::Bool(b) => Ok(bool_literal(*b).to_string()),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                Ok(i.to_string())
            } else if let Some(f) = trimmed.parse::<f64>().ok().filter(|f| f.is_finite()) {
                Ok(format_number(f))
            } else {
                Err(Error::invalid_value(key, format!("`{s}` is not a number")))
            }
        }
        Value::Date(d) => Ok(d.timestamp_millis().to_string()),
        other => Err(Error::invalid_value(
            key,
            format!("cannot coerce {other:?} to a number"),
        )),
    }
}

fn date_literal(key: &str, value: &Value) -> Result<String> {
    let date = match value {
        Value::Date(d) => *d,
        Value::String(s) => parse_datetime(s)
            .ok_or_else(|| Error::invalid_value(key, format!("`{s}` is not a date")))?,
        Value::Int(ms) => DateTime::from_timestamp_millis(*ms)
            .ok_or_else(|| Error::invalid_value(key, format!("{ms} is out of range")))?,
        other => {
            return Err(Error::invalid_value(
                key,
                format!("cannot coerce {other:?} to a date"),
            ))
        }
    };
    Ok(escape_string(&format_datetime(&date)))
}

/// Render a float without a trailing `.0` for integral values.
pub fn format_number(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{f}")
    }
}

/// Format a date as `YYYY-MM-DD HH:MM:SS.mmm` in UTC.
pub fn format_datetime(date: &DateTime<Utc>) -> String {
    date.format(DATETIME_FORMAT).to_string()
}

/// Parse a date string as UTC, ignoring any trailing zone marker.
///
/// Accepts RFC 3339, the MySQL `DATETIME` text forms, a driver's
/// `... GMT+0000 (...)` suffix, and bare dates.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }

    let stripped = strip_zone_marker(s);
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(stripped, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(stripped, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn strip_zone_marker(s: &str) -> &str {
    let cut = [" GMT", " UTC"]
        .iter()
        .filter_map(|marker| s.find(marker))
        .min()
        .unwrap_or(s.len());
    s[..cut].trim_end().trim_end_matches('Z')
}

/// Textual form of a value, used for string-typed columns.
fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format_number(*f),
        Value::String(s) => s.clone(),
        Value::Date(d) => format_datetime(d),
        Value::Json(_) | Value::Array(_) => value.to_json().to_string(),
    }
}

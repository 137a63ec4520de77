//! Column type declarations derived from property metadata.

use super::escape::escape_string;
use crate::catalog::{PropertyDef, PropertyType};

/// Default VARCHAR length.
pub const DEFAULT_STRING_LENGTH: u32 = 255;

/// Default DECIMAL precision and scale.
pub const DEFAULT_DECIMAL: (u32, u32) = (9, 2);

/// Full column definition: type, charset/collation, and nullability.
///
/// This is what follows the column name in `CREATE TABLE`, `ADD COLUMN` and
/// `CHANGE COLUMN`.
pub fn column_ddl(prop: &PropertyDef) -> String {
    let mut dt = column_type(prop);
    if prop.property_type.accepts_charset() {
        push_charset(prop, &mut dt);
    }
    dt.push_str(if prop.is_not_null() { " NOT NULL" } else { " NULL" });
    dt
}

/// Bare column type, as MySQL reports it in `SHOW FIELDS`.
///
/// Comparison against introspected types uses this form (case-insensitive),
/// which is why charset and nullability are left out.
pub fn column_type(prop: &PropertyDef) -> String {
    match &prop.property_type {
        PropertyType::Array(_) => "TEXT".to_string(),
        PropertyType::String => sized_string(prop, base_type(prop, "VARCHAR")),
        PropertyType::Text | PropertyType::Json => sized_string(prop, base_type(prop, "LONGTEXT")),
        PropertyType::Date => sized_string(prop, base_type(prop, "DATETIME")),
        PropertyType::Number => numeric(prop, base_type(prop, "INT")),
        PropertyType::Boolean => "TINYINT(1)".to_string(),
        PropertyType::Point => "POINT".to_string(),
        PropertyType::Enum(values) => {
            let list: Vec<String> = values.iter().map(|v| escape_string(v)).collect();
            format!("ENUM({})", list.join(","))
        }
    }
}

fn base_type(prop: &PropertyDef, default: &str) -> String {
    prop.data_type
        .as_deref()
        .map(str::to_ascii_uppercase)
        .unwrap_or_else(|| default.to_string())
}

fn sized_string(prop: &PropertyDef, mut dt: String) -> String {
    match dt.to_ascii_lowercase().as_str() {
        "datetime" | "timestamp" | "time" => {
            if let Some(len) = prop.length {
                dt.push_str(&format!("({len})"));
            }
        }
        "text" | "tinytext" | "mediumtext" | "longtext" => {}
        _ => {
            let len = prop.limit.or(prop.length).unwrap_or(DEFAULT_STRING_LENGTH);
            dt.push_str(&format!("({len})"));
        }
    }
    dt
}

fn push_charset(prop: &PropertyDef, dt: &mut String) {
    if let Some(charset) = &prop.charset {
        dt.push_str(" CHARACTER SET ");
        dt.push_str(charset);
    }
    if let Some(collation) = &prop.collation {
        dt.push_str(" COLLATE ");
        dt.push_str(collation);
    }
}

fn numeric(prop: &PropertyDef, dt: String) -> String {
    let mut dt = match dt.to_ascii_lowercase().as_str() {
        "decimal" | "numeric" => fixed_point(prop, dt),
        "float" | "double" | "real" => floating_point(prop, dt),
        _ => integer(prop, dt),
    };
    if prop.unsigned {
        dt.push_str(" UNSIGNED");
    }
    dt
}

fn fixed_point(prop: &PropertyDef, dt: String) -> String {
    let precision = prop.precision.unwrap_or(DEFAULT_DECIMAL.0);
    let scale = prop.scale.unwrap_or(DEFAULT_DECIMAL.1);
    format!("{dt}({precision},{scale})")
}

// Only an explicit precision produces a suffix; a lone scale is ignored.
fn floating_point(prop: &PropertyDef, dt: String) -> String {
    match (prop.precision, prop.scale) {
        (Some(p), Some(s)) => format!("{dt}({p},{s})"),
        (Some(p), None) => format!("{dt}({p})"),
        _ => dt,
    }
}

fn integer(prop: &PropertyDef, dt: String) -> String {
    let explicit = prop.display.or(prop.limit).filter(|w| *w > 0);
    let width = explicit.unwrap_or_else(|| {
        let (signed, unsigned) = match dt.to_ascii_lowercase().as_str() {
            "tinyint" => (4, 3),
            "smallint" => (6, 5),
            "mediumint" => (9, 8),
            "bigint" => (20, 20),
            _ => (11, 10),
        };
        if prop.unsigned {
            unsigned
        } else {
            signed
        }
    });
    format!("{dt}({width})")
}

//! Value codec: model values to SQL literals and back, plus column DDL.

mod column_type;
mod escape;
mod value_codec;

pub use column_type::{column_ddl, column_type, DEFAULT_DECIMAL, DEFAULT_STRING_LENGTH};
pub use escape::{escape_identifier, escape_string};
pub use value_codec::{
    format_datetime, format_number, parse_datetime, SqlLiteral, ValueCodec, DATETIME_FORMAT,
    NULL_LITERAL,
};

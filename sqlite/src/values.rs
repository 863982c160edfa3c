//! SQLite values and their mapping to and from JSON.

use std::borrow::Cow;
use std::fmt::Write;

use drizzle_graphql_core::{ColumnType, GeneratorError, Result};
use serde_json::{Number, Value};

/// Represents a SQLite value
#[derive(Debug, Clone, PartialEq, PartialOrd, Default)]
pub enum SQLiteValue<'a> {
    /// Integer value (i64)
    Integer(i64),
    /// Real value (f64)
    Real(f64),
    /// Text value (borrowed or owned string)
    Text(Cow<'a, str>),
    /// Blob value (borrowed or owned binary data)
    Blob(Cow<'a, [u8]>),
    /// NULL value
    #[default]
    Null,
}

impl<'a> SQLiteValue<'a> {
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, SQLiteValue::Null)
    }

    #[inline]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            SQLiteValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SQLiteValue::Text(value) => Some(value.as_ref()),
            _ => None,
        }
    }

    /// Detaches the value from the row or input it borrows from.
    pub fn into_owned(self) -> SQLiteValue<'static> {
        match self {
            SQLiteValue::Integer(i) => SQLiteValue::Integer(i),
            SQLiteValue::Real(r) => SQLiteValue::Real(r),
            SQLiteValue::Text(s) => SQLiteValue::Text(Cow::Owned(s.into_owned())),
            SQLiteValue::Blob(b) => SQLiteValue::Blob(Cow::Owned(b.into_owned())),
            SQLiteValue::Null => SQLiteValue::Null,
        }
    }
}

impl<'a> From<&'a str> for SQLiteValue<'a> {
    fn from(value: &'a str) -> Self {
        SQLiteValue::Text(Cow::Borrowed(value))
    }
}

impl From<String> for SQLiteValue<'_> {
    fn from(value: String) -> Self {
        SQLiteValue::Text(Cow::Owned(value))
    }
}

impl From<i64> for SQLiteValue<'_> {
    fn from(value: i64) -> Self {
        SQLiteValue::Integer(value)
    }
}

impl From<bool> for SQLiteValue<'_> {
    fn from(value: bool) -> Self {
        SQLiteValue::Integer(i64::from(value))
    }
}

/// JSON input to a bind value: booleans become 0/1, arrays and objects are
/// stored as JSON text.
impl<'a> From<&'a Value> for SQLiteValue<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => SQLiteValue::Null,
            Value::Bool(b) => SQLiteValue::from(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SQLiteValue::Integer(i),
                None => SQLiteValue::Real(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => SQLiteValue::Text(Cow::Borrowed(s)),
            Value::Array(_) | Value::Object(_) => SQLiteValue::Text(Cow::Owned(value.to_string())),
        }
    }
}

impl std::fmt::Display for SQLiteValue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SQLiteValue::Integer(i) => write!(f, "{i}"),
            SQLiteValue::Real(r) => write!(f, "{r}"),
            SQLiteValue::Text(s) => f.write_str(s),
            SQLiteValue::Blob(b) => f.write_str(&hex(b)),
            SQLiteValue::Null => Ok(()),
        }
    }
}

/// Maps a stored value to its JSON output according to the column type.
///
/// Booleans are stored as integers, JSON and array columns as text, blobs
/// are returned as upper-case hex like SQLite's `hex()`.
pub fn decode(column_type: ColumnType, value: SQLiteValue<'_>) -> Result<Value> {
    Ok(match (column_type, value) {
        (_, SQLiteValue::Null) => Value::Null,
        (ColumnType::Boolean, SQLiteValue::Integer(i)) => Value::Bool(i != 0),
        (ColumnType::Boolean, SQLiteValue::Real(r)) => Value::Bool(r != 0.0),
        (ColumnType::Json | ColumnType::Array, SQLiteValue::Text(text)) => {
            serde_json::from_str(&text)?
        }
        (_, SQLiteValue::Integer(i)) => Value::from(i),
        (_, SQLiteValue::Real(r)) => Number::from_f64(r).map_or(Value::Null, Value::Number),
        (_, SQLiteValue::Text(text)) => Value::String(text.into_owned()),
        (_, SQLiteValue::Blob(bytes)) => Value::String(hex(&bytes)),
    })
}

/// Fixes up a column value that went through `json_object`: only booleans
/// need it, everything else already has its JSON shape.
pub(crate) fn decode_embedded(column_type: ColumnType, value: Value) -> Result<Value> {
    match (column_type, value) {
        (ColumnType::Boolean, Value::Number(n)) => Ok(Value::Bool(n.as_f64() != Some(0.0))),
        (ColumnType::Boolean, other @ (Value::Array(_) | Value::Object(_))) => Err(
            GeneratorError::Mapping(format!("expected a boolean, got {other}")),
        ),
        (_, value) => Ok(value),
    }
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02X}");
    }
    out
}

//------------------------------------------------------------------------------
// rusqlite implementations
//------------------------------------------------------------------------------

#[cfg(feature = "rusqlite")]
impl rusqlite::ToSql for SQLiteValue<'_> {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
        Ok(match self {
            SQLiteValue::Null => ToSqlOutput::Owned(SqlValue::Null),
            SQLiteValue::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            SQLiteValue::Real(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            SQLiteValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SQLiteValue::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b.as_ref())),
        })
    }
}

#[cfg(feature = "rusqlite")]
impl<'a> From<rusqlite::types::ValueRef<'a>> for SQLiteValue<'a> {
    fn from(value: rusqlite::types::ValueRef<'a>) -> Self {
        use rusqlite::types::ValueRef;
        match value {
            ValueRef::Null => SQLiteValue::Null,
            ValueRef::Integer(i) => SQLiteValue::Integer(i),
            ValueRef::Real(r) => SQLiteValue::Real(r),
            // Zero-copy: borrow if valid UTF-8, otherwise allocate for lossy conversion
            ValueRef::Text(items) => match std::str::from_utf8(items) {
                Ok(s) => SQLiteValue::Text(Cow::Borrowed(s)),
                Err(_) => SQLiteValue::Text(String::from_utf8_lossy(items).into_owned().into()),
            },
            ValueRef::Blob(items) => SQLiteValue::Blob(Cow::Borrowed(items)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_input_to_bind_values() {
        assert_eq!(SQLiteValue::from(&json!(true)), SQLiteValue::Integer(1));
        assert_eq!(SQLiteValue::from(&json!(2.5)), SQLiteValue::Real(2.5));
        assert_eq!(SQLiteValue::from(&json!("x")), SQLiteValue::from("x"));
        assert_eq!(
            SQLiteValue::from(&json!(["a", 1])),
            SQLiteValue::from(r#"["a",1]"#.to_string())
        );
    }

    #[test]
    fn decodes_by_column_type() {
        assert_eq!(
            decode(ColumnType::Boolean, SQLiteValue::Integer(0)).unwrap(),
            json!(false)
        );
        assert_eq!(
            decode(ColumnType::Array, SQLiteValue::from("[1,2]")).unwrap(),
            json!([1, 2])
        );
        assert_eq!(
            decode(ColumnType::Blob, SQLiteValue::Blob(Cow::Borrowed(&[0xCA, 0xFE]))).unwrap(),
            json!("CAFE")
        );
        assert_eq!(decode(ColumnType::Text, SQLiteValue::Null).unwrap(), Value::Null);
        assert!(decode(ColumnType::Json, SQLiteValue::from("{oops")).is_err());
    }

    #[test]
    fn embedded_booleans() {
        assert_eq!(decode_embedded(ColumnType::Boolean, json!(1)).unwrap(), json!(true));
        assert_eq!(decode_embedded(ColumnType::Text, json!("1")).unwrap(), json!("1"));
    }
}

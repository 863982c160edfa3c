//! Column descriptors.

use serde::{Deserialize, Serialize};

/// Semantic storage type of a column.
///
/// Drives output decoding (booleans stored as integers, JSON and array
/// columns stored as text) and the scalar type reported to the protocol layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Boolean,
    DateTime,
    Json,
    Blob,
    /// JSON array of scalars
    Array,
}

impl ColumnType {
    /// Maps a declared SQL type to a semantic type.
    ///
    /// Follows SQLite's type-affinity rules, with `BOOLEAN`, `DATE`/`TIME`,
    /// `JSON` and `[]` suffixes recognised first.
    pub fn from_sql_type(sql_type: &str) -> Self {
        let upper = sql_type.trim().to_ascii_uppercase();
        if upper.ends_with("[]") {
            return ColumnType::Array;
        }
        if upper.starts_with("BOOL") {
            return ColumnType::Boolean;
        }
        if upper.contains("JSON") {
            return ColumnType::Json;
        }
        if upper.contains("DATE") || upper.contains("TIME") {
            return ColumnType::DateTime;
        }
        if upper.contains("INT") {
            return ColumnType::Integer;
        }
        if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            return ColumnType::Text;
        }
        if upper.is_empty() || upper.contains("BLOB") {
            return ColumnType::Blob;
        }
        if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            return ColumnType::Real;
        }
        // NUMERIC affinity
        ColumnType::Real
    }

    /// Scalar name exposed on the protocol side.
    pub const fn scalar_name(self) -> &'static str {
        match self {
            ColumnType::Integer => "Int",
            ColumnType::Real => "Float",
            ColumnType::Text => "String",
            ColumnType::Boolean => "Boolean",
            ColumnType::DateTime => "DateTime",
            ColumnType::Json | ColumnType::Array => "JSON",
            ColumnType::Blob => "String",
        }
    }
}

/// A column of a modeled table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    pub not_null: bool,
    pub primary_key: bool,
    pub has_default: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            not_null: false,
            primary_key: false,
            has_default: false,
        }
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Primary key columns are implicitly NOT NULL.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.not_null = true;
        self
    }

    #[must_use]
    pub fn has_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    #[inline]
    pub fn is_nullable(&self) -> bool {
        !self.not_null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_types_map_to_affinity() {
        assert_eq!(ColumnType::from_sql_type("INTEGER"), ColumnType::Integer);
        assert_eq!(ColumnType::from_sql_type("bigint"), ColumnType::Integer);
        assert_eq!(ColumnType::from_sql_type("VARCHAR(255)"), ColumnType::Text);
        assert_eq!(ColumnType::from_sql_type("boolean"), ColumnType::Boolean);
        assert_eq!(ColumnType::from_sql_type("TIMESTAMP"), ColumnType::DateTime);
        assert_eq!(ColumnType::from_sql_type("jsonb"), ColumnType::Json);
        assert_eq!(ColumnType::from_sql_type("TEXT[]"), ColumnType::Array);
        assert_eq!(ColumnType::from_sql_type("DOUBLE"), ColumnType::Real);
        assert_eq!(ColumnType::from_sql_type(""), ColumnType::Blob);
        assert_eq!(ColumnType::from_sql_type("DECIMAL(10,2)"), ColumnType::Real);
    }
}

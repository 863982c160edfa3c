//! Sort specifications.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{GeneratorError, Result};

/// Sort direction for ORDER BY clauses
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderBy {
    Asc,
    Desc,
}

impl OrderBy {
    pub const fn as_sql(self) -> &'static str {
        match self {
            OrderBy::Asc => "ASC",
            OrderBy::Desc => "DESC",
        }
    }
}

/// Ordered list of `(column, direction)` pairs.
///
/// Sorts are never merged field by field: a non-empty caller sort replaces
/// the policy sort wholesale (see [`crate::policy::merge_order_by`]).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sort {
    entries: Vec<(String, OrderBy)>,
}

impl Sort {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn asc(mut self, column: impl Into<String>) -> Self {
        self.push(column, OrderBy::Asc);
        self
    }

    #[must_use]
    pub fn desc(mut self, column: impl Into<String>) -> Self {
        self.push(column, OrderBy::Desc);
        self
    }

    /// Appends a key; a repeated column keeps its first position and takes
    /// the latest direction.
    pub fn push(&mut self, column: impl Into<String>, order: OrderBy) {
        let column = column.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = order,
            None => self.entries.push((column, order)),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, OrderBy)> {
        self.entries.iter().map(|(c, o)| (c.as_str(), *o))
    }

    /// Parses the caller argument shape: a list of single-key objects
    /// (`[{ "title": "desc" }, { "id": "asc" }]`) flattened in order, or a
    /// single object.
    pub fn from_value(value: &Value) -> Result<Self> {
        let mut sort = Sort::new();
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    sort.extend_from_object(item)?;
                }
            }
            Value::Object(_) => sort.extend_from_object(value)?,
            other => {
                return Err(GeneratorError::InvalidArgument(format!(
                    "orderBy must be an object or a list of objects, got {other}"
                )));
            }
        }
        Ok(sort)
    }

    /// Caller argument shape, one single-key object per entry.
    pub fn to_value(&self) -> Value {
        self.entries
            .iter()
            .map(|(column, order)| {
                let mut entry = Map::new();
                entry.insert(column.clone(), Value::String(order.as_sql().to_lowercase()));
                Value::Object(entry)
            })
            .collect()
    }

    fn extend_from_object(&mut self, value: &Value) -> Result<()> {
        let Value::Object(map) = value else {
            return Err(GeneratorError::InvalidArgument(format!(
                "orderBy entry must be an object, got {value}"
            )));
        };
        for (column, direction) in map {
            let order = match direction {
                Value::Null => continue,
                Value::String(s) if s.eq_ignore_ascii_case("asc") => OrderBy::Asc,
                Value::String(s) if s.eq_ignore_ascii_case("desc") => OrderBy::Desc,
                other => {
                    return Err(GeneratorError::InvalidArgument(format!(
                        "orderBy direction for `{column}` must be \"asc\" or \"desc\", got {other}"
                    )));
                }
            };
            self.push(column.as_str(), order);
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<(S, OrderBy)> for Sort {
    fn from_iter<T: IntoIterator<Item = (S, OrderBy)>>(iter: T) -> Self {
        let mut sort = Sort::new();
        for (column, order) in iter {
            sort.push(column, order);
        }
        sort
    }
}

impl Serialize for Sort {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Sort {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Sort::from_value(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_of_objects_flattens_in_order() {
        let sort = Sort::from_value(&json!([{ "title": "desc" }, { "id": "asc" }])).unwrap();
        assert_eq!(
            sort.iter().collect::<Vec<_>>(),
            vec![("title", OrderBy::Desc), ("id", OrderBy::Asc)]
        );
    }

    #[test]
    fn deserializes_from_single_object() {
        let sort: Sort = serde_json::from_str(r#"{ "id": "desc" }"#).unwrap();
        assert_eq!(sort, Sort::new().desc("id"));
        assert_eq!(sort.to_value(), json!([{ "id": "desc" }]));
    }

    #[test]
    fn null_is_empty() {
        assert!(Sort::from_value(&Value::Null).unwrap().is_empty());
        assert!(Sort::from_value(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_direction() {
        assert!(matches!(
            Sort::from_value(&json!({ "id": "up" })),
            Err(GeneratorError::InvalidArgument(_))
        ));
    }
}

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{GeneratorError, Result};

/// Declarative filter over a model's fields.
///
/// Each entry in `fields` maps a column to a literal (implicit equality) or
/// an operator bag, or a relation to a nested filter over the relation's
/// target. `AND`/`OR` take lists of filters and `NOT` a single filter.
///
/// Field conditions are interpreted by the compiler, which knows the model;
/// parsing only checks the structural shape of the reserved keys.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterTree {
    pub fields: Vec<(String, Value)>,
    pub and: Option<Vec<FilterTree>>,
    pub or: Option<Vec<FilterTree>>,
    pub not: Option<Box<FilterTree>>,
}

impl FilterTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{ AND: filters }`. Inputs are moved in.
    pub fn and(filters: Vec<FilterTree>) -> Self {
        Self {
            and: Some(filters),
            ..Self::default()
        }
    }

    /// `{ OR: filters }`
    pub fn or(filters: Vec<FilterTree>) -> Self {
        Self {
            or: Some(filters),
            ..Self::default()
        }
    }

    /// `{ NOT: filter }`
    pub fn not(filter: FilterTree) -> Self {
        Self {
            not: Some(Box::new(filter)),
            ..Self::default()
        }
    }

    /// Adds a field condition.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, condition: impl Into<Value>) -> Self {
        self.fields.push((name.into(), condition.into()));
        self
    }

    /// `true` when the tree carries no condition at all (not even empty
    /// `AND`/`OR` lists).
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.and.is_none() && self.or.is_none() && self.not.is_none()
    }

    /// Parses a filter from the caller's JSON argument. `null` is no filter.
    pub fn from_value(value: &Value) -> Result<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::Object(map) => Self::from_map(map).map(Some),
            other => Err(GeneratorError::InvalidArgument(format!(
                "where must be an object, got {other}"
            ))),
        }
    }

    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let mut tree = FilterTree::new();
        for (key, value) in map {
            match key.as_str() {
                "AND" => tree.and = Self::parse_list("AND", value)?,
                "OR" => tree.or = Self::parse_list("OR", value)?,
                "NOT" => tree.not = Self::from_value(value)?.map(Box::new),
                _ => tree.fields.push((key.clone(), value.clone())),
            }
        }
        Ok(tree)
    }

    fn parse_list(key: &str, value: &Value) -> Result<Option<Vec<FilterTree>>> {
        match value {
            Value::Null => Ok(None),
            Value::Array(items) => items
                .iter()
                .filter(|item| !item.is_null())
                .map(|item| Self::from_value(item).map(Option::unwrap_or_default))
                .collect::<Result<Vec<_>>>()
                .map(Some),
            // a lone object is accepted as a one-element list
            Value::Object(map) => Ok(Some(vec![Self::from_map(map)?])),
            other => Err(GeneratorError::InvalidArgument(format!(
                "{key} must be a list of filters, got {other}"
            ))),
        }
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for (name, condition) in &self.fields {
            map.insert(name.clone(), condition.clone());
        }
        if let Some(and) = &self.and {
            map.insert("AND".into(), and.iter().map(Self::to_value).collect());
        }
        if let Some(or) = &self.or {
            map.insert("OR".into(), or.iter().map(Self::to_value).collect());
        }
        if let Some(not) = &self.not {
            map.insert("NOT".into(), not.to_value());
        }
        Value::Object(map)
    }
}

impl TryFrom<Value> for FilterTree {
    type Error = GeneratorError;

    fn try_from(value: Value) -> Result<Self> {
        Ok(Self::from_value(&value)?.unwrap_or_default())
    }
}

impl Serialize for FilterTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FilterTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        FilterTree::try_from(value).map_err(serde::de::Error::custom)
    }
}

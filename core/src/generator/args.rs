//! Caller arguments of generated fields.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{GeneratorError, Result};
use crate::filter::FilterTree;
use crate::operation::Operation;
use crate::policy::{merge_limit, merge_order_by, merge_where, ResolvedParams};
use crate::sort::Sort;
use crate::Row;

/// Shape of an argument, as reported to the protocol layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ArgumentKind {
    Int,
    /// Filter tree over the model
    Where,
    /// List of single-key sort objects
    OrderBy,
    /// One input object
    Input,
    /// List of input objects
    InputList,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Argument {
    pub name: &'static str,
    pub kind: ArgumentKind,
    pub required: bool,
}

const fn optional(name: &'static str, kind: ArgumentKind) -> Argument {
    Argument {
        name,
        kind,
        required: false,
    }
}

const fn required(name: &'static str, kind: ArgumentKind) -> Argument {
    Argument {
        name,
        kind,
        required: true,
    }
}

/// Arguments accepted by the root field of `operation`.
pub fn operation_arguments(operation: Operation) -> Vec<Argument> {
    use ArgumentKind::*;
    match operation {
        Operation::FindMany => vec![
            optional("offset", Int),
            optional("limit", Int),
            optional("where", Where),
            optional("orderBy", OrderBy),
        ],
        Operation::FindFirst => vec![
            optional("offset", Int),
            optional("where", Where),
            optional("orderBy", OrderBy),
        ],
        Operation::Count => vec![optional("where", Where)],
        Operation::CreateOne => vec![required("input", Input)],
        Operation::CreateMany => vec![required("input", InputList)],
        Operation::Update => vec![required("input", Input), optional("where", Where)],
        Operation::Delete => vec![optional("where", Where)],
    }
}

/// Read arguments after parsing, before merging with policy values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryArgs {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub where_: Option<FilterTree>,
    pub order_by: Option<Sort>,
}

impl QueryArgs {
    pub fn parse(arguments: &Map<String, Value>) -> Result<Self> {
        Ok(Self {
            offset: parse_count(arguments, "offset")?,
            limit: parse_count(arguments, "limit")?,
            where_: parse_where(arguments)?,
            order_by: match arguments.get("orderBy") {
                None | Some(Value::Null) => None,
                Some(value) => Some(Sort::from_value(value)?),
            },
        })
    }

    /// Applies the merge rules against the resolved policy values.
    pub fn merge(&self, params: &ResolvedParams) -> QueryArgs {
        QueryArgs {
            offset: self.offset,
            limit: merge_limit(self.limit, params.limit),
            where_: merge_where(self.where_.as_ref(), params.where_.as_ref()),
            order_by: merge_order_by(self.order_by.as_ref(), params.order_by.as_ref()),
        }
    }
}

pub(crate) fn parse_where(arguments: &Map<String, Value>) -> Result<Option<FilterTree>> {
    match arguments.get("where") {
        Some(value) => FilterTree::from_value(value),
        None => Ok(None),
    }
}

fn parse_count(arguments: &Map<String, Value>, name: &str) -> Result<Option<u64>> {
    match arguments.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_u64().map(Some).ok_or_else(|| {
            GeneratorError::InvalidArgument(format!(
                "`{name}` must be a non-negative integer, got {value}"
            ))
        }),
    }
}

/// The required `input` object.
pub(crate) fn parse_input(arguments: &Map<String, Value>) -> Result<Row> {
    match arguments.get("input") {
        Some(Value::Object(input)) => Ok(input.clone()),
        other => Err(GeneratorError::InvalidArgument(format!(
            "`input` must be an object, got {}",
            other.unwrap_or(&Value::Null)
        ))),
    }
}

/// The required `input` list of `createMany`.
pub(crate) fn parse_input_list(arguments: &Map<String, Value>) -> Result<Vec<Row>> {
    match arguments.get("input") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Object(input) => Ok(input.clone()),
                other => Err(GeneratorError::InvalidArgument(format!(
                    "`input` entries must be objects, got {other}"
                ))),
            })
            .collect(),
        other => Err(GeneratorError::InvalidArgument(format!(
            "`input` must be a list of objects, got {}",
            other.unwrap_or(&Value::Null)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn arguments(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn parses_read_arguments() {
        let args = QueryArgs::parse(&arguments(json!({
            "offset": 2,
            "limit": 10,
            "where": { "title": { "eq": "A" } },
            "orderBy": [{ "id": "desc" }]
        })))
        .unwrap();
        assert_eq!(args.offset, Some(2));
        assert_eq!(args.limit, Some(10));
        assert!(args.where_.is_some());
        assert_eq!(args.order_by, Some(Sort::new().desc("id")));
    }

    #[test]
    fn rejects_negative_limit() {
        assert!(QueryArgs::parse(&arguments(json!({ "limit": -1 }))).is_err());
        assert!(QueryArgs::parse(&arguments(json!({ "offset": "2" }))).is_err());
    }

    #[test]
    fn merge_applies_policy() {
        let args = QueryArgs {
            limit: Some(10),
            where_: Some(FilterTree::new().field("title", "A")),
            ..QueryArgs::default()
        };
        let params = ResolvedParams {
            limit: Some(5),
            where_: Some(FilterTree::new().field("published", true)),
            order_by: Some(Sort::new().desc("id")),
            ..ResolvedParams::default()
        };
        let merged = args.merge(&params);
        assert_eq!(merged.limit, Some(5));
        assert_eq!(merged.order_by, Some(Sort::new().desc("id")));
        assert_eq!(
            merged.where_,
            Some(FilterTree::and(vec![
                FilterTree::new().field("title", "A"),
                FilterTree::new().field("published", true),
            ]))
        );
    }

    #[test]
    fn input_must_be_object() {
        assert!(parse_input(&arguments(json!({ "input": [1] }))).is_err());
        assert!(parse_input(&arguments(json!({}))).is_err());
        assert_eq!(
            parse_input_list(&arguments(json!({ "input": [] }))).unwrap(),
            Vec::<Row>::new()
        );
    }

    #[test]
    fn find_first_has_no_limit_argument() {
        let names: Vec<_> = operation_arguments(Operation::FindFirst)
            .iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["offset", "where", "orderBy"]);
    }
}

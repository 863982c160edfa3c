//! Decoding of selected rows, including relation JSON built by
//! `json_object`/`json_group_array`.

use drizzle_graphql_core::model::{Cardinality, Column};
use drizzle_graphql_core::plan::RelationPlan;
use drizzle_graphql_core::{GeneratorError, Result, Row, SelectPlan};
use serde_json::Value;

use crate::values::{SQLiteValue, decode, decode_embedded};

/// Column kind of each result column of a rendered select, in order.
pub(crate) enum Field<'p> {
    Column(&'p Column),
    Relation(&'p RelationPlan),
    Count(&'p str),
}

impl Field<'_> {
    pub(crate) fn name(&self) -> &str {
        match self {
            Field::Column(c) => &c.name,
            Field::Relation(r) => &r.field,
            Field::Count(name) => name,
        }
    }

    pub(crate) fn decode(&self, value: SQLiteValue<'_>) -> Result<Value> {
        match self {
            Field::Column(c) => decode(c.column_type, value),
            Field::Relation(r) => relation_value(r, value),
            Field::Count(_) => match value {
                SQLiteValue::Integer(n) => Ok(Value::from(n)),
                other => Err(GeneratorError::Mapping(format!(
                    "expected an integer count, got {other:?}"
                ))),
            },
        }
    }
}

/// Result columns of `select(plan)`.
pub(crate) fn fields(plan: &SelectPlan) -> Vec<Field<'_>> {
    plan.columns
        .iter()
        .map(Field::Column)
        .chain(plan.relations.iter().map(Field::Relation))
        .chain(plan.counts.iter().map(|c| Field::Count(&c.field)))
        .collect()
}

/// Decodes the JSON text of a relation column.
pub fn relation_value(plan: &RelationPlan, value: SQLiteValue<'_>) -> Result<Value> {
    let json = match value {
        SQLiteValue::Null => Value::Null,
        SQLiteValue::Text(text) => serde_json::from_str(&text)?,
        other => {
            return Err(GeneratorError::Mapping(format!(
                "relation `{}` is not JSON: {other:?}",
                plan.field
            )));
        }
    };
    embedded_relation(plan, json)
}

fn embedded_relation(plan: &RelationPlan, json: Value) -> Result<Value> {
    match (plan.relation.cardinality, json) {
        (Cardinality::One, Value::Null) => Ok(Value::Null),
        (Cardinality::One, object @ Value::Object(_)) => {
            embedded_row(&plan.select, object).map(Value::Object)
        }
        (Cardinality::Many, Value::Null) => Ok(Value::Array(Vec::new())),
        (Cardinality::Many, Value::Array(items)) => items
            .into_iter()
            .map(|item| embedded_row(&plan.select, item).map(Value::Object))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        (_, other) => Err(GeneratorError::Mapping(format!(
            "unexpected JSON for relation `{}`: {other}",
            plan.field
        ))),
    }
}

fn embedded_row(plan: &SelectPlan, json: Value) -> Result<Row> {
    let mut object = match json {
        Value::Object(object) => object,
        other => {
            return Err(GeneratorError::Mapping(format!(
                "expected a {} object, got {other}",
                plan.table
            )));
        }
    };
    let mut row = Row::new();
    for c in &plan.columns {
        let value = object.remove(&c.name).unwrap_or(Value::Null);
        row.insert(c.name.clone(), decode_embedded(c.column_type, value)?);
    }
    for r in &plan.relations {
        let value = object.remove(&r.field).unwrap_or(Value::Null);
        row.insert(r.field.clone(), embedded_relation(r, value)?);
    }
    for c in &plan.counts {
        let value = object.remove(&c.field).unwrap_or(Value::from(0));
        row.insert(c.field.clone(), value);
    }
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use drizzle_graphql_core::model::ColumnType;
    use drizzle_graphql_core::plan::CountPlan;
    use drizzle_graphql_core::Relation;
    use serde_json::json;

    fn categories() -> RelationPlan {
        let mut select = SelectPlan::new("categories");
        select.columns = vec![
            Column::new("name", ColumnType::Text),
            Column::new("featured", ColumnType::Boolean),
        ];
        select.counts = vec![CountPlan {
            field: "postsCount".into(),
            relation: Relation::many("posts", "categories", "posts"),
            filter: None,
        }];
        RelationPlan {
            field: "categories".into(),
            relation: Relation::many("categories", "posts", "categories"),
            select,
        }
    }

    #[test]
    fn many_relation_from_group_array() {
        let value = relation_value(
            &categories(),
            SQLiteValue::from(r#"[{"name":"rust","featured":1,"postsCount":2}]"#),
        )
        .unwrap();
        assert_eq!(
            value,
            json!([{"name": "rust", "featured": true, "postsCount": 2}])
        );
        assert_eq!(
            relation_value(&categories(), SQLiteValue::from("[]")).unwrap(),
            json!([])
        );
    }

    #[test]
    fn missing_one_relation_is_null() {
        let mut plan = categories();
        plan.relation = Relation::one("category", "posts", "categories");
        assert_eq!(relation_value(&plan, SQLiteValue::Null).unwrap(), Value::Null);
        assert!(relation_value(&plan, SQLiteValue::from("[1]")).is_err());
    }
}

use serde_json::{Map, Value};

use crate::error::{GeneratorError, Result};
use crate::predicate::{self, ArrayOp, CompareOp, LikeOp, Predicate};

/// Keys accepted inside a field's operator bag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
    ILike,
    NotILike,
    IsNull,
    IsNotNull,
    In,
    NotIn,
    ArrayContains,
    ArrayOverlaps,
    ArrayContained,
}

impl Operator {
    pub const ALL: [Operator; 17] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::Like,
        Operator::NotLike,
        Operator::ILike,
        Operator::NotILike,
        Operator::IsNull,
        Operator::IsNotNull,
        Operator::In,
        Operator::NotIn,
        Operator::ArrayContains,
        Operator::ArrayOverlaps,
        Operator::ArrayContained,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Like => "like",
            Operator::NotLike => "notLike",
            Operator::ILike => "ilike",
            Operator::NotILike => "notIlike",
            Operator::IsNull => "isNull",
            Operator::IsNotNull => "isNotNull",
            Operator::In => "in",
            Operator::NotIn => "notIn",
            Operator::ArrayContains => "arrayContains",
            Operator::ArrayOverlaps => "arrayOverlaps",
            Operator::ArrayContained => "arrayContained",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.key() == key)
    }

    /// Builds the primitive comparison for `column`. `eq: null` and
    /// `ne: null` test for null; `isNull: false` and `isNotNull: false` are
    /// no constraint.
    fn apply(self, column: &str, operand: &Value) -> Result<Option<Predicate>> {
        if operand.is_null() {
            return match self {
                Operator::Eq => Ok(Some(predicate::is_null(column, false))),
                Operator::Ne => Ok(Some(predicate::is_null(column, true))),
                _ => Err(GeneratorError::InvalidArgument(format!(
                    "`{}` on `{column}` does not accept null",
                    self.key()
                ))),
            };
        }
        let column = column.to_string();
        let compare = |op| Predicate::Compare {
            column: column.clone(),
            op,
            value: operand.clone(),
        };
        let like = |op| Predicate::Like {
            column: column.clone(),
            op,
            pattern: operand.clone(),
        };
        let predicate = match self {
            Operator::Eq => compare(CompareOp::Eq),
            Operator::Ne => compare(CompareOp::Ne),
            Operator::Gt => compare(CompareOp::Gt),
            Operator::Gte => compare(CompareOp::Gte),
            Operator::Lt => compare(CompareOp::Lt),
            Operator::Lte => compare(CompareOp::Lte),
            Operator::Like => like(LikeOp::Like),
            Operator::NotLike => like(LikeOp::NotLike),
            Operator::ILike => like(LikeOp::ILike),
            Operator::NotILike => like(LikeOp::NotILike),
            Operator::IsNull | Operator::IsNotNull => {
                if !self.flag(&column, operand)? {
                    return Ok(None);
                }
                Predicate::IsNull {
                    column,
                    negated: self == Operator::IsNotNull,
                }
            }
            Operator::In | Operator::NotIn => Predicate::In {
                values: self.list(&column, operand)?,
                negated: self == Operator::NotIn,
                column,
            },
            Operator::ArrayContains => Predicate::Array {
                values: self.list(&column, operand)?,
                op: ArrayOp::Contains,
                column,
            },
            Operator::ArrayOverlaps => Predicate::Array {
                values: self.list(&column, operand)?,
                op: ArrayOp::Overlaps,
                column,
            },
            Operator::ArrayContained => Predicate::Array {
                values: self.list(&column, operand)?,
                op: ArrayOp::Contained,
                column,
            },
        };
        Ok(Some(predicate))
    }

    fn flag(self, column: &str, operand: &Value) -> Result<bool> {
        operand.as_bool().ok_or_else(|| {
            GeneratorError::InvalidArgument(format!(
                "`{}` on `{column}` expects a boolean, got {operand}",
                self.key()
            ))
        })
    }

    fn list(self, column: &str, operand: &Value) -> Result<Vec<Value>> {
        match operand {
            Value::Array(items) => Ok(items.clone()),
            other => Err(GeneratorError::InvalidArgument(format!(
                "`{}` on `{column}` expects a list, got {other}",
                self.key()
            ))),
        }
    }
}

/// Compiles one field's operator bag; every present operator is a separate
/// predicate and the caller ANDs them.
pub(crate) fn compile_bag(column: &str, bag: &Map<String, Value>) -> Result<Vec<Predicate>> {
    let mut out = Vec::with_capacity(bag.len());
    for (key, operand) in bag {
        let operator =
            Operator::from_key(key).ok_or_else(|| GeneratorError::UnknownOperator {
                field: column.to_string(),
                operator: key.clone(),
            })?;
        if let Some(predicate) = operator.apply(column, operand)? {
            out.push(predicate);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bag(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn every_key_round_trips() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_key(op.key()), Some(op));
        }
        assert_eq!(Operator::from_key("contains"), None);
    }

    #[test]
    fn multiple_operators_produce_multiple_predicates() {
        let predicates = compile_bag("title", &bag(json!({ "eq": "test", "ne": "test2" }))).unwrap();
        assert_eq!(predicates.len(), 2);
    }

    #[test]
    fn false_null_checks_are_no_constraint() {
        let predicates =
            compile_bag("title", &bag(json!({ "isNull": false, "isNotNull": true }))).unwrap();
        assert_eq!(
            predicates,
            vec![Predicate::IsNull {
                column: "title".into(),
                negated: true
            }]
        );
    }

    #[test]
    fn null_equality_tests_for_null() {
        let predicates = compile_bag("email", &bag(json!({ "eq": null }))).unwrap();
        assert_eq!(predicates, vec![predicate::is_null("email", false)]);

        let predicates = compile_bag("email", &bag(json!({ "ne": null }))).unwrap();
        assert_eq!(predicates, vec![predicate::is_null("email", true)]);

        for key in ["gt", "like", "in", "isNull", "arrayContains"] {
            let null_bag = Map::from_iter([(key.to_string(), Value::Null)]);
            let err = compile_bag("email", &null_bag).unwrap_err();
            assert!(matches!(err, GeneratorError::InvalidArgument(_)), "{key}");
        }
    }

    #[test]
    fn unknown_operator_is_an_error() {
        let err = compile_bag("title", &bag(json!({ "startsWith": "a" }))).unwrap_err();
        assert!(matches!(
            err,
            GeneratorError::UnknownOperator { ref field, ref operator }
                if field == "title" && operator == "startsWith"
        ));
    }

    #[test]
    fn in_requires_a_list() {
        assert!(compile_bag("id", &bag(json!({ "in": 3 }))).is_err());
        let predicates = compile_bag("id", &bag(json!({ "notIn": [1, 2] }))).unwrap();
        assert_eq!(
            predicates,
            vec![Predicate::In {
                column: "id".into(),
                values: vec![json!(1), json!(2)],
                negated: true
            }]
        );
    }
}

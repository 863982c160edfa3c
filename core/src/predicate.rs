//! Composable boolean predicates handed to the storage adapter.
//!
//! Column names are relative to the table the predicate is applied to; the
//! adapter qualifies them with whatever alias it gives that table.
//!
//! ```ignore
//! // Function style
//! and([eq("title", "A"), eq("published", true)])
//! or([...])
//! not(condition)
//! ```

use serde_json::Value;

use crate::model::Relation;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LikeOp {
    Like,
    NotLike,
    ILike,
    NotILike,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrayOp {
    /// Column contains every listed value
    Contains,
    /// Column shares at least one value with the list
    Overlaps,
    /// Every column value appears in the list
    Contained,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    Like {
        column: String,
        op: LikeOp,
        pattern: Value,
    },
    IsNull {
        column: String,
        negated: bool,
    },
    In {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    Array {
        column: String,
        op: ArrayOp,
        values: Vec<Value>,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    /// At least one row reachable through `relation` satisfies `filter`
    /// (any row when `filter` is `None`).
    Related {
        relation: Box<Relation>,
        filter: Option<Box<Predicate>>,
    },
}

/// Equality comparison (`=`).
pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Predicate {
    compare(column, CompareOp::Eq, value)
}

/// Inequality comparison (`<>`).
pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Predicate {
    compare(column, CompareOp::Ne, value)
}

/// `IS NULL`, or `IS NOT NULL` when `negated`.
pub fn is_null(column: impl Into<String>, negated: bool) -> Predicate {
    Predicate::IsNull {
        column: column.into(),
        negated,
    }
}

pub fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Predicate {
    Predicate::Compare {
        column: column.into(),
        op,
        value: value.into(),
    }
}

/// Logical AND of multiple conditions.
///
/// No conditions yields `None` (no constraint), a single condition is
/// returned as is.
pub fn and<I>(conditions: I) -> Option<Predicate>
where
    I: IntoIterator<Item = Predicate>,
{
    let mut parts: Vec<Predicate> = conditions.into_iter().collect();
    match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => Some(Predicate::And(parts)),
    }
}

/// Logical OR of multiple conditions.
///
/// No conditions yields `None` (no constraint), a single condition is
/// returned as is.
pub fn or<I>(conditions: I) -> Option<Predicate>
where
    I: IntoIterator<Item = Predicate>,
{
    let mut parts: Vec<Predicate> = conditions.into_iter().collect();
    match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => Some(Predicate::Or(parts)),
    }
}

/// Logical NOT.
pub fn not(condition: Predicate) -> Predicate {
    Predicate::Not(Box::new(condition))
}

impl Predicate {
    /// Matches rows whose columns equal the given `(column, value)` pairs.
    pub fn key_match<'a, I>(pairs: I) -> Option<Predicate>
    where
        I: IntoIterator<Item = (&'a str, &'a Value)>,
    {
        and(pairs.into_iter().map(|(column, value)| match value {
            Value::Null => is_null(column, false),
            value => eq(column, value.clone()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn and_or_collapse() {
        assert_eq!(and([]), None);
        assert_eq!(or([]), None);
        assert_eq!(and([eq("a", 1)]), Some(eq("a", 1)));
        assert_eq!(
            or([eq("a", 1), eq("b", 2)]),
            Some(Predicate::Or(vec![eq("a", 1), eq("b", 2)]))
        );
    }

    #[test]
    fn key_match_handles_null() {
        let id = json!(1);
        let parent = Value::Null;
        let predicate = Predicate::key_match([("id", &id), ("parent_id", &parent)]).unwrap();
        assert_eq!(
            predicate,
            Predicate::And(vec![
                eq("id", 1),
                Predicate::IsNull {
                    column: "parent_id".into(),
                    negated: false
                }
            ])
        );
    }
}

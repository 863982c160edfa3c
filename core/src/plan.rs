//! Request-scoped statement plans handed to a [`crate::Storage`].
//!
//! Plans carry compiled [`Predicate`]s and the exact columns to fetch; the
//! adapter renders them in its own dialect.

use crate::model::{Column, Relation};
use crate::predicate::Predicate;
use crate::sort::Sort;
use crate::Row;

/// Row fetch, including every requested relation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectPlan {
    pub table: String,
    /// Columns to fetch, in output order
    pub columns: Vec<Column>,
    pub filter: Option<Predicate>,
    pub order_by: Sort,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub relations: Vec<RelationPlan>,
    pub counts: Vec<CountPlan>,
}

impl SelectPlan {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }
}

/// A relation loaded alongside its parent rows, output under `field`.
///
/// For a `one` relation the nested plan's `limit` is 1 and the output is an
/// object or `null`; for `many` it is an array.
#[derive(Clone, Debug, PartialEq)]
pub struct RelationPlan {
    pub field: String,
    pub relation: Relation,
    pub select: SelectPlan,
}

/// A `<relation>Count` field: number of related rows matching `filter`.
#[derive(Clone, Debug, PartialEq)]
pub struct CountPlan {
    pub field: String,
    pub relation: Relation,
    pub filter: Option<Predicate>,
}

/// Root `count` query.
#[derive(Clone, Debug, PartialEq)]
pub struct CountQuery {
    pub table: String,
    pub filter: Option<Predicate>,
}

/// `INSERT`; `returning: None` skips the `RETURNING` clause.
#[derive(Clone, Debug, PartialEq)]
pub struct InsertPlan {
    pub table: String,
    pub rows: Vec<Row>,
    pub returning: Option<Vec<Column>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UpdatePlan {
    pub table: String,
    pub values: Row,
    pub filter: Option<Predicate>,
    pub returning: Option<Vec<Column>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeletePlan {
    pub table: String,
    pub filter: Option<Predicate>,
    pub returning: Option<Vec<Column>>,
}

/// Result of a write: affected row count and the returned rows, if a
/// `RETURNING` projection was requested.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MutationOutput {
    pub affected: usize,
    pub rows: Vec<Row>,
}

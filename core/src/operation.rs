//! Operation kinds and include/exclude selection over them.

use core::fmt;

use serde::{Deserialize, Serialize};

/// One of the seven generated operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    FindMany,
    FindFirst,
    Count,
    CreateOne,
    CreateMany,
    Update,
    Delete,
}

impl Operation {
    /// Every operation, in the order root fields are generated.
    pub const ALL: [Operation; 7] = [
        Operation::FindMany,
        Operation::FindFirst,
        Operation::Count,
        Operation::CreateOne,
        Operation::CreateMany,
        Operation::Update,
        Operation::Delete,
    ];

    /// Root field prefix, e.g. `findMany` in `findManyPost`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Operation::FindMany => "findMany",
            Operation::FindFirst => "findFirst",
            Operation::Count => "count",
            Operation::CreateOne => "createOne",
            Operation::CreateMany => "createMany",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    #[inline]
    pub const fn is_mutation(self) -> bool {
        matches!(
            self,
            Operation::CreateOne | Operation::CreateMany | Operation::Update | Operation::Delete
        )
    }

    #[inline]
    pub const fn is_query(self) -> bool {
        !self.is_mutation()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operation or a named group of operations, as accepted by
/// [`OperationSelection`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationGroup {
    /// `findFirst` and `findMany`
    Find,
    /// `createOne` and `createMany`
    Create,
    /// `find` plus `count`
    Query,
    /// `create`, `update` and `delete`
    Mutation,
    All,
    #[serde(untagged)]
    Single(Operation),
}

impl OperationGroup {
    pub fn contains(self, operation: Operation) -> bool {
        match self {
            OperationGroup::Find => {
                matches!(operation, Operation::FindFirst | Operation::FindMany)
            }
            OperationGroup::Create => {
                matches!(operation, Operation::CreateOne | Operation::CreateMany)
            }
            OperationGroup::Query => operation.is_query(),
            OperationGroup::Mutation => operation.is_mutation(),
            OperationGroup::All => true,
            OperationGroup::Single(op) => op == operation,
        }
    }
}

impl From<Operation> for OperationGroup {
    fn from(value: Operation) -> Self {
        OperationGroup::Single(value)
    }
}

/// Include/exclude selection of operations, evaluated once at build time.
///
/// With `include` set only the listed operations are enabled; `exclude` then
/// removes from that set. Neither set means every operation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSelection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<OperationGroup>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<OperationGroup>>,
}

impl OperationSelection {
    pub fn include<I, G>(groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<OperationGroup>,
    {
        Self {
            include: Some(groups.into_iter().map(Into::into).collect()),
            exclude: None,
        }
    }

    pub fn exclude<I, G>(groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<OperationGroup>,
    {
        Self {
            include: None,
            exclude: Some(groups.into_iter().map(Into::into).collect()),
        }
    }

    /// Resolves the selection into the enabled operations.
    pub fn resolve(&self) -> Vec<Operation> {
        Operation::ALL
            .into_iter()
            .filter(|op| {
                self.include
                    .as_ref()
                    .is_none_or(|groups| groups.iter().any(|g| g.contains(*op)))
            })
            .filter(|op| {
                !self
                    .exclude
                    .as_ref()
                    .is_some_and(|groups| groups.iter().any(|g| g.contains(*op)))
            })
            .collect()
    }
}

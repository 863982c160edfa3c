use crate::operation::Operation;
use crate::policy::{IncludeExclude, ModelOptions};

use super::{Column, Relation};

/// One modeled table. Built once by [`super::Model::build`] and shared
/// read-only by every request.
pub struct Entity<C> {
    pub(super) name: String,
    pub(super) type_name: String,
    pub(super) columns: Vec<Column>,
    pub(super) relations: Vec<Relation>,
    pub(super) operations: Vec<Operation>,
    pub(super) fields: Option<IncludeExclude<String>>,
    pub(super) input_fields: Option<IncludeExclude<String>>,
    pub(super) policy: ModelOptions<C>,
}

impl<C> Entity<C> {
    /// Table name, also the model name seen by policy callbacks.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Relations whose target is also modeled.
    #[inline]
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }

    #[inline]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn enables(&self, operation: Operation) -> bool {
        self.operations.contains(&operation)
    }

    #[inline]
    pub fn policy(&self) -> &ModelOptions<C> {
        &self.policy
    }

    /// Columns identifying a row: the primary key, or every column when the
    /// table has none.
    pub fn identity_columns(&self) -> Vec<&Column> {
        let key: Vec<&Column> = self.columns.iter().filter(|c| c.primary_key).collect();
        if key.is_empty() {
            self.columns.iter().collect()
        } else {
            key
        }
    }

    /// Whether the `fields` policy exposes `field` on the object type.
    pub fn exposes(&self, field: &str) -> bool {
        self.fields.as_ref().is_none_or(|fields| fields.allows(field))
    }

    /// Whether the caller may supply `key` in mutation input.
    pub fn accepts_input(&self, key: &str) -> bool {
        self.input_fields
            .as_ref()
            .is_none_or(|fields| fields.allows(key))
    }

    /// Exposed columns, in table order.
    pub fn exposed_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| self.exposes(&c.name))
    }
}

impl<C> std::fmt::Debug for Entity<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("columns", &self.columns)
            .field("relations", &self.relations)
            .field("operations", &self.operations)
            .field("fields", &self.fields)
            .field("input_fields", &self.input_fields)
            .finish_non_exhaustive()
    }
}

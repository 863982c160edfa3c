use serde_json::Value;

use crate::error::{GeneratorError, Result};
use crate::model::{Entity, Model};
use crate::predicate::{self, Predicate};

use super::operator::compile_bag;
use super::FilterTree;

/// Extra filter applied to a relation's target when a filter traverses it.
pub type RelationScope<'a, C> = dyn Fn(&Entity<C>) -> Result<Option<FilterTree>> + 'a;

/// Compiles [`FilterTree`]s into [`Predicate`]s against a model.
///
/// `None` output means "no constraint" and must be omitted by the caller, never
/// treated as false.
pub struct FilterCompiler<'a, C> {
    model: &'a Model<C>,
    relation_scope: Option<&'a RelationScope<'a, C>>,
}

impl<'a, C> FilterCompiler<'a, C> {
    pub fn new(model: &'a Model<C>) -> Self {
        Self {
            model,
            relation_scope: None,
        }
    }

    /// Folds an extra target filter into every relation the compiled filter
    /// traverses.
    #[must_use]
    pub fn with_relation_scope(mut self, scope: &'a RelationScope<'a, C>) -> Self {
        self.relation_scope = Some(scope);
        self
    }

    pub fn compile(
        &self,
        entity: &Entity<C>,
        filter: Option<&FilterTree>,
    ) -> Result<Option<Predicate>> {
        match filter {
            Some(tree) => self.compile_tree(entity, tree),
            None => Ok(None),
        }
    }

    fn compile_tree(&self, entity: &Entity<C>, tree: &FilterTree) -> Result<Option<Predicate>> {
        let mut parts = Vec::new();

        for (name, condition) in &tree.fields {
            if let Some(predicate) = self.compile_field(entity, name, condition)? {
                parts.push(predicate);
            }
        }

        if let Some(children) = &tree.and {
            let compiled = self.compile_children(entity, children)?;
            parts.extend(predicate::and(compiled));
        }

        if let Some(children) = &tree.or {
            let compiled = self.compile_children(entity, children)?;
            parts.extend(predicate::or(compiled));
        }

        if let Some(child) = &tree.not {
            // nothing to negate when the child is unconstrained
            if let Some(inner) = self.compile_tree(entity, child)? {
                parts.push(predicate::not(inner));
            }
        }

        Ok(predicate::and(parts))
    }

    fn compile_children(
        &self,
        entity: &Entity<C>,
        children: &[FilterTree],
    ) -> Result<Vec<Predicate>> {
        let mut out = Vec::with_capacity(children.len());
        for child in children {
            out.extend(self.compile_tree(entity, child)?);
        }
        Ok(out)
    }

    fn compile_field(
        &self,
        entity: &Entity<C>,
        name: &str,
        condition: &Value,
    ) -> Result<Option<Predicate>> {
        // hidden fields cannot be filtered on either
        if !entity.exposes(name) {
            return Err(GeneratorError::unknown_field(entity.name(), name));
        }

        if entity.column(name).is_some() {
            return match condition {
                Value::Object(bag) => Ok(predicate::and(compile_bag(name, bag)?)),
                Value::Null => Ok(Some(predicate::is_null(name, false))),
                literal => Ok(Some(predicate::eq(name, literal.clone()))),
            };
        }

        let relation = entity
            .relation(name)
            .filter(|relation| self.model.relation_readable(relation))
            .ok_or_else(|| GeneratorError::unknown_field(entity.name(), name))?;
        let target = self.model.entity(&relation.target)?;

        let nested = FilterTree::from_value(condition)?;
        let scoped = match self.relation_scope {
            Some(scope) => scope(target)?,
            None => None,
        };
        let filter = match (nested, scoped) {
            (Some(nested), Some(scoped)) => Some(FilterTree::and(vec![nested, scoped])),
            (nested, scoped) => nested.or(scoped),
        };

        let inner = self.compile(target, filter.as_ref())?;
        let related = Predicate::Related {
            relation: Box::new(relation.clone()),
            filter: inner.map(Box::new),
        };
        // `null` matches rows with no visible related row
        if condition.is_null() {
            Ok(Some(predicate::not(related)))
        } else {
            Ok(Some(related))
        }
    }
}

/// Compiles `filter` against `entity` with no relation scoping.
pub fn compile<C>(
    model: &Model<C>,
    entity: &Entity<C>,
    filter: Option<&FilterTree>,
) -> Result<Option<Predicate>> {
    FilterCompiler::new(model).compile(entity, filter)
}

//! Builds select plans from field trees, re-scoping policy at every relation.

use serde_json::{Map, Value};

use crate::error::{GeneratorError, Result};
use crate::filter::{FilterCompiler, FilterTree};
use crate::model::{Cardinality, Entity, Model, Relation};
use crate::operation::Operation;
use crate::plan::{CountPlan, RelationPlan, SelectPlan};
use crate::policy::{merge_where, resolve};
use crate::predicate::Predicate;
use crate::projection::{FieldSelection, FieldTree};
use crate::sort::Sort;

use super::args::{parse_where, QueryArgs};

pub(crate) struct Planner<'a, C> {
    pub(crate) model: &'a Model<C>,
    pub(crate) ctx: &'a C,
}

impl<'a, C> Planner<'a, C> {
    pub(crate) fn new(model: &'a Model<C>, ctx: &'a C) -> Self {
        Self { model, ctx }
    }

    /// Compiles `filter` against `entity`. Relation filters get the target's
    /// `findMany` policy filter folded in.
    pub(crate) fn compile(
        &self,
        entity: &Entity<C>,
        filter: Option<&FilterTree>,
    ) -> Result<Option<Predicate>> {
        let scope = |target: &Entity<C>| -> Result<Option<FilterTree>> {
            resolve(target, Operation::FindMany, self.ctx, None).map(|params| params.where_)
        };
        FilterCompiler::new(self.model)
            .with_relation_scope(&scope)
            .compile(entity, filter)
    }

    /// Plan for reading `tree` from `entity` with already merged arguments.
    pub(crate) fn select(
        &self,
        entity: &Entity<C>,
        tree: &FieldTree,
        args: &QueryArgs,
    ) -> Result<SelectPlan> {
        let mut plan = SelectPlan::new(entity.name());
        plan.filter = self.compile(entity, args.where_.as_ref())?;
        plan.order_by = self.sort(entity, args.order_by.as_ref())?;
        plan.limit = args.limit;
        plan.offset = args.offset;

        for (name, selection) in tree.iter() {
            self.field(entity, &mut plan, name, selection)?;
        }
        Ok(plan)
    }

    fn sort(&self, entity: &Entity<C>, sort: Option<&Sort>) -> Result<Sort> {
        let Some(sort) = sort else {
            return Ok(Sort::new());
        };
        if let Some((column, _)) = sort
            .iter()
            .find(|(column, _)| entity.column(column).is_none() || !entity.exposes(column))
        {
            return Err(GeneratorError::unknown_field(entity.name(), column));
        }
        Ok(sort.clone())
    }

    fn field(
        &self,
        entity: &Entity<C>,
        plan: &mut SelectPlan,
        name: &str,
        selection: &FieldSelection,
    ) -> Result<()> {
        if !entity.exposes(name) {
            return Err(GeneratorError::unknown_field(entity.name(), name));
        }

        if let Some(column) = entity.column(name) {
            if selection.tree().is_some() {
                return Err(GeneratorError::InvalidArgument(format!(
                    "`{name}` on {} is a scalar and takes no selection",
                    entity.name()
                )));
            }
            plan.columns.push(column.clone());
            return Ok(());
        }

        if let Some(relation) = entity.relation(name) {
            if !self.model.relation_readable(relation) {
                return Err(GeneratorError::unknown_field(entity.name(), name));
            }
            let Some(tree) = selection.tree() else {
                return Err(GeneratorError::InvalidArgument(format!(
                    "relation `{name}` on {} needs a selection",
                    entity.name()
                )));
            };
            let relation_plan = self.relation(relation, selection.arguments(), tree)?;
            plan.relations.push(relation_plan);
            return Ok(());
        }

        let counted = name
            .strip_suffix("Count")
            .and_then(|relation| entity.relation(relation))
            .filter(|relation| self.model.relation_countable(relation));
        if let Some(relation) = counted {
            let filter = self.count_filter(relation, selection.arguments())?;
            plan.counts.push(CountPlan {
                field: name.to_string(),
                relation: relation.clone(),
                filter,
            });
            return Ok(());
        }

        Err(GeneratorError::unknown_field(entity.name(), name))
    }

    /// Relation field: the target's own read policy applies, exactly as for a
    /// root query on the target.
    fn relation(
        &self,
        relation: &Relation,
        arguments: &Map<String, Value>,
        tree: &FieldTree,
    ) -> Result<RelationPlan> {
        let target = self.model.entity(&relation.target)?;
        let operation = match relation.cardinality {
            Cardinality::One => Operation::FindFirst,
            Cardinality::Many => Operation::FindMany,
        };
        let params = resolve(target, operation, self.ctx, None)?;
        let args = QueryArgs::parse(arguments)?.merge(&params);

        let mut select = self.select(target, tree, &args)?;
        if relation.cardinality == Cardinality::One {
            select.limit = Some(1);
        }
        Ok(RelationPlan {
            field: relation.name.clone(),
            relation: relation.clone(),
            select,
        })
    }

    fn count_filter(
        &self,
        relation: &Relation,
        arguments: &Map<String, Value>,
    ) -> Result<Option<Predicate>> {
        let target = self.model.entity(&relation.target)?;
        let params = resolve(target, Operation::Count, self.ctx, None)?;
        let filter = merge_where(parse_where(arguments)?.as_ref(), params.where_.as_ref());
        self.compile(target, filter.as_ref())
    }
}

use serde_json::Value;

use crate::depth::query_depth;
use crate::error::{GeneratorError, Result};
use crate::m2m::{replace_relation_set, RelationSet};
use crate::model::{Column, Entity};
use crate::operation::Operation;
use crate::plan::{DeletePlan, InsertPlan, MutationOutput, SelectPlan, UpdatePlan};
use crate::policy::{merge_input, merge_where, resolve};
use crate::predicate::{self, Predicate};
use crate::projection::{project, FieldTree};
use crate::selection::ResolveInfo;
use crate::storage::Storage;
use crate::Row;

use super::args::{parse_input, parse_input_list, parse_where, QueryArgs};
use super::plan::Planner;
use super::Generator;

/// What a mutation has to hand back for the caller's selection.
enum Output {
    /// Nothing selected: no `RETURNING`, one empty object per row
    Empty,
    /// Only columns selected: `RETURNING` exactly these
    Columns(Vec<Column>),
    /// Relations or counts selected: re-read the written rows
    Reread,
}

/// Column values to write plus the relation-set directives of one input row.
struct WriteInput<'a> {
    values: Row,
    sets: Vec<RelationSet<'a>>,
}

impl<C> Generator<C> {
    pub(crate) fn create_one(
        &self,
        storage: &dyn Storage,
        entity: &Entity<C>,
        ctx: &C,
        info: &ResolveInfo,
    ) -> Result<Value> {
        let params = resolve(entity, Operation::CreateOne, ctx, Some(query_depth(info)?))?;
        let input = parse_input(&info.field.arguments)?;
        let input = split_input(entity, &input, params.input.as_ref())?;
        let tree = project(info)?;
        let output = output_for(&Planner::new(&self.model, ctx), entity, &tree)?;

        let rows = in_transaction(storage, |tx| {
            self.insert(tx, entity, ctx, std::slice::from_ref(&input), &output, &tree)
        })?;
        Ok(rows.into_iter().next().unwrap_or(Value::Null))
    }

    pub(crate) fn create_many(
        &self,
        storage: &dyn Storage,
        entity: &Entity<C>,
        ctx: &C,
        info: &ResolveInfo,
    ) -> Result<Value> {
        let params = resolve(entity, Operation::CreateMany, ctx, Some(query_depth(info)?))?;
        let inputs = parse_input_list(&info.field.arguments)?;
        if inputs.is_empty() {
            return Ok(Value::Array(Vec::new()));
        }
        let inputs = inputs
            .iter()
            .map(|input| split_input(entity, input, params.input.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let tree = project(info)?;
        let output = output_for(&Planner::new(&self.model, ctx), entity, &tree)?;

        let rows = in_transaction(storage, |tx| {
            self.insert(tx, entity, ctx, &inputs, &output, &tree)
        })?;
        Ok(Value::Array(rows))
    }

    pub(crate) fn update(
        &self,
        storage: &dyn Storage,
        entity: &Entity<C>,
        ctx: &C,
        info: &ResolveInfo,
    ) -> Result<Value> {
        let params = resolve(entity, Operation::Update, ctx, Some(query_depth(info)?))?;
        let input = parse_input(&info.field.arguments)?;
        let input = split_input(entity, &input, params.input.as_ref())?;
        let filter = merge_where(
            parse_where(&info.field.arguments)?.as_ref(),
            params.where_.as_ref(),
        );
        let filter = Planner::new(&self.model, ctx).compile(entity, filter.as_ref())?;
        let tree = project(info)?;
        let output = output_for(&Planner::new(&self.model, ctx), entity, &tree)?;
        let returning = returning_columns(entity, &output, &input.sets);

        let rows = in_transaction(storage, |tx| {
            let written = if input.values.is_empty() {
                // only relation directives: locate the rows instead of updating
                let mut plan = SelectPlan::new(entity.name());
                plan.columns = returning
                    .clone()
                    .unwrap_or_else(|| identity_columns(entity));
                plan.filter = filter.clone();
                let rows = tx.select(&plan)?;
                MutationOutput {
                    affected: rows.len(),
                    rows,
                }
            } else {
                tx.update(&UpdatePlan {
                    table: entity.name().to_string(),
                    values: input.values.clone(),
                    filter: filter.clone(),
                    returning: returning.clone(),
                })?
            };
            self.finish(tx, entity, ctx, written, &input.sets, &output, &tree)
        })?;
        Ok(Value::Array(rows))
    }

    /// Deletes with one compiled filter. When relations or counts are
    /// selected, the rows are read first with that same filter, in the same
    /// transaction as the delete.
    pub(crate) fn delete(
        &self,
        storage: &dyn Storage,
        entity: &Entity<C>,
        ctx: &C,
        info: &ResolveInfo,
    ) -> Result<Value> {
        let params = resolve(entity, Operation::Delete, ctx, Some(query_depth(info)?))?;
        let planner = Planner::new(&self.model, ctx);
        let filter = merge_where(
            parse_where(&info.field.arguments)?.as_ref(),
            params.where_.as_ref(),
        );
        let filter = planner.compile(entity, filter.as_ref())?;
        let tree = project(info)?;
        let output = output_for(&planner, entity, &tree)?;

        let plan = DeletePlan {
            table: entity.name().to_string(),
            filter,
            returning: match &output {
                Output::Columns(columns) => Some(columns.clone()),
                Output::Empty | Output::Reread => None,
            },
        };

        let rows = in_transaction(storage, |tx| match &output {
            Output::Reread => {
                let mut read = planner.select(entity, &tree, &QueryArgs::default())?;
                read.filter = plan.filter.clone();
                let rows = tx.select(&read)?;
                tx.delete(&plan)?;
                Ok(rows.into_iter().map(Value::Object).collect())
            }
            Output::Columns(columns) => {
                let deleted = tx.delete(&plan)?;
                Ok(deleted.rows.iter().map(|row| pick(row, columns)).collect())
            }
            Output::Empty => Ok(empty_objects(tx.delete(&plan)?.affected)),
        })?;
        Ok(Value::Array(rows))
    }

    fn insert(
        &self,
        tx: &dyn Storage,
        entity: &Entity<C>,
        ctx: &C,
        inputs: &[WriteInput<'_>],
        output: &Output,
        tree: &FieldTree,
    ) -> Result<Vec<Value>> {
        let plan = |inputs: &[WriteInput<'_>]| InsertPlan {
            table: entity.name().to_string(),
            rows: inputs.iter().map(|input| input.values.clone()).collect(),
            returning: returning_columns(
                entity,
                output,
                inputs.iter().flat_map(|input| &input.sets),
            ),
        };

        if inputs.iter().all(|input| input.sets.is_empty()) {
            let written = tx.insert(&plan(inputs))?;
            return self.finish(tx, entity, ctx, written, &[], output, tree);
        }

        // directives apply to their own row, so rows go in one at a time
        let mut rows = Vec::with_capacity(inputs.len());
        for input in inputs {
            let written = tx.insert(&plan(std::slice::from_ref(input)))?;
            rows.extend(self.finish(tx, entity, ctx, written, &input.sets, output, tree)?);
        }
        Ok(rows)
    }

    /// Applies relation-set directives to every written row, then shapes the
    /// output.
    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        tx: &dyn Storage,
        entity: &Entity<C>,
        ctx: &C,
        written: MutationOutput,
        sets: &[RelationSet<'_>],
        output: &Output,
        tree: &FieldTree,
    ) -> Result<Vec<Value>> {
        for row in &written.rows {
            for directive in sets {
                if let Some(set) = &directive.set {
                    replace_relation_set(tx, directive.relation, row, set)?;
                }
            }
        }

        match output {
            Output::Empty => Ok(empty_objects(written.affected)),
            Output::Columns(columns) => Ok(written.rows.iter().map(|row| pick(row, columns)).collect()),
            Output::Reread => self.reread(tx, entity, ctx, tree, &written.rows),
        }
    }

    /// Reads written rows back through the read path, by identity, in write
    /// order.
    fn reread(
        &self,
        tx: &dyn Storage,
        entity: &Entity<C>,
        ctx: &C,
        tree: &FieldTree,
        written: &[Row],
    ) -> Result<Vec<Value>> {
        if written.is_empty() {
            return Ok(Vec::new());
        }
        let identity = identity_columns(entity);
        let keys = written
            .iter()
            .map(|row| row_key(&identity, row))
            .collect::<Result<Vec<_>>>()?;

        let mut plan = Planner::new(&self.model, ctx).select(entity, tree, &QueryArgs::default())?;
        plan.filter = predicate::or(keys.iter().filter_map(|key| {
            Predicate::key_match(key.iter().map(|(column, value)| (column.as_str(), value)))
        }));
        let extra: Vec<Column> = identity
            .iter()
            .filter(|column| !plan.columns.iter().any(|c| c.name == column.name))
            .cloned()
            .collect();
        plan.columns.extend(extra.iter().cloned());

        let mut found = tx.select(&plan)?;
        let mut rows = Vec::with_capacity(keys.len());
        for key in &keys {
            let position = found.iter().position(|row| {
                key.iter()
                    .all(|(column, value)| row.get(column.as_str()) == Some(value))
            });
            if let Some(position) = position {
                let mut row = found.swap_remove(position);
                for column in &extra {
                    row.shift_remove(&column.name);
                }
                rows.push(Value::Object(row));
            }
        }
        Ok(rows)
    }
}

/// Splits caller input into column values and relation directives, then
/// overlays policy input on the column values.
fn split_input<'a, C>(
    entity: &'a Entity<C>,
    input: &Row,
    policy: Option<&Row>,
) -> Result<WriteInput<'a>> {
    let mut values = Row::new();
    let mut sets = Vec::new();
    for (key, value) in input {
        if !entity.accepts_input(key) {
            return Err(GeneratorError::unknown_field(entity.name(), key.as_str()));
        }
        if entity.column(key).is_some() {
            values.insert(key.clone(), value.clone());
        } else {
            sets.push(RelationSet::parse(entity, key, value)?);
        }
    }

    if let Some(policy) = policy
        && let Some(key) = policy.keys().find(|key| entity.column(key).is_none())
    {
        return Err(GeneratorError::unknown_field(entity.name(), key.as_str()));
    }

    Ok(WriteInput {
        values: merge_input(&values, policy),
        sets,
    })
}

/// Decides the output strategy. Selections that need the read path are
/// planned once here so they fail before anything is written.
fn output_for<C>(planner: &Planner<'_, C>, entity: &Entity<C>, tree: &FieldTree) -> Result<Output> {
    if tree.is_empty() {
        return Ok(Output::Empty);
    }
    let mut columns = Vec::new();
    for (name, selection) in tree.iter() {
        match entity.column(name) {
            Some(column) if entity.exposes(name) && selection.tree().is_none() => {
                columns.push(column.clone());
            }
            _ => {
                planner.select(entity, tree, &QueryArgs::default())?;
                return Ok(Output::Reread);
            }
        }
    }
    Ok(Output::Columns(columns))
}

/// `RETURNING` columns for a write: the selected columns or the identity for
/// a re-read, plus the source keys relation directives need. `None` when
/// nothing has to come back.
fn returning_columns<'s, 'r: 's, C>(
    entity: &Entity<C>,
    output: &Output,
    sets: impl IntoIterator<Item = &'s RelationSet<'r>>,
) -> Option<Vec<Column>> {
    let mut columns = match output {
        Output::Empty => Vec::new(),
        Output::Columns(columns) => columns.clone(),
        Output::Reread => identity_columns(entity),
    };
    for directive in sets {
        for name in &directive.relation.source_columns {
            if let Some(column) = entity.column(name)
                && !columns.iter().any(|c| c.name == column.name)
            {
                columns.push(column.clone());
            }
        }
    }
    if columns.is_empty() { None } else { Some(columns) }
}

fn identity_columns<C>(entity: &Entity<C>) -> Vec<Column> {
    entity.identity_columns().into_iter().cloned().collect()
}

fn row_key(identity: &[Column], row: &Row) -> Result<Vec<(String, Value)>> {
    identity
        .iter()
        .map(|column| {
            row.get(&column.name)
                .map(|value| (column.name.clone(), value.clone()))
                .ok_or_else(|| {
                    GeneratorError::Mapping(format!("written row lacks key column `{}`", column.name))
                })
        })
        .collect()
}

/// Keeps exactly `columns` of `row`, in order.
fn pick(row: &Row, columns: &[Column]) -> Value {
    let picked = columns
        .iter()
        .map(|column| {
            let value = row.get(&column.name).cloned().unwrap_or(Value::Null);
            (column.name.clone(), value)
        })
        .collect();
    Value::Object(picked)
}

fn empty_objects(count: usize) -> Vec<Value> {
    vec![Value::Object(Row::new()); count]
}

/// Runs `f` in a storage transaction and hands back its result.
fn in_transaction<T>(
    storage: &dyn Storage,
    mut f: impl FnMut(&dyn Storage) -> Result<T>,
) -> Result<T> {
    let mut result = None;
    storage.transaction(&mut |tx| {
        result = Some(f(tx)?);
        Ok(())
    })?;
    result.ok_or_else(|| {
        GeneratorError::TransactionError("transaction committed without running".into())
    })
}

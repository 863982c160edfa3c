use serde_json::Value;

use crate::depth::query_depth;
use crate::error::Result;
use crate::model::Entity;
use crate::operation::Operation;
use crate::plan::CountQuery;
use crate::policy::{merge_where, resolve};
use crate::projection::project;
use crate::selection::ResolveInfo;
use crate::storage::Storage;

use super::args::{parse_where, QueryArgs};
use super::plan::Planner;
use super::Generator;

impl<C> Generator<C> {
    pub(crate) fn find_many(
        &self,
        storage: &dyn Storage,
        entity: &Entity<C>,
        ctx: &C,
        info: &ResolveInfo,
    ) -> Result<Value> {
        let params = resolve(entity, Operation::FindMany, ctx, Some(query_depth(info)?))?;
        let args = QueryArgs::parse(&info.field.arguments)?.merge(&params);
        let tree = project(info)?;

        let plan = Planner::new(&self.model, ctx).select(entity, &tree, &args)?;
        let rows = storage.select(&plan)?;
        Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
    }

    pub(crate) fn find_first(
        &self,
        storage: &dyn Storage,
        entity: &Entity<C>,
        ctx: &C,
        info: &ResolveInfo,
    ) -> Result<Value> {
        let params = resolve(entity, Operation::FindFirst, ctx, Some(query_depth(info)?))?;
        let mut args = QueryArgs::parse(&info.field.arguments)?.merge(&params);
        args.limit = Some(1);
        let tree = project(info)?;

        let plan = Planner::new(&self.model, ctx).select(entity, &tree, &args)?;
        let row = storage.select(&plan)?.into_iter().next();
        Ok(row.map_or(Value::Null, Value::Object))
    }

    pub(crate) fn count(
        &self,
        storage: &dyn Storage,
        entity: &Entity<C>,
        ctx: &C,
        info: &ResolveInfo,
    ) -> Result<Value> {
        let params = resolve(entity, Operation::Count, ctx, Some(query_depth(info)?))?;
        let filter = merge_where(
            parse_where(&info.field.arguments)?.as_ref(),
            params.where_.as_ref(),
        );

        let query = CountQuery {
            table: entity.name().to_string(),
            filter: Planner::new(&self.model, ctx).compile(entity, filter.as_ref())?,
        };
        Ok(Value::from(storage.count(&query)?))
    }
}

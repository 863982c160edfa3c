use crate::error::{GeneratorError, Result};
use crate::filter::FilterTree;
use crate::{gql_profile_scope, gql_trace_policy};
use crate::model::Entity;
use crate::operation::Operation;
use crate::sort::Sort;
use crate::Row;

use super::PolicyParams;

/// Raw policy-side values for one request. Merging with caller arguments is
/// done by the caller, through [`super::merge`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedParams {
    pub depth_limit: Option<usize>,
    pub limit: Option<u64>,
    pub where_: Option<FilterTree>,
    pub order_by: Option<Sort>,
    /// Only resolved for mutations.
    pub input: Option<Row>,
}

/// Checks `executable` and evaluates the remaining policy slots of `entity`
/// for `operation`.
///
/// When `depth` is given and a depth limit is configured, a deeper selection
/// is rejected.
pub fn resolve<C>(
    entity: &Entity<C>,
    operation: Operation,
    ctx: &C,
    depth: Option<usize>,
) -> Result<ResolvedParams> {
    gql_profile_scope!("policy", "resolve");
    let policy = entity.policy();
    let params = PolicyParams {
        model_name: entity.name(),
        ctx,
        operation,
    };

    let executable = policy.executable.as_ref().and_then(|f| f(&params));
    if executable == Some(false) {
        gql_trace_policy!(warn: entity.name(), operation, "denied");
        return Err(GeneratorError::PermissionDenied {
            model: entity.name().to_string(),
            operation,
        });
    }

    let resolved = ResolvedParams {
        depth_limit: policy.depth_limit.as_ref().and_then(|f| f(&params)),
        limit: policy.limit.as_ref().and_then(|f| f(&params)),
        where_: policy.where_.as_ref().and_then(|f| f(&params)),
        order_by: policy.order_by.as_ref().and_then(|f| f(&params)),
        input: if operation.is_mutation() {
            policy.input_data.as_ref().and_then(|f| f(&params))
        } else {
            None
        },
    };

    if let (Some(limit), Some(depth)) = (resolved.depth_limit, depth)
        && depth > limit
    {
        gql_trace_policy!(warn: entity.name(), operation, "depth limit exceeded");
        return Err(GeneratorError::DepthLimitExceeded { depth, limit });
    }

    gql_trace_policy!(entity.name(), operation, "allowed");
    Ok(resolved)
}

//! Merge rules between caller arguments and policy values.
//!
//! Every read and write path goes through these functions. Each returns a new
//! value and leaves both inputs untouched.

use crate::filter::FilterTree;
use crate::sort::Sort;
use crate::Row;

/// Policy limits can only tighten the caller's limit.
pub fn merge_limit(caller: Option<u64>, policy: Option<u64>) -> Option<u64> {
    match (caller, policy) {
        (Some(caller), Some(policy)) => Some(caller.min(policy)),
        (caller, policy) => caller.or(policy),
    }
}

/// `{ AND: [caller, policy] }` over the filters that are present.
pub fn merge_where(caller: Option<&FilterTree>, policy: Option<&FilterTree>) -> Option<FilterTree> {
    let filters: Vec<FilterTree> = caller.into_iter().chain(policy).cloned().collect();
    if filters.is_empty() {
        None
    } else {
        Some(FilterTree::and(filters))
    }
}

/// A non-empty caller sort replaces the policy sort wholesale.
pub fn merge_order_by(caller: Option<&Sort>, policy: Option<&Sort>) -> Option<Sort> {
    match caller {
        Some(sort) if !sort.is_empty() => Some(sort.clone()),
        _ => policy.cloned(),
    }
}

/// Caller input overlaid with policy input; policy values win on every
/// overlapping key.
pub fn merge_input(caller: &Row, policy: Option<&Row>) -> Row {
    let mut merged = caller.clone();
    if let Some(policy) = policy {
        for (key, value) in policy {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

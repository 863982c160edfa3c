//! Tracing utilities for statement, transaction and policy observability.
//!
//! Enable the `tracing` feature to emit events via the `tracing` crate.
//! These macros no-op when the feature is disabled, avoiding `#[cfg]` boilerplate
//! at every call site. The feature is checked in the crate that expands the
//! macro, so adapters declare their own `tracing` feature.

/// Emit a debug-level tracing event with the SQL text and parameter count.
///
/// ```ignore
/// gql_trace_query!(&sql, params.len());
/// ```
#[macro_export]
macro_rules! gql_trace_query {
    ($sql:expr, $param_count:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(sql = %$sql, params = $param_count, "graphql.query");
    };
}

/// Emit an info-level tracing event for transaction lifecycle (begin, commit, rollback).
///
/// ```ignore
/// gql_trace_tx!("begin", "sqlite.rusqlite");
/// ```
#[macro_export]
macro_rules! gql_trace_tx {
    ($event:literal, $driver:literal) => {
        #[cfg(feature = "tracing")]
        tracing::info!(event = $event, driver = $driver, "graphql.transaction");
    };
}

/// Emit a policy resolution event. Denials and depth violations are
/// warn-level, everything else debug.
///
/// ```ignore
/// gql_trace_policy!(model, operation, "allowed");
/// gql_trace_policy!(warn: model, operation, "denied");
/// ```
#[macro_export]
macro_rules! gql_trace_policy {
    (warn: $model:expr, $operation:expr, $outcome:literal) => {
        #[cfg(feature = "tracing")]
        tracing::warn!(model = %$model, operation = %$operation, outcome = $outcome, "graphql.policy");
    };
    ($model:expr, $operation:expr, $outcome:literal) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(model = %$model, operation = %$operation, outcome = $outcome, "graphql.policy");
    };
}

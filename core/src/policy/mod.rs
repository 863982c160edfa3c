//! Per-model policy configuration, resolution and merge rules.

mod merge;
mod options;
mod resolve;

pub use merge::{merge_input, merge_limit, merge_order_by, merge_where};
pub use options::{
    GeneratorOptions, IncludeExclude, ModelFn, ModelOptions, ModelParams, PolicyFn, PolicyParams,
    StaticModelOptions, StaticOptions,
};
pub use resolve::{resolve, ResolvedParams};

pub mod depth;
pub mod error;
pub mod filter;
pub mod generator;
pub mod m2m;
pub mod model;
pub mod operation;
pub mod plan;
pub mod policy;
pub mod predicate;
pub mod profiling;
pub mod projection;
pub mod selection;
pub mod sort;
pub mod storage;
pub mod tracing;

// Re-export key types and traits
pub use depth::query_depth;
pub use error::{GeneratorError, Result};
pub use filter::{FilterCompiler, FilterTree, Operator, compile};
pub use generator::{
    Argument, ArgumentKind, FieldKind, Generator, ObjectField, OperationField, QueryArgs, Returns,
    operation_arguments,
};
pub use m2m::{RelationSet, replace_relation_set};
pub use model::{
    Cardinality, Column, ColumnType, Entity, Model, Relation, SchemaDef, TableDef, Through,
};
pub use operation::{Operation, OperationGroup, OperationSelection};
pub use plan::{
    CountPlan, CountQuery, DeletePlan, InsertPlan, MutationOutput, RelationPlan, SelectPlan,
    UpdatePlan,
};
pub use policy::{
    GeneratorOptions, IncludeExclude, ModelOptions, ModelParams, PolicyParams, ResolvedParams,
    StaticModelOptions, StaticOptions, resolve,
};
pub use predicate::Predicate;
pub use projection::{FieldSelection, FieldTree, project};
pub use selection::{FieldNode, ResolveInfo, Selection};
pub use sort::{OrderBy, Sort};
pub use storage::Storage;

/// A row as exchanged with storage and returned to callers: column or field
/// name to JSON value, in selection order.
pub type Row = serde_json::Map<String, serde_json::Value>;

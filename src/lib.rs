//! # drizzle-graphql
//!
//! Generates GraphQL-style CRUD operations over a relational schema and runs
//! them with per-model authorization policies applied: operation gating,
//! row filters, limits, sort defaults, forced input values and selection
//! depth limits.
//!
//! ## Quick Start
//!
//! ```rust
//! # #[cfg(feature = "rusqlite")]
//! # fn main() -> drizzle_graphql::Result<()> {
//! use drizzle_graphql::prelude::*;
//! use drizzle_graphql::sqlite::SQLiteStorage;
//! use serde_json::json;
//!
//! let storage = SQLiteStorage::open_in_memory()?;
//! storage.conn().execute_batch(
//!     "CREATE TABLE posts (id INTEGER PRIMARY KEY, title TEXT NOT NULL, published BOOLEAN NOT NULL DEFAULT 0);",
//! )?;
//!
//! let options = GeneratorOptions::<()>::new().model(
//!     "posts",
//!     ModelOptions::new()
//!         .where_(|_| Some(FilterTree::new().field("published", true)))
//!         .limit(|_| Some(20)),
//! );
//! let generator = Generator::new(storage.introspect()?, options)?;
//!
//! let info = ResolveInfo::new(FieldNode::new("findManyPost").fields(["id", "title"]));
//! let posts = generator.execute(&storage, &(), &info)?;
//! assert_eq!(posts, json!([]));
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "rusqlite"))]
//! # fn main() {}
//! ```
//!
//! ## Storage Support
//!
//! | Database | Driver   | Feature Flag |
//! |----------|----------|--------------|
//! | SQLite   | rusqlite | `rusqlite`   |

/// Result type for generator operations
pub use drizzle_graphql_core::error::Result;

/// Error types
pub mod error {
    pub use drizzle_graphql_core::error::GeneratorError;
}

/// Dialect-independent engine: model, policies, filters, plans and the
/// operation generator.
pub mod core {
    pub use drizzle_graphql_core::*;
}

/// SQLite storage adapter.
pub mod sqlite {
    pub use drizzle_graphql_sqlite::*;

    #[cfg(feature = "rusqlite")]
    pub use ::rusqlite;
}

pub mod prelude {
    pub use drizzle_graphql_core::{
        Cardinality, Column, ColumnType, FieldNode, FilterTree, Generator, GeneratorError,
        GeneratorOptions, IncludeExclude, ModelOptions, ModelParams, Operation, OperationGroup,
        OperationSelection, PolicyParams, Relation, ResolveInfo, Row, SchemaDef, Selection, Sort,
        StaticOptions, Storage, TableDef,
    };

    #[cfg(feature = "rusqlite")]
    pub use drizzle_graphql_sqlite::SQLiteStorage;
}

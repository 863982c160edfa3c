//! SQLite storage adapter for drizzle-graphql
//!
//! Renders the generator's plans into SQLite SQL and runs them through
//! `rusqlite` (behind the `rusqlite` feature).

pub mod builder;
pub mod conditions;
#[cfg(feature = "rusqlite")]
pub mod connection;
#[cfg(feature = "rusqlite")]
pub mod introspect;
pub mod rows;
pub mod sql;
pub mod values;

#[cfg(feature = "rusqlite")]
pub use connection::{SQLiteStorage, SQLiteTransactionType};
#[cfg(feature = "rusqlite")]
pub use introspect::introspect;
pub use sql::{SQL, SQLChunk, Token};
pub use values::SQLiteValue;

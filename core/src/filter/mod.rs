//! Filter trees and their compilation into predicates.

mod compile;
mod operator;
mod tree;

pub use compile::{compile, FilterCompiler, RelationScope};
pub use operator::Operator;
pub use tree::FilterTree;

use crate::error::Result;
use crate::plan::{CountQuery, DeletePlan, InsertPlan, MutationOutput, SelectPlan, UpdatePlan};
use crate::Row;

/// Storage engine consumed by the generator.
///
/// Errors from the engine are returned unchanged; nothing above this trait
/// retries.
pub trait Storage {
    fn select(&self, plan: &SelectPlan) -> Result<Vec<Row>>;

    fn count(&self, query: &CountQuery) -> Result<u64>;

    fn insert(&self, plan: &InsertPlan) -> Result<MutationOutput>;

    fn update(&self, plan: &UpdatePlan) -> Result<MutationOutput>;

    fn delete(&self, plan: &DeletePlan) -> Result<MutationOutput>;

    /// Runs `f` atomically. `Ok` commits; `Err` rolls back and is returned.
    /// Calls may nest.
    fn transaction(&self, f: &mut dyn FnMut(&dyn Storage) -> Result<()>) -> Result<()>;
}

use crate::{Result, RunContext, Table};
use async_trait::async_trait;

/// Trait for the per-run handoff buffer between the extract and load tasks.
///
/// One table is written once by the extract task and consumed once by the
/// load task of the same run. Nothing is persisted beyond that.
#[async_trait]
pub trait Staging: Send + Sync {
    /// Stage a table under `key` for the given run.
    async fn put(&self, run: &RunContext, key: &str, table: &Table) -> Result<()>;

    /// Read and discard the table staged under `key` for the given run.
    ///
    /// Returns [`Error::MissingHandoff`](crate::Error::MissingHandoff) if
    /// the upstream task never staged anything.
    async fn take(&self, run: &RunContext, key: &str) -> Result<Table>;
}

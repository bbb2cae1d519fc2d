use crate::{Result, Table};
use async_trait::async_trait;

/// Trait for data destinations.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Destination name used in logs.
    fn name(&self) -> &str;

    /// Overwrite the destination with the table's contents.
    ///
    /// The write replaces whatever the destination held before; there is
    /// no append mode and no partial-write recovery.
    async fn load(&self, table: Table) -> Result<()>;
}

use crate::{Result, Table};
use async_trait::async_trait;

/// Trait for data sources.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Source name used in logs.
    fn name(&self) -> &str;

    /// Query the source and materialize the full result set as a table.
    async fn extract(&self) -> Result<Table>;
}

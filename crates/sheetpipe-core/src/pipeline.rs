use crate::{Extractor, Loader, Result, RunContext, Staging, TableSchema};
use tracing::{info, warn};

/// Staging key under which the extract task hands its table to the load
/// task. Fixed; runs are isolated by run id, not by key.
pub const HANDOFF_KEY: &str = "mongo_table";

/// The two-task export pipeline: extract into staging, load from staging.
///
/// The two tasks are separate scheduler entry points; the scheduler's
/// dependency edge guarantees the load task never starts before the
/// extract task of the same run has finished. [`Pipeline::run`] executes
/// both in order for single-process runs.
pub struct Pipeline {
    extractor: Box<dyn Extractor>,
    loader: Box<dyn Loader>,
    staging: Box<dyn Staging>,
    schema: TableSchema,
}

impl Pipeline {
    pub fn new(
        extractor: Box<dyn Extractor>,
        loader: Box<dyn Loader>,
        staging: Box<dyn Staging>,
        schema: TableSchema,
    ) -> Self {
        Self {
            extractor,
            loader,
            staging,
            schema,
        }
    }

    /// Extract task: query the source, stage the table for the load task.
    pub async fn run_extract(&self, run: &RunContext) -> Result<()> {
        info!(
            "Starting extract task from '{}' (run {})",
            self.extractor.name(),
            run.run_id()
        );

        let table = self.extractor.extract().await?;
        table.schema().ensure_matches(&self.schema)?;

        info!("Extracted {} row(s)", table.row_count());
        info!("First rows:\n{}", table.preview(10));

        self.staging.put(run, HANDOFF_KEY, &table).await?;
        info!("Staged table under key '{}'", HANDOFF_KEY);

        Ok(())
    }

    /// Load task: consume the staged table, sanitize it, write it out.
    ///
    /// The handoff read happens first; a missing handoff fails the task
    /// before any credentials are touched.
    pub async fn run_load(&self, run: &RunContext) -> Result<()> {
        info!(
            "Starting load task to '{}' (run {})",
            self.loader.name(),
            run.run_id()
        );

        let mut table = self.staging.take(run, HANDOFF_KEY).await?;
        table.schema().ensure_matches(&self.schema)?;

        let replaced = table.sanitize();
        if replaced > 0 {
            warn!("Sanitized {} non-finite or null cell(s)", replaced);
        }

        self.loader.load(table).await?;
        info!("Load task finished");

        Ok(())
    }

    /// Run both tasks in order within one process.
    pub async fn run(&self, run: &RunContext) -> Result<()> {
        self.run_extract(run).await?;
        self.run_load(run).await
    }
}

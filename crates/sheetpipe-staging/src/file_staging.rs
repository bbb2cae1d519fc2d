use async_trait::async_trait;
use sheetpipe_core::{Error, Result, RunContext, Staging, Table};
use std::path::PathBuf;
use tracing::{debug, info};

/// File-backed staging area: one directory per run, one JSON blob per key.
///
/// The blob is written once by the extract task and removed when the load
/// task consumes it, so nothing outlives its run.
pub struct FileStaging {
    root: PathBuf,
}

impl FileStaging {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn run_dir(&self, run: &RunContext) -> PathBuf {
        // Run ids come from an external scheduler; keep them out of the
        // path-separator business.
        let dir: String = run
            .run_id()
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.root.join(dir)
    }

    fn blob_path(&self, run: &RunContext, key: &str) -> PathBuf {
        self.run_dir(run).join(format!("{}.json", key))
    }
}

#[async_trait]
impl Staging for FileStaging {
    async fn put(&self, run: &RunContext, key: &str, table: &Table) -> Result<()> {
        let dir = self.run_dir(run);
        std::fs::create_dir_all(&dir)?;

        let path = self.blob_path(run, key);
        let blob = serde_json::to_vec(table)?;
        std::fs::write(&path, blob)?;

        info!(
            "Staged {} row(s) at {} for run {}",
            table.row_count(),
            path.display(),
            run.run_id()
        );
        Ok(())
    }

    async fn take(&self, run: &RunContext, key: &str) -> Result<Table> {
        let path = self.blob_path(run, key);

        let blob = match std::fs::read(&path) {
            Ok(blob) => blob,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::MissingHandoff(format!(
                    "no table staged under '{}' for run {}",
                    key,
                    run.run_id()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let table: Table = serde_json::from_slice(&blob)?;

        std::fs::remove_file(&path)?;
        // Drop the run directory once its last blob is gone.
        let _ = std::fs::remove_dir(self.run_dir(run));
        debug!("Consumed staged table at {}", path.display());

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetpipe_core::{Cell, TableSchema};

    fn sample_table() -> Table {
        let mut table = Table::new(TableSchema::user_export());
        table
            .push_row(vec![
                Cell::Text("u1".into()),
                Cell::Null,
                Cell::Null,
                Cell::Text("u1@example.com".into()),
            ])
            .unwrap();
        table
            .push_row(vec![
                Cell::Text("u2".into()),
                Cell::Null,
                Cell::Null,
                Cell::Text("u2@example.com".into()),
            ])
            .unwrap();
        table
    }

    #[tokio::test]
    async fn test_round_trip_preserves_columns_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let staging = FileStaging::new(dir.path());
        let run = RunContext::new("run-1");

        let table = sample_table();
        staging.put(&run, "mongo_table", &table).await.unwrap();
        let restored = staging.take(&run, "mongo_table").await.unwrap();

        assert_eq!(restored, table);
        assert_eq!(
            restored.schema().column_names(),
            vec!["id", "createdAt", "updatedAt", "email"]
        );
    }

    #[tokio::test]
    async fn test_take_consumes_the_blob() {
        let dir = tempfile::tempdir().unwrap();
        let staging = FileStaging::new(dir.path());
        let run = RunContext::new("run-2");

        staging.put(&run, "mongo_table", &sample_table()).await.unwrap();
        staging.take(&run, "mongo_table").await.unwrap();

        let err = staging.take(&run, "mongo_table").await.unwrap_err();
        assert!(matches!(err, Error::MissingHandoff(_)));
    }

    #[tokio::test]
    async fn test_missing_handoff_is_a_distinct_error() {
        let dir = tempfile::tempdir().unwrap();
        let staging = FileStaging::new(dir.path());

        let err = staging
            .take(&RunContext::new("never-ran"), "mongo_table")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingHandoff(_)));
    }

    #[tokio::test]
    async fn test_runs_do_not_share_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let staging = FileStaging::new(dir.path());

        staging
            .put(&RunContext::new("run-a"), "mongo_table", &sample_table())
            .await
            .unwrap();

        let err = staging
            .take(&RunContext::new("run-b"), "mongo_table")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingHandoff(_)));
    }

    #[tokio::test]
    async fn test_scheduler_style_run_ids_are_safe_paths() {
        let dir = tempfile::tempdir().unwrap();
        let staging = FileStaging::new(dir.path());
        let run = RunContext::new("scheduled__2024-05-01T12:00:00+00:00");

        staging.put(&run, "mongo_table", &sample_table()).await.unwrap();
        let restored = staging.take(&run, "mongo_table").await.unwrap();
        assert_eq!(restored.row_count(), 2);
    }
}

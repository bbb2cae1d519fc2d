use uuid::Uuid;

/// Environment variable through which an external scheduler hands us its
/// run identifier.
pub const RUN_ID_ENV: &str = "SHEETPIPE_RUN_ID";

/// Identity of one pipeline run.
///
/// The run id scopes the staging handoff: the extract and load tasks of a
/// run must be invoked with the same id. The scheduler is responsible for
/// run-level isolation; at most one run is expected in flight at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    run_id: String,
}

impl RunContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
        }
    }

    /// Take the run id from [`RUN_ID_ENV`], or mint a fresh one when the
    /// process was started outside a scheduler.
    pub fn from_env() -> Self {
        std::env::var(RUN_ID_ENV)
            .ok()
            .filter(|id| !id.is_empty())
            .map(Self::new)
            .unwrap_or_else(Self::generate)
    }

    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_produces_distinct_ids() {
        let a = RunContext::generate();
        let b = RunContext::generate();
        assert!(!a.run_id().is_empty());
        assert_ne!(a.run_id(), b.run_id());
    }

    #[test]
    fn test_new_keeps_given_id() {
        let run = RunContext::new("scheduled__2024-05-01T12:00:00");
        assert_eq!(run.run_id(), "scheduled__2024-05-01T12:00:00");
    }
}

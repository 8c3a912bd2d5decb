use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The most recent session, as recorded by the active handoff.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRef {
    pub date: String,
    pub topic: String,
    pub path: PathBuf,
}

/// Aggregate project status for an agent resuming work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateReport {
    pub project: String,
    pub project_type: String,
    pub phase: String,
    /// `None` until the first handoff has been written.
    pub last_session: Option<SessionRef>,
    pub next_steps: Vec<String>,
    pub open_questions: Vec<String>,
    /// Number of live records in `summaries/`.
    pub file_count: usize,
    /// Set once `file_count` reaches the soft cap.
    pub warning: bool,
}

/// Result of processing one source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOutcome {
    pub summary_path: PathBuf,
    pub archived_source: PathBuf,
    pub synopsis: String,
}

/// Result of writing a handoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffOutcome {
    pub record_path: PathBuf,
    /// Where the previously active record went, if there was one.
    pub archived_previous: Option<PathBuf>,
    pub synopsis: String,
}

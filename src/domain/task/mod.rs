pub mod progress;
pub mod store;

pub use progress::run_progress_simulator;
pub use store::TaskStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Maximum characters of submitted text kept on the task record.
const TEXT_PREVIEW_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Processing)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Processing => write!(f, "processing"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One tracked synthesis job.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: String,
    pub status: TaskStatus,
    /// Display percentage in [0, 100]. 100 exactly when completed; a failed
    /// task keeps whatever the simulator last showed.
    pub progress: u8,
    pub artifact_path: PathBuf,
    pub character: String,
    pub text_preview: String,
    pub created_at: DateTime<Utc>,
    /// Non-empty exactly when status is failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Truncate submitted text for display on status responses.
pub fn text_preview(text: &str) -> String {
    if text.chars().count() > TEXT_PREVIEW_LEN {
        let truncated: String = text.chars().take(TEXT_PREVIEW_LEN).collect();
        format!("{}...", truncated)
    } else {
        text.to_string()
    }
}

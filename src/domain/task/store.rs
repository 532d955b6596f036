use super::{text_preview, Task, TaskStatus};
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

/// In-memory registry of tasks; the single source of truth for task state.
///
/// State is process-local and not persisted. All mutation goes through
/// [`TaskStore::transition`] and [`TaskStore::bump_progress`] so the
/// simulator and the terminal-state writer cannot lose each other's updates.
/// Lock sections are short and never held across an await point.
pub struct TaskStore {
    tasks: RwLock<HashMap<String, Task>>,
}

/// Counters for the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct TaskCounts {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub processing_tasks: usize,
}

impl TaskStore {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
        }
    }

    /// Create a task in the `processing` state and return it.
    ///
    /// The id is the first 16 hex characters of a SHA-256 over
    /// `character|text|submission-time`. A collision would need the same
    /// character and text in the same nanosecond; not guarded.
    pub fn create(&self, character: &str, text: &str, artifact_path: &Path) -> Task {
        let now = Utc::now();
        let mut hasher = Sha256::new();
        hasher.update(character.as_bytes());
        hasher.update(b"|");
        hasher.update(text.as_bytes());
        hasher.update(b"|");
        hasher.update(now.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
        let id = hex_prefix(&hasher.finalize(), 16);

        let task = Task {
            id: id.clone(),
            status: TaskStatus::Processing,
            progress: 0,
            artifact_path: artifact_path.to_path_buf(),
            character: character.to_string(),
            text_preview: text_preview(text),
            created_at: now,
            error: None,
        };

        self.tasks.write().unwrap().insert(id, task.clone());
        task
    }

    pub fn get(&self, task_id: &str) -> Option<Task> {
        self.tasks.read().unwrap().get(task_id).cloned()
    }

    /// Move a task to a terminal state. The only path that writes `status`,
    /// `error`, and the final `progress`.
    ///
    /// Completion forces progress to 100; failure records the error and
    /// leaves progress at whatever the simulator last showed.
    pub fn transition(&self, task_id: &str, status: TaskStatus, error: Option<String>) -> bool {
        let mut tasks = self.tasks.write().unwrap();
        let Some(task) = tasks.get_mut(task_id) else {
            return false;
        };
        task.status = status;
        match status {
            TaskStatus::Completed => {
                task.progress = 100;
                task.error = None;
            }
            TaskStatus::Failed => {
                task.error = Some(error.unwrap_or_else(|| "unknown error".to_string()));
            }
            TaskStatus::Processing => {}
        }
        true
    }

    /// Advance simulated progress by `increment`, capped, only while the
    /// task is still processing. Returns false once the simulator should stop
    /// (task absent or terminal).
    pub fn bump_progress(&self, task_id: &str, increment: u8, cap: u8) -> bool {
        let mut tasks = self.tasks.write().unwrap();
        let Some(task) = tasks.get_mut(task_id) else {
            return false;
        };
        if task.status != TaskStatus::Processing {
            return false;
        }
        task.progress = task.progress.saturating_add(increment).min(cap);
        true
    }

    pub fn list_completed(&self) -> HashMap<String, Task> {
        self.tasks
            .read()
            .unwrap()
            .iter()
            .filter(|(_, task)| task.status == TaskStatus::Completed)
            .map(|(id, task)| (id.clone(), task.clone()))
            .collect()
    }

    pub fn list_by_ids(&self, task_ids: &[String]) -> HashMap<String, Option<Task>> {
        let tasks = self.tasks.read().unwrap();
        task_ids
            .iter()
            .map(|id| (id.clone(), tasks.get(id).cloned()))
            .collect()
    }

    pub fn counts(&self) -> TaskCounts {
        let tasks = self.tasks.read().unwrap();
        let mut counts = TaskCounts {
            total_tasks: tasks.len(),
            completed_tasks: 0,
            failed_tasks: 0,
            processing_tasks: 0,
        };
        for task in tasks.values() {
            match task.status {
                TaskStatus::Completed => counts.completed_tasks += 1,
                TaskStatus::Failed => counts.failed_tasks += 1,
                TaskStatus::Processing => counts.processing_tasks += 1,
            }
        }
        counts
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

fn hex_prefix(digest: &[u8], len: usize) -> String {
    let mut out = String::with_capacity(len);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
        if out.len() >= len {
            break;
        }
    }
    out.truncate(len);
    out
}

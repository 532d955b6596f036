use super::{generate_filename, SubmitResponse, TtsRequest};
use crate::domain::federation::FederationRegistry;
use crate::domain::poller::{PollerConfig, RelayPoller};
use crate::domain::task::{progress, run_progress_simulator, Task, TaskStatus, TaskStore};
use crate::infrastructure::upstream::UpstreamClient;
use chrono::Utc;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// How long /stream is willing to wait for a task to leave `processing`.
const STREAM_WAIT_BUDGET: Duration = Duration::from_secs(30);
/// Cadence at which the bounded wait re-reads the store.
const STREAM_POLL_CADENCE: Duration = Duration::from_millis(500);

/// Orchestrates the task lifecycle: computes the cache path, creates the
/// task, runs the upstream call and the progress simulator in the
/// background, and dispatches federation callbacks on completion.
pub struct RelayService {
    store: Arc<TaskStore>,
    registry: Arc<FederationRegistry>,
    upstream: Arc<UpstreamClient>,
    cache_dir: PathBuf,
    public_base_url: String,
    progress_tick: Duration,
    stream_cadence: Duration,
    stream_budget: Duration,
    master: Option<MasterLink>,
}

/// When chained behind a master relay, jobs are delegated to it through the
/// poller instead of hitting the upstream synthesis server directly.
struct MasterLink {
    url: String,
    poller: RelayPoller,
}

impl RelayService {
    pub fn new(
        store: Arc<TaskStore>,
        registry: Arc<FederationRegistry>,
        upstream: Arc<UpstreamClient>,
        cache_dir: PathBuf,
        public_base_url: String,
    ) -> Self {
        Self {
            store,
            registry,
            upstream,
            cache_dir,
            public_base_url,
            progress_tick: progress::PROGRESS_TICK,
            stream_cadence: STREAM_POLL_CADENCE,
            stream_budget: STREAM_WAIT_BUDGET,
            master: None,
        }
    }

    /// Shorten the simulator tick; tests cannot wait a wall-clock second.
    pub fn with_progress_tick(mut self, tick: Duration) -> Self {
        self.progress_tick = tick;
        self
    }

    /// Shorten the /stream wait; tests cannot sit out the 30 s budget.
    pub fn with_stream_wait(mut self, cadence: Duration, budget: Duration) -> Self {
        self.stream_cadence = cadence;
        self.stream_budget = budget;
        self
    }

    /// Chain this relay behind a master: submissions are forwarded there
    /// and the finished artifact is pulled back into the local cache.
    pub fn with_master(mut self, url: String, poller_config: PollerConfig) -> Self {
        self.master = Some(MasterLink {
            url: url.trim_end_matches('/').to_string(),
            poller: RelayPoller::new(poller_config),
        });
        self
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<FederationRegistry> {
        &self.registry
    }

    pub fn download_url(&self, task_id: &str) -> String {
        format!("{}/download/{}", self.public_base_url, task_id)
    }

    /// Accept a synthesis request and return immediately with a task id.
    ///
    /// Submission never fails, even when the upstream server is down; the
    /// failure surfaces later through polling as `status = failed`.
    pub fn submit(self: &Arc<Self>, mut request: TtsRequest) -> SubmitResponse {
        // The artifact must land where this relay can serve it from, so any
        // caller-supplied save_path is overridden.
        let cache_path = generate_filename(
            &self.cache_dir,
            &request.text,
            &request.character_name,
            Utc::now(),
        );
        request.save_path = Some(cache_path.display().to_string());

        let task = self
            .store
            .create(&request.character_name, &request.text, &cache_path);

        tracing::info!(
            task_id = %task.id,
            character = %request.character_name,
            text_length = request.text.len(),
            save_path = %cache_path.display(),
            "TTS task submitted"
        );

        let service = self.clone();
        let task_id = task.id.clone();
        tokio::spawn(async move {
            service.process_task(task_id, request).await;
        });

        tokio::spawn(run_progress_simulator(
            self.store.clone(),
            task.id.clone(),
            self.progress_tick,
        ));

        SubmitResponse {
            status: "processing".to_string(),
            task_id: task.id.clone(),
            message: "TTS task submitted; poll the status URL with the task id".to_string(),
            check_status_url: format!("/tts_status/{}", task.id),
            download_url: task
                .artifact_path
                .exists()
                .then(|| format!("/download/{}", task.id)),
        }
    }

    /// Background half of a submission: produce the artifact (locally or
    /// via the master), verify it, write the terminal state, fire callbacks.
    async fn process_task(&self, task_id: String, request: TtsRequest) {
        if let Some(master) = &self.master {
            self.process_via_master(master, task_id, request).await;
            return;
        }
        self.process_local(task_id, request).await;
    }

    /// Delegate the whole job to the master relay; the poller downloads the
    /// artifact into this relay's cache on completion.
    async fn process_via_master(&self, master: &MasterLink, task_id: String, request: TtsRequest) {
        let cache_path = PathBuf::from(request.save_path.clone().unwrap_or_default());

        // The master computes its own save path; ours only matters locally.
        let forwarded = TtsRequest {
            save_path: None,
            ..request
        };

        let log_id = task_id.clone();
        let outcome = master
            .poller
            .run(&master.url, &forwarded, &cache_path, move |progress| {
                tracing::debug!(task_id = %log_id, progress, "Master reported progress");
            })
            .await;

        match outcome {
            Ok(()) => {
                self.store.transition(&task_id, TaskStatus::Completed, None);
                tracing::info!(task_id = %task_id, master = %master.url, "Task completed via master");
                self.registry
                    .notify_completed(&task_id, &self.download_url(&task_id))
                    .await;
            }
            Err(e) => {
                tracing::warn!(task_id = %task_id, error = %e, "Task failed via master");
                self.store
                    .transition(&task_id, TaskStatus::Failed, Some(e.to_string()));
            }
        }
    }

    async fn process_local(&self, task_id: String, request: TtsRequest) {
        let payload = json!({
            "character_name": request.character_name,
            "text": request.text,
            "split_sentence": request.split_sentence,
            "save_path": request.save_path,
        });

        let artifact_path = request.save_path.as_deref().unwrap_or_default();

        match self.upstream.call("/tts", Some(payload)).await {
            Ok(_) => {
                if tokio::fs::try_exists(artifact_path).await.unwrap_or(false) {
                    self.store.transition(&task_id, TaskStatus::Completed, None);
                    tracing::info!(
                        task_id = %task_id,
                        artifact = %artifact_path,
                        "TTS task completed"
                    );
                    self.registry
                        .notify_completed(&task_id, &self.download_url(&task_id))
                        .await;
                } else {
                    self.store.transition(
                        &task_id,
                        TaskStatus::Failed,
                        Some("audio file was not produced".to_string()),
                    );
                    tracing::warn!(
                        task_id = %task_id,
                        artifact = %artifact_path,
                        "Upstream call succeeded but the artifact is missing"
                    );
                }
            }
            Err(diagnostic) => {
                tracing::warn!(task_id = %task_id, error = %diagnostic, "TTS task failed");
                self.store
                    .transition(&task_id, TaskStatus::Failed, Some(diagnostic));
            }
        }
    }

    /// Bounded wait used by /stream: re-read the store at the configured
    /// cadence until the task leaves `processing` or the budget runs out,
    /// then return the latest snapshot. Never hangs past the budget.
    pub async fn wait_for_terminal(&self, task_id: &str) -> Option<Task> {
        let deadline = tokio::time::Instant::now() + self.stream_budget;
        loop {
            let task = self.store.get(task_id)?;
            if task.status.is_terminal() || tokio::time::Instant::now() >= deadline {
                return Some(task);
            }
            tokio::time::sleep(self.stream_cadence).await;
        }
    }
}

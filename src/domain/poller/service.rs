use super::PollerError;
use crate::domain::relay::{StatusResponse, SubmitResponse, TtsRequest};
use serde_json::json;
use std::path::Path;
use std::time::Duration;

const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);
const STATUS_TIMEOUT: Duration = Duration::from_secs(10);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);
const REGISTER_TIMEOUT: Duration = Duration::from_secs(5);

/// Pick the relay a submission should go to: the master when chaining is
/// enabled and a master URL is configured, otherwise the local relay.
pub fn select_target<'a>(
    connect_master: bool,
    master_url: Option<&'a str>,
    local_url: &'a str,
) -> &'a str {
    match master_url {
        Some(master) if connect_master && !master.is_empty() => master.trim_end_matches('/'),
        _ => local_url,
    }
}

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Delay between status polls, 500 ms in production.
    pub poll_interval: Duration,
    /// Poll attempt budget; exhausting it is a timeout failure.
    pub max_attempts: u32,
    /// Identifier sent when registering with a master relay.
    pub client_id: String,
    /// Register with the target after submission so it can push a
    /// completion callback.
    pub register_with_master: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            max_attempts: 120,
            client_id: "client".to_string(),
            register_with_master: false,
        }
    }
}

/// Client-side driver of the relay protocol: submit, poll until terminal,
/// download the artifact.
pub struct RelayPoller {
    http_client: reqwest::Client,
    config: PollerConfig,
}

impl RelayPoller {
    pub fn new(config: PollerConfig) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            config,
        }
    }

    /// Run one full submit / poll / download cycle against `target` and
    /// write the artifact to `cache_path`. `progress_sink` receives every
    /// progress value observed while polling.
    pub async fn run(
        &self,
        target: &str,
        request: &TtsRequest,
        cache_path: &Path,
        mut progress_sink: impl FnMut(u8),
    ) -> Result<(), PollerError> {
        let task_id = self.submit(target, request).await?;

        if self.config.register_with_master {
            // Best effort; the master can still be polled if this fails.
            if let Err(e) = self.register_with_master(target, &task_id).await {
                tracing::warn!(task_id = %task_id, error = %e, "Master registration failed");
            }
        }

        tracing::info!(task_id = %task_id, target = %target, "Task submitted, polling status");

        let mut attempt = 0;
        while attempt < self.config.max_attempts {
            let status = match self.poll_status(target, &task_id).await {
                Ok(status) => status,
                Err(e) if e.is_timeout() => {
                    // A slow status endpoint costs one attempt, not the run.
                    tracing::debug!(
                        task_id = %task_id,
                        attempt = attempt + 1,
                        "Status poll timed out, retrying"
                    );
                    attempt += 1;
                    continue;
                }
                Err(e) => return Err(PollerError::StatusPoll(e.to_string())),
            };

            progress_sink(status.progress);

            match status.status.as_str() {
                "completed" => {
                    return self.download(target, &task_id, cache_path).await;
                }
                "failed" => {
                    return Err(PollerError::TaskFailed(
                        status.error.unwrap_or_else(|| "unknown error".to_string()),
                    ));
                }
                _ => {
                    tokio::time::sleep(self.config.poll_interval).await;
                    attempt += 1;
                }
            }
        }

        Err(PollerError::Timeout {
            attempts: self.config.max_attempts,
        })
    }

    async fn submit(&self, target: &str, request: &TtsRequest) -> Result<String, PollerError> {
        let response = self
            .http_client
            .post(format!("{}/tts", target))
            .timeout(SUBMIT_TIMEOUT)
            .json(request)
            .send()
            .await
            .map_err(|e| PollerError::Submit(e.to_string()))?;

        if response.status() != reqwest::StatusCode::OK {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PollerError::Submit(format!("{} - {}", status, body)));
        }

        let submit: SubmitResponse = response
            .json()
            .await
            .map_err(|e| PollerError::Submit(format!("unparseable response: {}", e)))?;

        if submit.status != "processing" {
            return Err(PollerError::Submit(format!(
                "unexpected submission status: {}",
                submit.status
            )));
        }
        if submit.task_id.is_empty() {
            return Err(PollerError::Submit("no task id returned".to_string()));
        }

        Ok(submit.task_id)
    }

    async fn register_with_master(&self, target: &str, task_id: &str) -> Result<(), String> {
        let payload = json!({
            "task_id": task_id,
            "client_id": self.config.client_id,
            "callback_url": null,
        });

        let response = self
            .http_client
            .post(format!("{}/register_client_task", target))
            .timeout(REGISTER_TIMEOUT)
            .json(&payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(format!("registration rejected: {}", response.status()));
        }

        tracing::info!(
            task_id = %task_id,
            client_id = %self.config.client_id,
            "Registered with master relay"
        );
        Ok(())
    }

    async fn poll_status(
        &self,
        target: &str,
        task_id: &str,
    ) -> Result<StatusResponse, reqwest::Error> {
        let response = self
            .http_client
            .get(format!("{}/tts_status/{}", target, task_id))
            .timeout(STATUS_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        response.json().await
    }

    async fn download(
        &self,
        target: &str,
        task_id: &str,
        cache_path: &Path,
    ) -> Result<(), PollerError> {
        let response = self
            .http_client
            .get(format!("{}/download/{}", target, task_id))
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await
            .map_err(|e| PollerError::Download(e.to_string()))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(PollerError::Download(format!(
                "download returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PollerError::Download(e.to_string()))?;

        if let Some(parent) = cache_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(cache_path, &bytes).await?;

        let size = tokio::fs::metadata(cache_path).await.map(|m| m.len());
        match size {
            Ok(len) if len > 0 => {
                tracing::info!(
                    task_id = %task_id,
                    path = %cache_path.display(),
                    bytes = len,
                    "Artifact downloaded"
                );
                Ok(())
            }
            _ => Err(PollerError::EmptyArtifact(
                cache_path.display().to_string(),
            )),
        }
    }
}

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::{
    domain::{
        relay::{RelayService, StatusResponse, TtsRequest},
        task::{Task, TaskStatus},
    },
    error::{AppError, AppResult},
};

/// Request for POST /register_client_task.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterClientTaskRequest {
    pub task_id: String,
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

pub struct RelayController {
    service: Arc<RelayService>,
    backend_url: String,
    request_count: Arc<AtomicU64>,
}

impl RelayController {
    pub fn new(
        service: Arc<RelayService>,
        backend_url: String,
        request_count: Arc<AtomicU64>,
    ) -> Self {
        Self {
            service,
            backend_url,
            request_count,
        }
    }

    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    pub fn requests_processed(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// POST /tts - submit a synthesis job, returning a task id immediately.
    pub async fn submit_tts(
        State(controller): State<Arc<RelayController>>,
        Json(request): Json<TtsRequest>,
    ) -> impl axum::response::IntoResponse {
        controller.request_count.fetch_add(1, Ordering::Relaxed);
        Json(controller.service.submit(request))
    }

    /// GET /tts_status/:task_id - poll one task.
    pub async fn tts_status(
        State(controller): State<Arc<RelayController>>,
        Path(task_id): Path<String>,
    ) -> AppResult<Json<StatusResponse>> {
        let task = controller
            .service
            .store()
            .get(&task_id)
            .ok_or_else(|| AppError::TaskNotFound(task_id.clone()))?;

        Ok(Json(controller.status_response(&task)))
    }

    fn status_response(&self, task: &Task) -> StatusResponse {
        let mut response = StatusResponse {
            task_id: task.id.clone(),
            status: task.status.to_string(),
            progress: task.progress,
            created_at: task.created_at.to_rfc3339(),
            character: task.character.clone(),
            text: task.text_preview.clone(),
            download_url: None,
            file_exists: None,
            file_path: None,
            file_url: None,
            error: None,
        };

        match task.status {
            TaskStatus::Completed => {
                response.download_url = Some(format!("/download/{}", task.id));
                response.file_exists = Some(task.artifact_path.exists());
                response.file_path = Some(task.artifact_path.display().to_string());
                response.file_url = Some(self.service.download_url(&task.id));
            }
            TaskStatus::Failed => {
                response.error = Some(
                    task.error
                        .clone()
                        .unwrap_or_else(|| "unknown error".to_string()),
                );
            }
            TaskStatus::Processing => {}
        }

        response
    }

    /// GET /download/:task_id - serve the finished artifact.
    pub async fn download(
        State(controller): State<Arc<RelayController>>,
        Path(task_id): Path<String>,
    ) -> AppResult<(StatusCode, HeaderMap, Body)> {
        let task = controller
            .service
            .store()
            .get(&task_id)
            .ok_or_else(|| AppError::TaskNotFound(task_id.clone()))?;

        if task.status != TaskStatus::Completed {
            return Err(AppError::InvalidState("task is not completed yet".to_string()));
        }

        controller.serve_artifact(&task).await
    }

    /// GET /stream/:task_id - like download, but waits (bounded) for the
    /// task to leave `processing` first, sparing short jobs a poll loop.
    pub async fn stream(
        State(controller): State<Arc<RelayController>>,
        Path(task_id): Path<String>,
    ) -> AppResult<(StatusCode, HeaderMap, Body)> {
        let task = controller
            .service
            .wait_for_terminal(&task_id)
            .await
            .ok_or_else(|| AppError::TaskNotFound(task_id.clone()))?;

        if task.status != TaskStatus::Completed {
            let detail = task
                .error
                .clone()
                .unwrap_or_else(|| "task did not complete within the wait budget".to_string());
            return Err(AppError::InvalidState(format!("task failed: {}", detail)));
        }

        controller.serve_artifact(&task).await
    }

    async fn serve_artifact(&self, task: &Task) -> AppResult<(StatusCode, HeaderMap, Body)> {
        let bytes = tokio::fs::read(&task.artifact_path)
            .await
            .map_err(|_| AppError::NotFound("audio file no longer exists".to_string()))?;

        let filename = task
            .artifact_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav");

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            media_type_for(filename)
                .parse()
                .map_err(|_| AppError::Internal("invalid media type".to_string()))?,
        );
        headers.insert(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename)
                .parse()
                .map_err(|_| AppError::Internal("invalid artifact filename".to_string()))?,
        );

        Ok((StatusCode::OK, headers, Body::from(bytes)))
    }

    /// POST /register_client_task - federation subscription upsert.
    pub async fn register_client_task(
        State(controller): State<Arc<RelayController>>,
        Json(request): Json<RegisterClientTaskRequest>,
    ) -> AppResult<Json<Value>> {
        if controller.service.store().get(&request.task_id).is_none() {
            return Err(AppError::TaskNotFound(request.task_id));
        }

        controller.service.registry().register(
            &request.client_id,
            &request.task_id,
            request.callback_url,
        );

        tracing::info!(
            client_id = %request.client_id,
            task_id = %request.task_id,
            "Client registered for task updates"
        );

        Ok(Json(json!({
            "status": "success",
            "message": "client task registered"
        })))
    }

    /// GET /client_tasks - all federation registrations.
    pub async fn client_tasks(
        State(controller): State<Arc<RelayController>>,
    ) -> Json<Value> {
        let registrations = controller.service.registry().list();
        Json(json!({
            "total_clients": registrations.len(),
            "client_tasks": registrations,
        }))
    }

    /// GET /completed_tasks - every task that reached `completed`.
    pub async fn completed_tasks(
        State(controller): State<Arc<RelayController>>,
    ) -> Json<Value> {
        let completed = controller.service.store().list_completed();
        Json(json!({
            "total_completed": completed.len(),
            "completed_tasks": completed,
        }))
    }

    /// POST /batch_task_status - status lookup for a list of task ids.
    pub async fn batch_task_status(
        State(controller): State<Arc<RelayController>>,
        Json(task_ids): Json<Vec<String>>,
    ) -> Json<Value> {
        let tasks = controller.service.store().list_by_ids(&task_ids);

        let mut results: HashMap<String, Value> = HashMap::new();
        for (task_id, task) in tasks {
            let entry = match task {
                Some(task) => {
                    let mut entry = json!({
                        "status": task.status.to_string(),
                        "character": task.character,
                        "text": task.text_preview,
                    });
                    if task.status == TaskStatus::Completed {
                        entry["download_url"] = json!(format!("/download/{}", task_id));
                    }
                    entry
                }
                None => json!({ "status": "not_found" }),
            };
            results.insert(task_id, entry);
        }

        Json(json!({ "tasks": results }))
    }

    /// GET /stats - relay-wide counters.
    pub async fn stats(State(controller): State<Arc<RelayController>>) -> Json<Value> {
        let counts = controller.service.store().counts();
        Json(json!({
            "total_requests": controller.requests_processed(),
            "total_tasks": counts.total_tasks,
            "completed_tasks": counts.completed_tasks,
            "failed_tasks": counts.failed_tasks,
            "processing_tasks": counts.processing_tasks,
            "active_clients": controller.service.registry().active_clients(),
            "backend_server": controller.backend_url,
        }))
    }
}

/// Media type inferred from the artifact's file extension.
fn media_type_for(filename: &str) -> &'static str {
    match filename.rsplit('.').next() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("ogg") => "audio/ogg",
        _ => "application/octet-stream",
    }
}

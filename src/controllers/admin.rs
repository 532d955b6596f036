use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    infrastructure::upstream::UpstreamClient,
};

/// Request for POST /load_character.
#[derive(Debug, Serialize, Deserialize)]
pub struct CharacterPayload {
    pub character_name: String,
    pub onnx_model_dir: String,
}

/// Request for POST /unload_character.
#[derive(Debug, Serialize, Deserialize)]
pub struct UnloadCharacterPayload {
    pub character_name: String,
}

/// Request for POST /set_reference_audio.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReferenceAudioPayload {
    pub character_name: String,
    pub audio_path: String,
    pub audio_text: String,
}

/// Pass-through endpoints: each forwards one call to the upstream synthesis
/// server and maps its `(ok, diagnostic)` outcome onto an HTTP response.
pub struct AdminController {
    upstream: Arc<UpstreamClient>,
    request_count: Arc<AtomicU64>,
}

impl AdminController {
    pub fn new(upstream: Arc<UpstreamClient>, request_count: Arc<AtomicU64>) -> Self {
        Self {
            upstream,
            request_count,
        }
    }

    async fn pass_through(
        &self,
        endpoint: &str,
        payload: Option<Value>,
        success_message: &str,
    ) -> AppResult<Json<Value>> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        match self.upstream.call(endpoint, payload).await {
            Ok(_) => Ok(Json(json!({
                "status": "success",
                "message": success_message,
            }))),
            Err(diagnostic) => Err(AppError::Upstream(diagnostic)),
        }
    }

    /// POST /load_character
    pub async fn load_character(
        State(controller): State<Arc<AdminController>>,
        Json(request): Json<CharacterPayload>,
    ) -> AppResult<Json<Value>> {
        controller
            .pass_through(
                "/load_character",
                Some(serde_json::to_value(&request).unwrap_or_default()),
                "character loaded",
            )
            .await
    }

    /// POST /unload_character
    pub async fn unload_character(
        State(controller): State<Arc<AdminController>>,
        Json(request): Json<UnloadCharacterPayload>,
    ) -> AppResult<Json<Value>> {
        controller
            .pass_through(
                "/unload_character",
                Some(serde_json::to_value(&request).unwrap_or_default()),
                "character unloaded",
            )
            .await
    }

    /// POST /set_reference_audio
    pub async fn set_reference_audio(
        State(controller): State<Arc<AdminController>>,
        Json(request): Json<ReferenceAudioPayload>,
    ) -> AppResult<Json<Value>> {
        controller
            .pass_through(
                "/set_reference_audio",
                Some(serde_json::to_value(&request).unwrap_or_default()),
                "reference audio set",
            )
            .await
    }

    /// POST /clear_reference_audio_cache
    pub async fn clear_reference_audio_cache(
        State(controller): State<Arc<AdminController>>,
    ) -> AppResult<Json<Value>> {
        controller
            .pass_through(
                "/clear_reference_audio_cache",
                None,
                "reference audio cache cleared",
            )
            .await
    }

    /// POST /stop - signal the upstream server; tracked tasks are untouched.
    pub async fn stop(
        State(controller): State<Arc<AdminController>>,
    ) -> AppResult<Json<Value>> {
        controller.pass_through("/stop", None, "TTS stopped").await
    }
}

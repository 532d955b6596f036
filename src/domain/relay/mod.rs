pub mod filename;
pub mod service;

pub use filename::generate_filename;
pub use service::RelayService;

use serde::{Deserialize, Serialize};

fn default_false() -> bool {
    false
}

/// Request for POST /tts. Mirrors the upstream synthesis payload; any
/// caller-supplied `save_path` is replaced with a relay-computed cache path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsRequest {
    pub character_name: String,
    pub text: String,
    #[serde(default = "default_false")]
    pub split_sentence: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_path: Option<String>,
}

/// Response for POST /tts. Submission always succeeds synchronously; the
/// task id is the handle for everything that follows.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub status: String,
    pub task_id: String,
    pub message: String,
    pub check_status_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

/// Response for GET /tts_status/{task_id}.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub task_id: String,
    pub status: String,
    pub progress: u8,
    pub created_at: String,
    pub character: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

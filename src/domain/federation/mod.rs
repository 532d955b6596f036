pub mod registry;

pub use registry::FederationRegistry;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A downstream client's interest in one task on this relay.
#[derive(Debug, Clone, Serialize)]
pub struct ClientRegistration {
    pub task_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    pub status: RegistrationStatus,
    pub last_check: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Registered,
    Notified,
}

/// Body POSTed to a registration's callback URL when its task completes.
#[derive(Debug, Serialize, Deserialize)]
pub struct CompletionNotification {
    pub task_id: String,
    pub status: String,
    pub download_url: String,
}

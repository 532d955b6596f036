use super::{ClientRegistration, CompletionNotification, RegistrationStatus};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

/// Callback POSTs are best-effort; keep the timeout short so a dead client
/// cannot stall the completion path.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Tracks which downstream clients are watching which task on a relay
/// acting as master, and dispatches completion callbacks to them.
///
/// Registrations are keyed by client id and live as long as the process;
/// a notified registration stays around with status `notified` rather than
/// being removed.
pub struct FederationRegistry {
    registrations: RwLock<HashMap<String, ClientRegistration>>,
    http_client: reqwest::Client,
}

impl FederationRegistry {
    pub fn new() -> Self {
        Self {
            registrations: RwLock::new(HashMap::new()),
            http_client: reqwest::Client::new(),
        }
    }

    /// Upsert the registration for `client_id`. Callers are responsible for
    /// checking that the task exists first.
    pub fn register(&self, client_id: &str, task_id: &str, callback_url: Option<String>) {
        let registration = ClientRegistration {
            task_id: task_id.to_string(),
            callback_url,
            status: RegistrationStatus::Registered,
            last_check: Utc::now(),
        };
        self.registrations
            .write()
            .unwrap()
            .insert(client_id.to_string(), registration);
    }

    pub fn list(&self) -> HashMap<String, ClientRegistration> {
        self.registrations.read().unwrap().clone()
    }

    pub fn active_clients(&self) -> usize {
        self.registrations.read().unwrap().len()
    }

    /// Push a completion notification to every registration watching
    /// `task_id` that supplied a callback URL.
    ///
    /// Single attempt per registration: success flips the registration to
    /// `notified`, failure is logged and the registration stays
    /// `registered`. Delivery never affects the task's own outcome.
    pub async fn notify_completed(&self, task_id: &str, download_url: &str) {
        let targets: Vec<(String, String)> = self
            .registrations
            .read()
            .unwrap()
            .iter()
            .filter(|(_, reg)| reg.task_id == task_id)
            .filter_map(|(client_id, reg)| {
                reg.callback_url
                    .as_ref()
                    .map(|url| (client_id.clone(), url.clone()))
            })
            .collect();

        for (client_id, callback_url) in targets {
            let payload = CompletionNotification {
                task_id: task_id.to_string(),
                status: "completed".to_string(),
                download_url: download_url.to_string(),
            };

            let result = self
                .http_client
                .post(&callback_url)
                .timeout(CALLBACK_TIMEOUT)
                .json(&payload)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    tracing::info!(
                        client_id = %client_id,
                        callback_url = %callback_url,
                        task_id = %task_id,
                        "Client notified of task completion"
                    );
                    let mut registrations = self.registrations.write().unwrap();
                    if let Some(reg) = registrations.get_mut(&client_id) {
                        reg.status = RegistrationStatus::Notified;
                        reg.last_check = Utc::now();
                    }
                }
                Ok(response) => {
                    tracing::warn!(
                        client_id = %client_id,
                        status = response.status().as_u16(),
                        "Client callback rejected the notification"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        client_id = %client_id,
                        error = %e,
                        "Failed to deliver completion notification"
                    );
                }
            }
        }
    }
}

impl Default for FederationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

use super::TaskStore;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound for simulated progress; the terminal transition owns the
/// last 5 percent.
pub const PROGRESS_CAP: u8 = 95;

/// Production tick cadence. Tests inject something much shorter.
pub const PROGRESS_TICK: Duration = Duration::from_secs(1);

/// Advance a task's displayed progress while it is still processing.
///
/// The upstream protocol is fire-and-wait and reports no intermediate
/// progress, so each tick adds a uniform random increment in [3, 10],
/// capped at [`PROGRESS_CAP`]. The loop exits silently as soon as the task
/// leaves `processing` or is absent from the store.
pub async fn run_progress_simulator(store: Arc<TaskStore>, task_id: String, tick: Duration) {
    let mut interval = tokio::time::interval(tick);
    // First tick fires immediately; skip it so progress stays at 0 for at
    // least one cadence.
    interval.tick().await;

    loop {
        interval.tick().await;
        let increment = rand::rng().random_range(3..=10);
        if !store.bump_progress(&task_id, increment, PROGRESS_CAP) {
            tracing::debug!(task_id = %task_id, "Progress simulator finished");
            break;
        }
    }
}

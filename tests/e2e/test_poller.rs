use crate::e2e::helpers;

use helpers::{TestContext, UpstreamBehavior, WAV_BYTES};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tts_relay::domain::poller::{PollerConfig, PollerError, RelayPoller};
use tts_relay::domain::relay::TtsRequest;

fn request(text: &str) -> TtsRequest {
    TtsRequest {
        character_name: "Alice".to_string(),
        text: text.to_string(),
        split_sentence: false,
        save_path: None,
    }
}

fn fast_poller(max_attempts: u32) -> RelayPoller {
    RelayPoller::new(PollerConfig {
        poll_interval: Duration::from_millis(20),
        max_attempts,
        client_id: "poller_test".to_string(),
        register_with_master: false,
    })
}

#[tokio::test]
async fn it_should_drive_a_full_submit_poll_download_cycle() {
    let ctx = TestContext::new(UpstreamBehavior::Success).await;
    let target_dir = tempfile::tempdir().unwrap();
    let cache_path = target_dir.path().join("nested").join("out.wav");

    let observed = Arc::new(Mutex::new(Vec::new()));
    let sink = observed.clone();

    let poller = fast_poller(200);
    poller
        .run(&ctx.base_url, &request("Hi"), &cache_path, move |p| {
            sink.lock().unwrap().push(p)
        })
        .await
        .unwrap();

    // Parent directories are created and the artifact is intact.
    assert_eq!(std::fs::read(&cache_path).unwrap(), WAV_BYTES);
    // At least the final (completed) progress value was surfaced.
    assert!(!observed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn it_should_surface_a_server_reported_failure() {
    let ctx = TestContext::new(UpstreamBehavior::Http500).await;
    let target_dir = tempfile::tempdir().unwrap();

    let result = fast_poller(200)
        .run(
            &ctx.base_url,
            &request("Hi"),
            &target_dir.path().join("out.wav"),
            |_| {},
        )
        .await;

    match result {
        Err(PollerError::TaskFailed(message)) => {
            assert!(message.contains("500"), "unexpected message: {}", message)
        }
        other => panic!("expected TaskFailed, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn it_should_time_out_when_the_task_never_finishes() {
    let ctx = TestContext::new(UpstreamBehavior::Slow(Duration::from_secs(30))).await;
    let target_dir = tempfile::tempdir().unwrap();

    let result = fast_poller(3)
        .run(
            &ctx.base_url,
            &request("Hi"),
            &target_dir.path().join("out.wav"),
            |_| {},
        )
        .await;

    match result {
        Err(PollerError::Timeout { attempts }) => assert_eq!(attempts, 3),
        other => panic!("expected Timeout, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn it_should_fail_fast_when_the_relay_is_unreachable() {
    let target_dir = tempfile::tempdir().unwrap();

    let result = fast_poller(3)
        .run(
            // Closed local port; the connection is refused immediately.
            "http://127.0.0.1:9",
            &request("Hi"),
            &target_dir.path().join("out.wav"),
            |_| {},
        )
        .await;

    assert!(matches!(result, Err(PollerError::Submit(_))));
}

use crate::e2e::helpers;

use helpers::{CallbackSink, TestContext, UpstreamBehavior, WAV_BYTES};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

#[tokio::test]
async fn it_should_register_a_client_for_an_existing_task() {
    let ctx = TestContext::new(UpstreamBehavior::Success).await;

    let submit = ctx.submit("Alice", "Hi").await;
    let task_id = submit["task_id"].as_str().unwrap();

    let response = ctx
        .client
        .post(ctx.url("/register_client_task"))
        .json(&json!({
            "task_id": task_id,
            "client_id": "C1",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let listing: Value = ctx
        .client
        .get(ctx.url("/client_tasks"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["total_clients"], 1);
    assert_eq!(listing["client_tasks"]["C1"]["task_id"], *task_id);
    assert_eq!(listing["client_tasks"]["C1"]["status"], "registered");
}

#[tokio::test]
async fn it_should_reject_registration_for_an_unknown_task() {
    let ctx = TestContext::new(UpstreamBehavior::Success).await;

    let response = ctx
        .client
        .post(ctx.url("/register_client_task"))
        .json(&json!({
            "task_id": "deadbeefdeadbeef",
            "client_id": "C1",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn it_should_post_a_callback_exactly_once_on_completion() {
    // Slow upstream so the registration lands before the task completes.
    let ctx = TestContext::new(UpstreamBehavior::Slow(Duration::from_millis(300))).await;
    let sink = CallbackSink::start().await;

    let submit = ctx.submit("Alice", "Hi").await;
    let task_id = submit["task_id"].as_str().unwrap().to_string();

    let response = ctx
        .client
        .post(ctx.url("/register_client_task"))
        .json(&json!({
            "task_id": task_id,
            "client_id": "C1",
            "callback_url": sink.url.clone(),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    sink.wait_for(1).await;
    // Give any spurious second delivery time to show up.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let received = sink.received();
    assert_eq!(received.len(), 1);
    let notification = &received[0];
    assert_eq!(notification["task_id"], task_id);
    assert_eq!(notification["status"], "completed");
    assert_eq!(
        notification["download_url"],
        format!("{}/download/{}", ctx.base_url, task_id)
    );

    let listing: Value = ctx
        .client
        .get(ctx.url("/client_tasks"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["client_tasks"]["C1"]["status"], "notified");
}

#[tokio::test]
async fn it_should_complete_the_task_even_when_the_callback_target_is_dead() {
    let ctx = TestContext::new(UpstreamBehavior::Slow(Duration::from_millis(200))).await;

    let submit = ctx.submit("Alice", "Hi").await;
    let task_id = submit["task_id"].as_str().unwrap().to_string();

    ctx.client
        .post(ctx.url("/register_client_task"))
        .json(&json!({
            "task_id": task_id,
            "client_id": "C1",
            // Closed local port; delivery is refused immediately.
            "callback_url": "http://127.0.0.1:9/cb",
        }))
        .send()
        .await
        .unwrap();

    let status = ctx.poll_until_terminal(&task_id).await;
    assert_eq!(status["status"], "completed");

    let listing: Value = ctx
        .client
        .get(ctx.url("/client_tasks"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["client_tasks"]["C1"]["status"], "registered");
}

#[tokio::test]
async fn it_should_chain_a_worker_relay_through_a_master() {
    let master = TestContext::new(UpstreamBehavior::Success).await;
    let worker = TestContext::chained_to(&master, "worker_C1").await;

    let submit = worker.submit("Alice", "Hello from the worker").await;
    let task_id = submit["task_id"].as_str().unwrap().to_string();

    let status = worker.poll_until_terminal(&task_id).await;
    assert_eq!(status["status"], "completed");

    // The worker pulled the artifact into its own cache and serves it.
    let download = worker
        .client
        .get(worker.url(&format!("/download/{}", task_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(download.status(), StatusCode::OK);
    assert_eq!(&download.bytes().await.unwrap()[..], WAV_BYTES);

    // The worker registered itself against the master's task.
    let listing: Value = master
        .client
        .get(master.url("/client_tasks"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["total_clients"], 1);
    assert!(listing["client_tasks"]["worker_C1"].is_object());
}

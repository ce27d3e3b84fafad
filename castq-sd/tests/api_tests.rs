//! Integration tests for castq-sd API endpoints
//!
//! Tests cover:
//! - Health and build info
//! - Queue snapshot and playback control (skip, stop, complete, play, stop item)
//! - Queue editing (remove, clear, reorder)
//! - Manual media injection, serving under /media and cleanup when items leave
//! - Chat injection against a mock source (success, unconfigured, upstream failure)
//! - Settings, context switch, stats snapshot and match clock

mod helpers;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use castq_sd::scheduler::UserCommand;
use castq_common::{ItemOrigin, Payload, QueueItem};
use helpers::mock_source::{events, MockReply, MockSource};
use helpers::TestDaemon;
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: Create request without body
fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: Create request with JSON body
fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

fn item_ids(body: &Value) -> Vec<String> {
    body["items"]
        .as_array()
        .expect("items array")
        .iter()
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect()
}

/// Daemon with three text items queued, the first one active
async fn daemon_with_items() -> TestDaemon {
    let daemon = TestDaemon::start(None, Some("match-1"));
    for (id, label) in [("a", "Kick-off"), ("b", "Corner"), ("c", "Throw-in")] {
        daemon
            .handle
            .execute(UserCommand::InjectManual(QueueItem::new(
                id,
                ItemOrigin::Remote,
                label,
                Payload::text(label),
            )))
            .await
            .unwrap();
    }
    // Priority inserts push later items in front; restore a, b, c
    daemon
        .handle
        .execute(UserCommand::Reorder(vec!["a".into(), "b".into(), "c".into()]))
        .await
        .unwrap();
    daemon
        .handle
        .execute(UserCommand::Play("a".into()))
        .await
        .unwrap();
    daemon
}

// =============================================================================
// Health Endpoint Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let daemon = TestDaemon::start(None, None);

    let response = daemon.router().oneshot(test_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "castq-sd");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_build_info_endpoint() {
    let daemon = TestDaemon::start(None, None);

    let response = daemon.router().oneshot(test_request("GET", "/build_info")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert!(body["git_hash"].is_string());
    assert!(body["build_timestamp"].is_string());
    assert!(body["build_profile"].is_string());
}

// =============================================================================
// Queue and Playback Tests
// =============================================================================

#[tokio::test]
async fn test_empty_queue() {
    let daemon = TestDaemon::start(None, Some("match-1"));

    let response = daemon.router().oneshot(test_request("GET", "/queue")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["items"], json!([]));
}

#[tokio::test]
async fn test_skip_advances_to_next_item() {
    let daemon = daemon_with_items().await;

    let response = daemon
        .router()
        .oneshot(test_request("POST", "/playback/skip"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(item_ids(&body), vec!["b", "c"]);
    assert_eq!(body["items"][0]["state"], "Active");
}

#[tokio::test]
async fn test_stop_disables_auto_play() {
    let daemon = daemon_with_items().await;

    let response = daemon
        .router()
        .oneshot(test_request("POST", "/playback/stop"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(item_ids(&body), vec!["b", "c"]);
    assert_eq!(body["items"][0]["state"], "Queued");

    let response = daemon.router().oneshot(test_request("GET", "/status")).await.unwrap();
    let status = extract_json(response.into_body()).await;
    assert_eq!(status["auto_play"], false);
    assert_eq!(status["active_item_id"], Value::Null);
}

#[tokio::test]
async fn test_complete_with_and_without_body() {
    let daemon = daemon_with_items().await;

    // Completion for a non-active item changes nothing
    let response = daemon
        .router()
        .oneshot(json_request("POST", "/playback/complete", json!({ "item_id": "c" })))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(item_ids(&body), vec!["a", "b", "c"]);

    let response = daemon
        .router()
        .oneshot(json_request("POST", "/playback/complete", json!({ "item_id": "a" })))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(item_ids(&body), vec!["b", "c"]);

    // Text acknowledgement without a body
    let response = daemon
        .router()
        .oneshot(test_request("POST", "/playback/complete"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(item_ids(&body), vec!["c"]);
    assert_eq!(body["items"][0]["state"], "Active");
}

#[tokio::test]
async fn test_complete_without_json_header_names_item() {
    let daemon = daemon_with_items().await;

    // Raw body without Content-Type still names a non-active item: no-op
    let request = Request::builder()
        .method("POST")
        .uri("/playback/complete")
        .body(Body::from(r#"{"item_id":"c"}"#))
        .unwrap();
    let response = daemon.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(item_ids(&body), vec!["a", "b", "c"]);
    assert_eq!(body["items"][0]["state"], "Active");
}

#[tokio::test]
async fn test_complete_malformed_body_rejected() {
    let daemon = daemon_with_items().await;

    let response = daemon
        .router()
        .oneshot(json_request("POST", "/playback/complete", json!({ "item_id": 99 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method("POST")
        .uri("/playback/complete")
        .body(Body::from("finished"))
        .unwrap();
    let response = daemon.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The active item kept playing
    assert_eq!(daemon.queue_ids().await, vec!["a", "b", "c"]);
    let status = daemon.handle.status().await.unwrap();
    assert_eq!(status.active_item_id.as_deref(), Some("a"));
}

#[tokio::test]
async fn test_stop_item_then_replay() {
    let daemon = daemon_with_items().await;

    let response = daemon
        .router()
        .oneshot(test_request("POST", "/playback/stop/a"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(item_ids(&body), vec!["a", "b", "c"]);
    assert_eq!(body["items"][0]["state"], "Done");

    let response = daemon
        .router()
        .oneshot(test_request("POST", "/playback/play/a"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["items"][0]["state"], "Active");
}

// =============================================================================
// Queue Editing Tests
// =============================================================================

#[tokio::test]
async fn test_remove_item() {
    let daemon = daemon_with_items().await;

    let response = daemon
        .router()
        .oneshot(test_request("DELETE", "/queue/b"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(item_ids(&body), vec!["a", "c"]);
}

#[tokio::test]
async fn test_remove_absent_item_is_noop() {
    let daemon = daemon_with_items().await;

    let response = daemon
        .router()
        .oneshot(test_request("DELETE", "/queue/nope"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(item_ids(&body), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_clear_keeps_active_item() {
    let daemon = daemon_with_items().await;

    let response = daemon
        .router()
        .oneshot(test_request("POST", "/queue/clear"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(item_ids(&body), vec!["a"]);
}

#[tokio::test]
async fn test_reorder_queue() {
    let daemon = daemon_with_items().await;

    let response = daemon
        .router()
        .oneshot(json_request("POST", "/queue/reorder", json!({ "order": ["c", "ghost", "a"] })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(item_ids(&body), vec!["c", "a", "b"]);
    assert_eq!(body["items"][1]["state"], "Active");
}

// =============================================================================
// Manual Injection Tests
// =============================================================================

#[tokio::test]
async fn test_manual_inject_stores_and_serves_media() {
    let daemon = daemon_with_items().await;
    let blob = b"ID3fake-mp3-bytes".to_vec();

    let request = Request::builder()
        .method("POST")
        .uri("/inject/manual?label=Goal%20horn&filename=horn.MP3")
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Body::from(blob.clone()))
        .unwrap();
    let response = daemon.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let item_id = body["item_id"].as_str().unwrap().to_string();

    // Inserted directly after the active item
    assert_eq!(item_ids(&body), vec!["a".to_string(), item_id.clone(), "b".into(), "c".into()]);
    let injected = &body["items"][1];
    assert_eq!(injected["origin"], "Manual");
    assert_eq!(injected["label"], "Goal horn");

    let media_url = injected["payload"]["media_url"].as_str().unwrap().to_string();
    assert_eq!(media_url, format!("/media/{}.mp3", item_id));

    let stored = daemon.media_dir.path().join(format!("{}.mp3", item_id));
    assert_eq!(std::fs::read(&stored).unwrap(), blob);

    let response = daemon.router().oneshot(test_request("GET", &media_url)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let served = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(served.to_vec(), blob);
}

#[tokio::test]
async fn test_manual_inject_with_nothing_active_starts_playing() {
    let daemon = TestDaemon::start(None, Some("match-1"));

    let request = Request::builder()
        .method("POST")
        .uri("/inject/manual")
        .body(Body::from(vec![1u8, 2, 3]))
        .unwrap();
    let response = daemon.router().oneshot(request).await.unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["items"][0]["state"], "Active");
    assert_eq!(body["items"][0]["label"], "Manual clip");
    assert!(body["items"][0]["payload"]["media_url"]
        .as_str()
        .unwrap()
        .ends_with(".bin"));
}

#[tokio::test]
async fn test_manual_inject_empty_body_rejected() {
    let daemon = TestDaemon::start(None, Some("match-1"));

    let response = daemon
        .router()
        .oneshot(test_request("POST", "/inject/manual?label=Empty"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert!(body["status"].as_str().unwrap().starts_with("error:"));
    assert!(daemon.queue_ids().await.is_empty());
}

/// Inject a manual clip and return its id and on-disk path
async fn inject_clip(daemon: &TestDaemon, filename: &str) -> (String, std::path::PathBuf) {
    let request = Request::builder()
        .method("POST")
        .uri(format!("/inject/manual?filename={}", filename))
        .body(Body::from(b"clip-bytes".to_vec()))
        .unwrap();
    let response = daemon.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    let item_id = body["item_id"].as_str().unwrap().to_string();
    let ext = std::path::Path::new(filename).extension().unwrap().to_str().unwrap();
    let path = daemon.media_dir.path().join(format!("{}.{}", item_id, ext));
    assert!(path.exists());
    (item_id, path)
}

#[tokio::test]
async fn test_removed_manual_item_deletes_media() {
    let daemon = daemon_with_items().await;
    let (item_id, path) = inject_clip(&daemon, "horn.mp3").await;

    let response = daemon
        .router()
        .oneshot(test_request("DELETE", &format!("/queue/{}", item_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stored = &path;
    helpers::wait_until("media file deleted", || async move { !stored.exists() }).await;
    let response = daemon
        .router()
        .oneshot(test_request("GET", &format!("/media/{}.mp3", item_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_completed_manual_item_deletes_media() {
    let daemon = TestDaemon::start(None, Some("match-1"));
    let (item_id, path) = inject_clip(&daemon, "jingle.ogg").await;

    let response = daemon
        .router()
        .oneshot(json_request("POST", "/playback/complete", json!({ "item_id": item_id })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stored = &path;
    helpers::wait_until("media file deleted", || async move { !stored.exists() }).await;
    assert!(daemon.queue_ids().await.is_empty());
}

#[tokio::test]
async fn test_context_switch_deletes_manual_media() {
    let daemon = daemon_with_items().await;
    let (_, first) = inject_clip(&daemon, "a.wav").await;
    let (_, second) = inject_clip(&daemon, "b.wav").await;

    let response = daemon
        .router()
        .oneshot(json_request("POST", "/session/context", json!({ "context_id": "match-2" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (first, second) = (&first, &second);
    helpers::wait_until("media files deleted", || async move { !first.exists() && !second.exists() }).await;
}

// =============================================================================
// Chat Injection Tests
// =============================================================================

#[tokio::test]
async fn test_chat_inject_queues_reply() {
    let source = MockSource::start(vec![MockReply::Json(events(&[("reply-1", "Answer")]))]).await;
    let daemon = TestDaemon::start(Some(&source.url), Some("match-1"));

    let response = daemon
        .router()
        .oneshot(json_request(
            "POST",
            "/inject/chat",
            json!({ "message": "Who scored first?", "match_summary": "1-0" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["accepted"], 1);
    assert_eq!(item_ids(&body), vec!["reply-1"]);
    assert_eq!(body["items"][0]["state"], "Active");

    let sent = &source.requests()[0];
    assert_eq!(sent["requestKind"], "CHAT");
    assert_eq!(sent["userMessage"], "Who scored first?");
    assert_eq!(sent["matchSummary"], "1-0");
    assert_eq!(sent["contextId"], "match-1");
}

#[tokio::test]
async fn test_chat_inject_unconfigured() {
    let daemon = TestDaemon::start(None, Some("match-1"));

    let response = daemon
        .router()
        .oneshot(json_request("POST", "/inject/chat", json!({ "message": "hello" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_chat_inject_upstream_failure() {
    let source = MockSource::start(vec![MockReply::Status(500, "model overloaded".into())]).await;
    let daemon = TestDaemon::start(Some(&source.url), Some("match-1"));

    let response = daemon
        .router()
        .oneshot(json_request("POST", "/inject/chat", json!({ "message": "hello" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let status = daemon.handle.status().await.unwrap();
    assert!(status.connected);
    assert_eq!(status.queue_length, 0);
}

#[tokio::test]
async fn test_chat_inject_blank_message_rejected() {
    let daemon = TestDaemon::start(None, Some("match-1"));

    let response = daemon
        .router()
        .oneshot(json_request("POST", "/inject/chat", json!({ "message": "   " })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Settings and Session Tests
// =============================================================================

#[tokio::test]
async fn test_update_settings() {
    let daemon = TestDaemon::start(None, Some("match-1"));

    let response = daemon
        .router()
        .oneshot(json_request(
            "POST",
            "/settings",
            json!({
                "auto_play": false,
                "persona": "excited",
                "endpoint": "http://source.test/feed",
                "credentials": { "apiKey": "secret" }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let status = extract_json(response.into_body()).await;
    assert_eq!(status["auto_play"], false);
    assert_eq!(status["persona"], "excited");
    assert_eq!(status["endpoint"], "http://source.test/feed");
    assert_eq!(status["credential_keys"], json!(["apiKey"]));
}

#[tokio::test]
async fn test_context_switch_clears_queue() {
    let daemon = daemon_with_items().await;

    let response = daemon
        .router()
        .oneshot(json_request("POST", "/session/context", json!({ "context_id": "match-2" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let status = extract_json(response.into_body()).await;
    assert_eq!(status["context_id"], "match-2");
    assert_eq!(status["queue_length"], 0);
    assert_eq!(status["poll_sequence"], 0);
    assert!(daemon.queue_ids().await.is_empty());
}

#[tokio::test]
async fn test_stats_snapshot_forwarded_with_next_poll() {
    let daemon = TestDaemon::start(Some("http://source.test/feed"), Some("match-1"));

    let response = daemon
        .router()
        .oneshot(json_request("POST", "/session/stats", json!({ "possession": [55, 45] })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response.into_body()).await["status"], "ok");

    let ticket = daemon.handle.begin_poll().await.unwrap().unwrap();
    assert_eq!(ticket.request.last_stats_snapshot, Some(json!({ "possession": [55, 45] })));
}

#[tokio::test]
async fn test_match_clock() {
    let daemon = TestDaemon::start(None, Some("match-1"));

    let response = daemon
        .router()
        .oneshot(json_request("POST", "/match/clock", json!({ "value": "  " })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = daemon
        .router()
        .oneshot(json_request("POST", "/match/clock", json!({ "value": "67'" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let clock = extract_json(response.into_body()).await;
    assert_eq!(clock["value"], "67'");
    assert_eq!(clock["source"], "External");

    let response = daemon.router().oneshot(test_request("GET", "/status")).await.unwrap();
    let status = extract_json(response.into_body()).await;
    assert_eq!(status["match_clock"]["value"], "67'");
}

#[tokio::test]
async fn test_status_reports_connectivity_and_session() {
    let daemon = TestDaemon::start(None, Some("match-1"));

    let response = daemon.router().oneshot(test_request("GET", "/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let status = extract_json(response.into_body()).await;
    assert_eq!(status["connected"], true);
    assert_eq!(status["auto_play"], true);
    assert_eq!(status["context_id"], "match-1");
    assert_eq!(status["endpoint"], Value::Null);
    assert_eq!(status["queue_length"], 0);
}

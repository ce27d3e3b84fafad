//! In-process commentary source for integration tests
//!
//! Serves `POST /feed` on an ephemeral port. Replies are scripted in order;
//! once the script runs out every request gets an empty event list. Every
//! request body is recorded for inspection.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted reply
#[derive(Debug, Clone)]
pub enum MockReply {
    /// 200 with this JSON body
    Json(Value),
    /// Non-success status with a text body
    Status(u16, String),
    /// 200 with this body after a delay
    Delayed(Duration, Value),
    /// 200 with a non-JSON body
    Garbage(String),
}

#[derive(Default)]
struct MockState {
    script: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<Value>>,
}

/// Running mock source
#[derive(Clone)]
pub struct MockSource {
    pub url: String,
    state: Arc<MockState>,
}

impl MockSource {
    /// Start the mock with a reply script
    pub async fn start(script: Vec<MockReply>) -> Self {
        let state = Arc::new(MockState {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/feed", post(feed))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}/feed", addr),
            state,
        }
    }

    /// Append replies to the script
    pub fn push(&self, reply: MockReply) {
        self.state.script.lock().unwrap().push_back(reply);
    }

    /// Request bodies received so far
    pub fn requests(&self) -> Vec<Value> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }
}

async fn feed(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> axum::response::Response {
    state.requests.lock().unwrap().push(body);
    let reply = state.script.lock().unwrap().pop_front();

    match reply {
        None => Json(json!({ "events": [] })).into_response(),
        Some(MockReply::Json(value)) => Json(value).into_response(),
        Some(MockReply::Status(code, text)) => {
            let status = StatusCode::from_u16(code).unwrap();
            (status, text).into_response()
        }
        Some(MockReply::Delayed(delay, value)) => {
            tokio::time::sleep(delay).await;
            Json(value).into_response()
        }
        Some(MockReply::Garbage(text)) => text.into_response(),
    }
}

/// Events body with `(id, label)` pairs
pub fn events(entries: &[(&str, &str)]) -> Value {
    let events: Vec<Value> = entries
        .iter()
        .map(|(id, label)| json!({ "id": id, "label": label, "body": format!("{} commentary", label) }))
        .collect();
    json!({ "events": events })
}

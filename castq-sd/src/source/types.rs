//! Wire types for the remote commentary source
//!
//! Requests are JSON objects with camelCase keys. Responses are parsed
//! leniently: the body must be a JSON object, but individual malformed events
//! are dropped and the well-formed subset is kept.

use castq_common::{ItemOrigin, Payload, QueueItem};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use super::SourceError;

/// Request discriminator understood by the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestKind {
    Poll,
    Chat,
}

/// Periodic poll request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollRequest {
    pub context_id: String,
    pub request_kind: RequestKind,
    pub last_seen_event_id: Option<String>,
    pub last_stats_snapshot: Option<Value>,
    pub persona: String,
    pub skip_expensive_upstream: bool,
    pub data_provider_selector: String,
    pub credentials: BTreeMap<String, String>,
}

/// Operator chat request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub context_id: String,
    pub last_seen_event_id: Option<String>,
    pub last_stats_snapshot: Option<Value>,
    pub persona: String,
    pub request_kind: RequestKind,
    pub user_message: String,
    pub match_summary: Option<String>,
    pub credentials: BTreeMap<String, String>,
}

/// One commentary event produced by the source
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteEvent {
    /// Accepted as a JSON string or number
    #[serde(deserialize_with = "deserialize_event_id")]
    pub id: String,

    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub body: Option<String>,

    #[serde(default, rename = "audioUrl", alias = "audio_url")]
    pub audio_url: Option<String>,
}

impl RemoteEvent {
    /// Convert into a queued REMOTE item
    pub fn into_queue_item(self) -> QueueItem {
        let label = if self.label.trim().is_empty() {
            "Commentary".to_string()
        } else {
            self.label
        };
        let payload = Payload {
            media_url: self.audio_url.filter(|url| !url.trim().is_empty()),
            text: self.body,
        };
        QueueItem::new(self.id, ItemOrigin::Remote, label, payload)
    }
}

fn deserialize_event_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let id = match Value::deserialize(deserializer)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(serde::de::Error::custom(format!(
                "event id must be a string or number, got {}",
                other
            )))
        }
    };
    if id.is_empty() {
        return Err(serde::de::Error::custom("event id is empty"));
    }
    Ok(id)
}

/// Parsed poll or chat response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceResponse {
    pub events: Vec<RemoteEvent>,

    /// Replaces the session stats snapshot when present
    pub current_stats: Option<Value>,

    /// Match clock hint (e.g. "67:12")
    pub elapsed_time_hint: Option<String>,
}

impl SourceResponse {
    /// Parse a response body
    ///
    /// Fails only when the body is not a JSON object. A missing or non-array
    /// `events` field yields no events.
    pub fn parse(body: &str) -> Result<Self, SourceError> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| SourceError::Decode(e.to_string()))?;
        let Value::Object(mut fields) = value else {
            return Err(SourceError::Decode("response is not a JSON object".to_string()));
        };

        let events = match fields.remove("events") {
            Some(Value::Array(raw)) => raw
                .into_iter()
                .filter_map(|entry| match serde_json::from_value::<RemoteEvent>(entry) {
                    Ok(event) => Some(event),
                    Err(e) => {
                        debug!("Dropping malformed event: {}", e);
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        };

        let current_stats = fields.remove("currentStats").filter(|v| !v.is_null());

        let elapsed_time_hint = match fields.remove("elapsedTimeHint") {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        Ok(Self {
            events,
            current_stats,
            elapsed_time_hint,
        })
    }

    /// Events converted to queue items, in arrival order
    pub fn into_items(self) -> Vec<QueueItem> {
        self.events
            .into_iter()
            .map(RemoteEvent::into_queue_item)
            .collect()
    }
}

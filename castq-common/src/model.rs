//! Queue data model
//!
//! A `QueueItem` is one unit of broadcast: either remote commentary produced by
//! the event source, or media injected by the operator. Items move through
//! `Queued → Active → Done`; at most one item in a queue is `Active`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a queue item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ItemOrigin {
    /// Produced by the remote commentary source (polling or chat)
    Remote,
    /// Injected by the operator (local media file)
    Manual,
}

impl std::fmt::Display for ItemOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemOrigin::Remote => write!(f, "Remote"),
            ItemOrigin::Manual => write!(f, "Manual"),
        }
    }
}

/// Playback state of a queue item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ItemState {
    /// Waiting to be played
    Queued,
    /// Currently airing (at most one per queue)
    Active,
    /// Finished; retained only when explicitly stopped
    Done,
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemState::Queued => write!(f, "Queued"),
            ItemState::Active => write!(f, "Active"),
            ItemState::Done => write!(f, "Done"),
        }
    }
}

/// Content carried by a queue item
///
/// In practice an item carries either media or text, but both may be present.
/// When media is present the playback driver plays it; a text-only item is
/// presented and waits for an explicit acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Playable media reference (URL or locally served path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    /// Inline text body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Payload {
    pub fn media(url: impl Into<String>) -> Self {
        Self {
            media_url: Some(url.into()),
            text: None,
        }
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self {
            media_url: None,
            text: Some(body.into()),
        }
    }

    /// True if the payload references something the media engine can play
    pub fn has_media(&self) -> bool {
        self.media_url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }
}

/// One unit of scheduled output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Opaque identifier, unique among live items of a session
    pub id: String,
    pub origin: ItemOrigin,
    pub payload: Payload,
    /// Short description; also drives priority classification
    pub label: String,
    /// Arrival time (display and audit only)
    pub created_at: DateTime<Utc>,
    pub state: ItemState,
}

impl QueueItem {
    /// Create a new queued item stamped with the current time
    pub fn new(id: impl Into<String>, origin: ItemOrigin, label: impl Into<String>, payload: Payload) -> Self {
        Self {
            id: id.into(),
            origin,
            payload,
            label: label.into(),
            created_at: Utc::now(),
            state: ItemState::Queued,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == ItemState::Active
    }
}

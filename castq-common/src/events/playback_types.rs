//! Playback directive types
//!
//! Directives tell the external media/text engine what to do whenever the
//! active queue item changes.

use serde::{Deserialize, Serialize};

use crate::model::QueueItem;

/// Instruction for the presentation engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlaybackDirective {
    /// Stop whatever is currently playing or displayed
    Stop,
    /// Begin playing the item's media
    StartMedia { item: QueueItem },
    /// Display the item's text and wait for acknowledgement
    PresentText { item: QueueItem },
    /// Nothing is active
    Idle,
}

impl std::fmt::Display for PlaybackDirective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackDirective::Stop => write!(f, "Stop"),
            PlaybackDirective::StartMedia { item } => write!(f, "StartMedia({})", item.id),
            PlaybackDirective::PresentText { item } => write!(f, "PresentText({})", item.id),
            PlaybackDirective::Idle => write!(f, "Idle"),
        }
    }
}

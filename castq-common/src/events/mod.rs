//! Event types for the castq event system
//!
//! Provides shared event definitions and the EventBus used to feed the
//! presentation layer.

mod playback_types;
mod queue_types;
mod shared_types;

pub use playback_types::PlaybackDirective;
pub use queue_types::{QueueChangeTrigger, UserActionType};
pub use shared_types::{ClockSource, MatchClock};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::QueueItem;

/// castq event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
/// The presentation layer and playback engine are passive observers of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CastEvent {
    /// Queue contents or order changed
    ///
    /// Carries the full ordered snapshot so renderers never need to diff.
    QueueChanged {
        /// Ordered queue snapshot after the change
        items: Vec<QueueItem>,
        /// What caused the change
        trigger: QueueChangeTrigger,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The active item changed (None when playback went idle)
    ActiveItemChanged {
        item: Option<QueueItem>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Reachability of the remote event source changed
    ConnectivityChanged {
        reachable: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Auto-play toggled, explicitly or as a side effect of a command
    AutoPlayChanged {
        enabled: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Session switched to a new context; queue and cursor were cleared
    SessionReset {
        context_id: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Match clock updated from a poll hint or an external fetcher
    MatchClockUpdated {
        clock: MatchClock,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A poll failed (diagnostic only)
    SourceFailure {
        reason: String,
        /// Response body for non-success HTTP statuses
        body: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Instruction for the media/text engine
    PlaybackDirective {
        directive: PlaybackDirective,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl CastEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            CastEvent::QueueChanged { .. } => "QueueChanged",
            CastEvent::ActiveItemChanged { .. } => "ActiveItemChanged",
            CastEvent::ConnectivityChanged { .. } => "ConnectivityChanged",
            CastEvent::AutoPlayChanged { .. } => "AutoPlayChanged",
            CastEvent::SessionReset { .. } => "SessionReset",
            CastEvent::MatchClockUpdated { .. } => "MatchClockUpdated",
            CastEvent::SourceFailure { .. } => "SourceFailure",
            CastEvent::PlaybackDirective { .. } => "PlaybackDirective",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block the scheduler)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use castq_common::events::{CastEvent, EventBus};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(CastEvent::ConnectivityChanged {
///     reachable: false,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(matches!(rx.try_recv(), Ok(CastEvent::ConnectivityChanged { reachable: false, .. })));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CastEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events to buffer before lagging subscribers drop old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<CastEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: CastEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

//! Scheduler engine
//!
//! Combines the play queue, deduplication, priority merge and session state
//! into one synchronous state machine. Every method runs to completion
//! without I/O; the owner task serializes calls and publishes the resulting
//! changes.

use castq_common::events::{ClockSource, MatchClock, QueueChangeTrigger, UserActionType};
use castq_common::QueueItem;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use super::dedup;
use super::priority;
use super::queue::PlayQueue;
use super::session::{normalize, SchedulerSession, SessionSettings, SessionTag, SettingsUpdate};
use crate::source::{ChatRequest, PollRequest, RequestKind, SourceError, SourceResponse};

/// Operator command applied by the owner task
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// Stop media now and advance to the next item
    Skip,
    /// Stop playback and disable auto-play
    Stop,
    /// Completion report or text acknowledgement
    ///
    /// With an id, only completes the item if it is the active one.
    Complete { item_id: Option<String> },
    /// Explicitly play an item from any state
    Play(String),
    /// Stop the item if active, keeping it for replay
    StopItem(String),
    Remove(String),
    /// Remove everything except the active item
    Clear,
    Reorder(Vec<String>),
    /// Add a locally stored media item
    InjectManual(QueueItem),
    UpdateSettings(SettingsUpdate),
    /// Switch broadcast context, discarding the session
    ResetContext(Option<String>),
}

impl UserCommand {
    pub fn action_type(&self) -> UserActionType {
        match self {
            UserCommand::Skip => UserActionType::Skip,
            UserCommand::Stop => UserActionType::Stop,
            UserCommand::Complete { .. } => UserActionType::Acknowledge,
            UserCommand::Play(_) => UserActionType::Play,
            UserCommand::StopItem(_) => UserActionType::StopItem,
            UserCommand::Remove(_) => UserActionType::Remove,
            UserCommand::Clear => UserActionType::Clear,
            UserCommand::Reorder(_) => UserActionType::Reorder,
            UserCommand::InjectManual(_) => UserActionType::ManualInject,
            UserCommand::UpdateSettings(_) => UserActionType::SettingsChange,
            UserCommand::ResetContext(_) => UserActionType::ContextReset,
        }
    }

    /// Trigger reported with the resulting queue change
    pub fn trigger(&self) -> QueueChangeTrigger {
        match self {
            UserCommand::Complete { .. } => QueueChangeTrigger::Completion,
            UserCommand::InjectManual(_) => QueueChangeTrigger::ManualInject,
            UserCommand::ResetContext(_) => QueueChangeTrigger::ContextReset,
            _ => QueueChangeTrigger::UserCommand,
        }
    }
}

/// A poll the owner handed out; the request runs outside the owner
#[derive(Debug, Clone)]
pub struct PollTicket {
    pub tag: SessionTag,
    pub sequence: u64,
    pub endpoint: String,
    pub request: PollRequest,
}

/// A chat request the owner handed out
#[derive(Debug, Clone)]
pub struct ChatTicket {
    pub tag: SessionTag,
    pub endpoint: String,
    pub request: ChatRequest,
}

/// Result of applying a poll outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollApplied {
    /// Response merged; `accepted` new events entered the queue
    Merged { accepted: usize },
    /// Poll failed; connectivity is down
    Failed { reason: String, body: Option<String> },
    /// Result belonged to a previous session and was ignored
    Stale,
}

/// The active item together with its activation number
///
/// Two slots with the same item but different activations mean the item was
/// restarted.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSlot {
    pub activation: u64,
    pub item: QueueItem,
}

/// Summary served by `GET /status`
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub connected: bool,
    pub auto_play: bool,
    pub session_tag: u64,
    pub context_id: Option<String>,
    pub last_seen_event_id: Option<String>,
    pub poll_sequence: u64,
    pub endpoint: Option<String>,
    pub persona: String,
    pub data_provider: String,
    pub credential_keys: Vec<String>,
    pub active_item_id: Option<String>,
    pub queue_length: usize,
    pub match_clock: Option<MatchClock>,
}

/// Single-owner scheduler state
#[derive(Debug, Clone)]
pub struct Scheduler {
    queue: PlayQueue,
    session: SchedulerSession,
    settings: SessionSettings,
    connected: bool,
    match_clock: Option<MatchClock>,
}

impl Scheduler {
    /// Create a scheduler for `context_id` (polling idles while it is unset)
    pub fn new(settings: SessionSettings, context_id: Option<String>) -> Self {
        Self {
            queue: PlayQueue::new(),
            session: SchedulerSession::new(context_id),
            settings,
            connected: true,
            match_clock: None,
        }
    }

    // ========================================
    // Accessors
    // ========================================

    pub fn items(&self) -> &[QueueItem] {
        self.queue.items()
    }

    pub fn queue(&self) -> &PlayQueue {
        &self.queue
    }

    pub fn active(&self) -> Option<&QueueItem> {
        self.queue.active()
    }

    pub fn active_slot(&self) -> Option<ActiveSlot> {
        self.queue.active().map(|item| ActiveSlot {
            activation: self.queue.activation(),
            item: item.clone(),
        })
    }

    pub fn auto_play(&self) -> bool {
        self.settings.auto_play
    }

    /// Last known reachability of the event source
    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn session(&self) -> &SchedulerSession {
        &self.session
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn tag(&self) -> SessionTag {
        self.session.tag()
    }

    pub fn match_clock(&self) -> Option<&MatchClock> {
        self.match_clock.as_ref()
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            connected: self.connected,
            auto_play: self.settings.auto_play,
            session_tag: self.session.tag().value(),
            context_id: self.session.context_id.clone(),
            last_seen_event_id: self.session.last_seen_event_id.clone(),
            poll_sequence: self.session.poll_sequence,
            endpoint: self.settings.endpoint.clone(),
            persona: self.settings.persona.clone(),
            data_provider: self.settings.data_provider.clone(),
            credential_keys: self.settings.credentials.keys().cloned().collect(),
            active_item_id: self.queue.active().map(|item| item.id.clone()),
            queue_length: self.queue.len(),
            match_clock: self.match_clock.clone(),
        }
    }

    // ========================================
    // Event source
    // ========================================

    fn source_target(&self) -> Result<(String, String), SourceError> {
        let endpoint = self
            .settings
            .endpoint
            .clone()
            .ok_or_else(|| SourceError::NotConfigured("no endpoint".to_string()))?;
        let context_id = self
            .session
            .context_id
            .clone()
            .ok_or_else(|| SourceError::NotConfigured("no context id".to_string()))?;
        Ok((endpoint, context_id))
    }

    /// Hand out the next poll, or None while endpoint or context is missing
    ///
    /// Counts the attempt: the first poll of a session is cheap, and every
    /// `full_poll_every`-th poll asks for a full upstream refresh.
    pub fn begin_poll(&mut self) -> Option<PollTicket> {
        let (endpoint, context_id) = self.source_target().ok()?;
        let sequence = self.session.next_sequence();
        let skip_expensive_upstream = sequence % self.settings.full_poll_every.max(1) != 0;

        Some(PollTicket {
            tag: self.session.tag(),
            sequence,
            endpoint,
            request: PollRequest {
                context_id,
                request_kind: RequestKind::Poll,
                last_seen_event_id: self.session.last_seen_event_id.clone(),
                last_stats_snapshot: self.session.last_stats_snapshot.clone(),
                persona: self.settings.persona.clone(),
                skip_expensive_upstream,
                data_provider_selector: self.settings.data_provider.clone(),
                credentials: self.settings.credentials.clone(),
            },
        })
    }

    /// Apply a finished poll
    ///
    /// Failures only mark connectivity down; the queue, cursor and session
    /// are untouched. Results from an older session are ignored entirely.
    pub fn apply_poll(&mut self, tag: SessionTag, result: Result<SourceResponse, SourceError>) -> PollApplied {
        if tag != self.session.tag() {
            debug!(%tag, current = %self.session.tag(), "Ignoring stale poll result");
            return PollApplied::Stale;
        }

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.connected = false;
                return PollApplied::Failed {
                    reason: e.to_string(),
                    body: e.body().map(str::to_string),
                };
            }
        };

        self.connected = true;
        if let Some(stats) = response.current_stats.clone() {
            self.session.last_stats_snapshot = Some(stats);
        }
        if let Some(hint) = response.elapsed_time_hint.clone() {
            self.set_match_clock(hint, ClockSource::PollHint);
        }

        let candidates = response.into_items();
        let accepted = dedup::accept_new(candidates, &self.queue, &mut self.session.last_seen_event_id);
        let count = accepted.len();
        if count > 0 {
            let (priority, normal) = priority::partition(accepted);
            debug!(priority = priority.len(), normal = normal.len(), "Merging poll batch");
            if self.queue.merge(priority, normal, self.settings.auto_play) {
                self.settings.auto_play = true;
            }
        }
        PollApplied::Merged { accepted: count }
    }

    /// Hand out a chat request for the operator's message
    pub fn begin_chat(&self, message: String, match_summary: Option<String>) -> Result<ChatTicket, SourceError> {
        let (endpoint, context_id) = self.source_target()?;
        Ok(ChatTicket {
            tag: self.session.tag(),
            endpoint,
            request: ChatRequest {
                context_id,
                last_seen_event_id: self.session.last_seen_event_id.clone(),
                last_stats_snapshot: self.session.last_stats_snapshot.clone(),
                persona: self.settings.persona.clone(),
                request_kind: RequestKind::Chat,
                user_message: message,
                match_summary,
                credentials: self.settings.credentials.clone(),
            },
        })
    }

    /// Insert a chat response at the front of the waiting items
    ///
    /// Returns the number of accepted events, or None for a stale session.
    pub fn apply_chat(&mut self, tag: SessionTag, response: SourceResponse) -> Option<usize> {
        if tag != self.session.tag() {
            debug!(%tag, "Ignoring stale chat result");
            return None;
        }
        let accepted = dedup::accept_new(
            response.into_items(),
            &self.queue,
            &mut self.session.last_seen_event_id,
        );
        let count = accepted.len();
        if count > 0 {
            self.settings.auto_play = true;
            self.queue.merge(accepted, Vec::new(), true);
        }
        Some(count)
    }

    /// Replace the stats snapshot forwarded with each poll
    pub fn set_stats_snapshot(&mut self, snapshot: serde_json::Value) {
        self.session.last_stats_snapshot = Some(snapshot).filter(|v| !v.is_null());
    }

    /// Record a match clock reading; the most recent write wins
    pub fn set_match_clock(&mut self, value: String, source: ClockSource) {
        self.match_clock = Some(MatchClock {
            value,
            source,
            updated_at: Utc::now(),
        });
    }

    // ========================================
    // Commands
    // ========================================

    /// Apply an operator command
    ///
    /// Commands naming an absent item are no-ops.
    pub fn execute(&mut self, command: UserCommand) {
        match command {
            UserCommand::Skip => {
                self.settings.auto_play = true;
                self.queue.finish_active();
                self.queue.promote_head();
            }
            UserCommand::Stop => {
                self.queue.finish_active();
                self.settings.auto_play = false;
            }
            UserCommand::Complete { item_id } => {
                let is_active = match (&item_id, self.queue.active()) {
                    (_, None) => false,
                    (None, Some(_)) => true,
                    (Some(id), Some(active)) => &active.id == id,
                };
                if !is_active {
                    debug!(?item_id, "Completion for non-active item ignored");
                    return;
                }
                self.finish_and_advance();
            }
            UserCommand::Play(id) => {
                if self.queue.play(&id) {
                    self.settings.auto_play = true;
                }
            }
            UserCommand::StopItem(id) => {
                if self.queue.active().is_some_and(|active| active.id == id) {
                    self.queue.retain_active_as_done();
                }
            }
            UserCommand::Remove(id) => {
                if let Some(removed) = self.queue.remove(&id) {
                    if removed.is_active() && self.settings.auto_play {
                        self.queue.promote_head();
                    }
                }
            }
            UserCommand::Clear => {
                self.queue.clear_waiting();
            }
            UserCommand::Reorder(order) => self.queue.reorder(&order),
            UserCommand::InjectManual(item) => {
                self.settings.auto_play = true;
                self.queue.merge(vec![item], Vec::new(), true);
            }
            UserCommand::UpdateSettings(update) => {
                let was_auto_play = self.settings.auto_play;
                if !self.settings.apply(update) {
                    return;
                }
                debug!(auto_play = self.settings.auto_play, "Settings updated");
                if !was_auto_play && self.settings.auto_play {
                    self.queue.promote_head();
                }
            }
            UserCommand::ResetContext(context_id) => {
                let context_id = normalize(context_id);
                info!(
                    from = ?self.session.context_id,
                    to = ?context_id,
                    "Switching broadcast context"
                );
                self.session.reset(context_id);
                self.queue.clear();
                self.match_clock = None;
            }
        }
    }

    fn finish_and_advance(&mut self) {
        self.queue.finish_active();
        if self.settings.auto_play {
            self.queue.promote_head();
        }
    }
}

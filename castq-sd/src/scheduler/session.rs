//! Broadcast session state and operator settings
//!
//! A session lives for one broadcast context (match). Switching context
//! discards it and starts a new one with a fresh tag; network results that
//! carry an older tag are ignored by the scheduler.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use castq_common::config::TomlConfig;

/// Identifies one session; changes on every context reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionTag(u64);

impl SessionTag {
    pub fn value(&self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        SessionTag(self.0 + 1)
    }
}

impl std::fmt::Display for SessionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Per-context poll state, zeroed on context reset
#[derive(Debug, Clone, Default)]
pub struct SchedulerSession {
    tag: SessionTag,

    /// Context (match) being broadcast; polling idles while unset
    pub context_id: Option<String>,

    /// Id of the most recently accepted remote event
    pub last_seen_event_id: Option<String>,

    /// Opaque stats payload echoed back to the source on every poll
    pub last_stats_snapshot: Option<serde_json::Value>,

    /// Poll attempts in this session (unconfigured retries are not counted)
    pub poll_sequence: u64,
}

impl SchedulerSession {
    pub fn new(context_id: Option<String>) -> Self {
        Self {
            context_id: normalize(context_id),
            ..Self::default()
        }
    }

    pub fn tag(&self) -> SessionTag {
        self.tag
    }

    /// Discard this session and start a new one for `context_id`
    pub fn reset(&mut self, context_id: Option<String>) {
        let tag = self.tag.next();
        *self = Self {
            tag,
            ..Self::new(context_id)
        };
    }

    /// Count a poll attempt; returns the new sequence number (first is 1)
    pub fn next_sequence(&mut self) -> u64 {
        self.poll_sequence += 1;
        self.poll_sequence
    }
}

/// Operator-tunable settings; survive context resets
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Remote commentary endpoint
    pub endpoint: Option<String>,
    pub persona: String,
    pub data_provider: String,
    pub credentials: BTreeMap<String, String>,
    pub auto_play: bool,

    /// Every Nth poll requests a full upstream refresh
    pub full_poll_every: u64,
}

impl SessionSettings {
    /// Initial settings from the bootstrap configuration
    pub fn from_config(config: &TomlConfig) -> Self {
        Self {
            endpoint: normalize(config.source.endpoint.clone()),
            persona: config.session.persona.clone(),
            data_provider: config.session.data_provider.clone(),
            credentials: config.session.credentials.clone(),
            auto_play: config.session.auto_play,
            full_poll_every: config.source.full_poll_every.max(1),
        }
    }

    /// Apply a partial update; returns true if anything changed
    pub fn apply(&mut self, update: SettingsUpdate) -> bool {
        let before = self.clone();
        if let Some(endpoint) = update.endpoint {
            self.endpoint = normalize(Some(endpoint));
        }
        if let Some(persona) = update.persona {
            self.persona = persona;
        }
        if let Some(data_provider) = update.data_provider {
            self.data_provider = data_provider;
        }
        if let Some(credentials) = update.credentials {
            self.credentials = credentials;
        }
        if let Some(auto_play) = update.auto_play {
            self.auto_play = auto_play;
        }
        *self != before
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&TomlConfig::compiled_defaults())
    }
}

/// Partial settings mutation (`POST /settings`)
///
/// Absent fields are left unchanged; an empty `endpoint` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default)]
    pub auto_play: Option<bool>,
    #[serde(default)]
    pub persona: Option<String>,
    #[serde(default)]
    pub data_provider: Option<String>,
    #[serde(default)]
    pub credentials: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Treat blank strings as unset
pub(crate) fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

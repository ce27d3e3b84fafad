//! Queue and user action type definitions
//!
//! Supporting types for queue management and operator interactions.

use serde::{Deserialize, Serialize};

/// Operator actions arriving through the command surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum UserActionType {
    Skip,
    Stop,
    Play,
    StopItem,
    Remove,
    Clear,
    Reorder,
    ManualInject,
    ChatInject,
    Acknowledge,
    SettingsChange,
    ContextReset,
}

impl std::fmt::Display for UserActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserActionType::Skip => write!(f, "Skip"),
            UserActionType::Stop => write!(f, "Stop"),
            UserActionType::Play => write!(f, "Play"),
            UserActionType::StopItem => write!(f, "StopItem"),
            UserActionType::Remove => write!(f, "Remove"),
            UserActionType::Clear => write!(f, "Clear"),
            UserActionType::Reorder => write!(f, "Reorder"),
            UserActionType::ManualInject => write!(f, "ManualInject"),
            UserActionType::ChatInject => write!(f, "ChatInject"),
            UserActionType::Acknowledge => write!(f, "Acknowledge"),
            UserActionType::SettingsChange => write!(f, "SettingsChange"),
            UserActionType::ContextReset => write!(f, "ContextReset"),
        }
    }
}

/// Why the queue changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum QueueChangeTrigger {
    /// New events merged from a poll
    PollMerge,
    /// Events merged from a direct chat request
    ChatInject,
    /// Operator injected local media
    ManualInject,
    /// Natural end of playback or text acknowledgement
    Completion,
    /// Any other operator command
    UserCommand,
    /// Session switched to a new context
    ContextReset,
}

impl std::fmt::Display for QueueChangeTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueChangeTrigger::PollMerge => write!(f, "PollMerge"),
            QueueChangeTrigger::ChatInject => write!(f, "ChatInject"),
            QueueChangeTrigger::ManualInject => write!(f, "ManualInject"),
            QueueChangeTrigger::Completion => write!(f, "Completion"),
            QueueChangeTrigger::UserCommand => write!(f, "UserCommand"),
            QueueChangeTrigger::ContextReset => write!(f, "ContextReset"),
        }
    }
}

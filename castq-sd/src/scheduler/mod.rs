//! Broadcast scheduler
//!
//! - `queue`: play queue and single-active state machine
//! - `dedup`: remote event deduplication against queue and cursor
//! - `priority`: keyword classification of incoming events
//! - `session`: per-context poll state and operator settings
//! - `engine`: synchronous scheduler combining the above
//! - `handle`: owner task serializing all access to the engine

pub mod dedup;
pub mod engine;
pub mod handle;
pub mod priority;
pub mod queue;
pub mod session;

pub use engine::{
    ActiveSlot, ChatTicket, PollApplied, PollTicket, Scheduler, SchedulerStatus, UserCommand,
};
pub use handle::{spawn, SchedulerHandle};
pub use queue::PlayQueue;
pub use session::{SchedulerSession, SessionSettings, SessionTag, SettingsUpdate};

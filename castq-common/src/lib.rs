//! # castq Common Library
//!
//! Shared code for the castq broadcast scheduler:
//! - Queue data model (QueueItem and its state machine states)
//! - Event types (CastEvent enum) and the EventBus
//! - Bootstrap configuration loading
//! - SSE stream helpers

pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod sse;

pub use error::{Error, Result};
pub use model::{ItemOrigin, ItemState, Payload, QueueItem};

//! HTTP command surface
//!
//! Every mutating endpoint forwards a command to the scheduler owner and
//! returns the resulting queue. Commands naming an absent item succeed with
//! the queue unchanged.

pub mod handlers;
pub mod health;
pub mod inject;
pub mod sse;

pub use handlers::*;
pub use health::{get_build_info, health_check, health_routes};
pub use inject::{inject_chat, inject_manual};
pub use sse::event_stream;

//! Remote commentary source
//!
//! - `types`: request/response wire format
//! - `client`: HTTP client with hard request timeout
//! - `poller`: fixed-cadence poll loop feeding the scheduler

pub mod client;
pub mod poller;
pub mod types;

pub use client::{EventSourceClient, SourceError};
pub use poller::Poller;
pub use types::{ChatRequest, PollRequest, RemoteEvent, RequestKind, SourceResponse};

//! Server-Sent Events (SSE) utilities
//!
//! Turns an EventBus subscription into an axum SSE response.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

use crate::events::{CastEvent, EventBus};

/// Keep-alive interval for all castq SSE streams
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Convert a CastEvent into an SSE frame (`event:` = variant name, `data:` = JSON)
pub fn to_sse_event(event: &CastEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event(event.event_type()).data(json)),
        Err(e) => {
            warn!("Failed to serialize event: {}", e);
            None
        }
    }
}

/// Create an SSE response streaming every event emitted on `bus`
///
/// The first frame is a `ConnectionStatus` event so clients can show
/// "connected" before any domain event arrives. Lagged subscribers skip the
/// events they missed and continue.
pub fn event_bus_stream(
    bus: &EventBus,
    service_name: &'static str,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = bus.subscribe();
    info!(
        subscribers = bus.subscriber_count(),
        "New SSE client connected to {} events", service_name
    );

    let events = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => {
                debug!("Broadcasting SSE event: {}", event.event_type());
                to_sse_event(&event).map(Ok)
            }
            Err(e) => {
                warn!("SSE stream error: {:?}", e);
                None
            }
        }
    });

    let hello = futures::stream::once(async {
        Ok::<_, Infallible>(Event::default().event("ConnectionStatus").data("connected"))
    });

    Sse::new(hello.chain(events)).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}

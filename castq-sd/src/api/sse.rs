//! Server-Sent Events endpoint for the presentation layer

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::AppContext;

/// GET /events
///
/// Streams every `CastEvent` (queue snapshots, active item, connectivity,
/// playback directives, ...) with a 15 s keep-alive.
pub async fn event_stream(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    castq_common::sse::event_bus_stream(&ctx.bus, "castq-sd")
}

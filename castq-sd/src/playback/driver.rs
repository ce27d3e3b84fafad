//! Playback driver
//!
//! Watches the scheduler's active slot and tells a `PlaybackSink` what to do
//! on every change: stop first, then start media after the settle delay,
//! present text immediately (it waits for an acknowledgement), or go idle.
//! A media start is dropped if the active slot changed during the delay.

use async_trait::async_trait;
use castq_common::events::{CastEvent, EventBus, PlaybackDirective};
use castq_common::QueueItem;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::scheduler::ActiveSlot;

/// Media/text presentation engine
#[async_trait]
pub trait PlaybackSink: Send + Sync {
    /// Stop whatever is playing or displayed
    async fn stop(&self);

    async fn start_media(&self, item: &QueueItem);

    async fn present_text(&self, item: &QueueItem);

    /// Nothing is active
    async fn idle(&self);
}

/// Sink that publishes directives on the EventBus for external renderers
#[derive(Clone)]
pub struct EventSink {
    bus: EventBus,
}

impl EventSink {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    fn send(&self, directive: PlaybackDirective) {
        debug!("Playback directive: {}", directive);
        self.bus.emit_lossy(CastEvent::PlaybackDirective {
            directive,
            timestamp: Utc::now(),
        });
    }
}

#[async_trait]
impl PlaybackSink for EventSink {
    async fn stop(&self) {
        self.send(PlaybackDirective::Stop);
    }

    async fn start_media(&self, item: &QueueItem) {
        self.send(PlaybackDirective::StartMedia { item: item.clone() });
    }

    async fn present_text(&self, item: &QueueItem) {
        self.send(PlaybackDirective::PresentText { item: item.clone() });
    }

    async fn idle(&self) {
        self.send(PlaybackDirective::Idle);
    }
}

/// Drives a sink from the active-slot watch channel
pub struct PlaybackDriver<S: PlaybackSink> {
    sink: Arc<S>,
    active_rx: watch::Receiver<Option<ActiveSlot>>,
    settle_delay: Duration,
}

impl<S: PlaybackSink + 'static> PlaybackDriver<S> {
    pub fn new(sink: Arc<S>, active_rx: watch::Receiver<Option<ActiveSlot>>, settle_delay: Duration) -> Self {
        Self {
            sink,
            active_rx,
            settle_delay,
        }
    }

    /// Run until the scheduler owner drops its watch sender
    pub async fn run(mut self) {
        info!(settle_delay_ms = self.settle_delay.as_millis() as u64, "Playback driver started");

        while self.active_rx.changed().await.is_ok() {
            let slot = self.active_rx.borrow_and_update().clone();
            self.sink.stop().await;

            let Some(slot) = slot else {
                self.sink.idle().await;
                continue;
            };

            if !slot.item.payload.has_media() {
                self.sink.present_text(&slot.item).await;
                continue;
            }

            if !self.settle_delay.is_zero() {
                tokio::time::sleep(self.settle_delay).await;
            }
            // A newer activation supersedes this one; the loop picks it up
            if self.active_rx.has_changed().unwrap_or(true) {
                debug!(item_id = %slot.item.id, "Active item changed during settle delay, not starting");
                continue;
            }
            self.sink.start_media(&slot.item).await;
        }

        info!("Playback driver stopped");
    }
}

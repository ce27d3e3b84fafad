//! Scheduler owner task
//!
//! The `Scheduler` is owned by a single task that drains an mpsc mailbox.
//! Each command runs to completion before the next is taken, so poll merges
//! and operator commands never interleave. Network calls happen in the
//! caller (poll loop or HTTP handler) between a `begin_*` and an `apply_*`
//! command; the session tag carried across that gap lets the owner discard
//! results from a session that was reset in the meantime.
//!
//! After every command the owner compares the observable state before and
//! after and publishes the differences:
//! - `CastEvent`s on the EventBus (queue, active item, auto-play, ...)
//! - the active slot on a `watch` channel for the playback driver
//! - uploads of manual items that left the queue to the `MediaStore`

use castq_common::events::{
    CastEvent, ClockSource, EventBus, MatchClock, QueueChangeTrigger, UserActionType,
};
use castq_common::QueueItem;
use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::engine::{ActiveSlot, PollApplied, PollTicket, Scheduler, SchedulerStatus, UserCommand};
use super::session::SessionTag;
use crate::error::{Error, Result};
use crate::media::MediaStore;
use crate::source::{EventSourceClient, SourceError, SourceResponse};

/// Mailbox depth; senders wait when the owner falls behind
const MAILBOX_CAPACITY: usize = 64;

enum Command {
    Execute {
        command: UserCommand,
        reply: oneshot::Sender<Vec<QueueItem>>,
    },
    Queue {
        reply: oneshot::Sender<Vec<QueueItem>>,
    },
    Status {
        reply: oneshot::Sender<SchedulerStatus>,
    },
    BeginPoll {
        reply: oneshot::Sender<Option<PollTicket>>,
    },
    ApplyPoll {
        tag: SessionTag,
        result: std::result::Result<SourceResponse, SourceError>,
        reply: oneshot::Sender<PollApplied>,
    },
    BeginChat {
        message: String,
        match_summary: Option<String>,
        reply: oneshot::Sender<std::result::Result<super::engine::ChatTicket, SourceError>>,
    },
    ApplyChat {
        tag: SessionTag,
        response: SourceResponse,
        reply: oneshot::Sender<Option<usize>>,
    },
    SetStats {
        snapshot: serde_json::Value,
        reply: oneshot::Sender<()>,
    },
    SetMatchClock {
        value: String,
        reply: oneshot::Sender<MatchClock>,
    },
}

/// Cloneable handle to the owner task
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<Command>,
    active_rx: watch::Receiver<Option<ActiveSlot>>,
}

impl SchedulerHandle {
    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| Error::SchedulerUnavailable)?;
        rx.await.map_err(|_| Error::SchedulerUnavailable)
    }

    /// Apply an operator command; returns the queue afterwards
    pub async fn execute(&self, command: UserCommand) -> Result<Vec<QueueItem>> {
        self.request(|reply| Command::Execute { command, reply }).await
    }

    /// Ordered queue snapshot
    pub async fn queue(&self) -> Result<Vec<QueueItem>> {
        self.request(|reply| Command::Queue { reply }).await
    }

    pub async fn status(&self) -> Result<SchedulerStatus> {
        self.request(|reply| Command::Status { reply }).await
    }

    /// Next poll to run, or None while the source is unconfigured
    pub async fn begin_poll(&self) -> Result<Option<PollTicket>> {
        self.request(|reply| Command::BeginPoll { reply }).await
    }

    pub async fn apply_poll(
        &self,
        tag: SessionTag,
        result: std::result::Result<SourceResponse, SourceError>,
    ) -> Result<PollApplied> {
        self.request(|reply| Command::ApplyPoll { tag, result, reply }).await
    }

    /// Send an operator message to the source and queue the reply
    ///
    /// Returns the number of new items. The request itself runs on the
    /// caller's task; a failure leaves the queue and connectivity untouched.
    pub async fn chat(
        &self,
        client: &EventSourceClient,
        message: String,
        match_summary: Option<String>,
    ) -> Result<usize> {
        let ticket = self
            .request(|reply| Command::BeginChat {
                message,
                match_summary,
                reply,
            })
            .await??;

        let response = client.chat(&ticket.endpoint, &ticket.request).await?;
        let tag = ticket.tag;
        let accepted = self
            .request(|reply| Command::ApplyChat { tag, response, reply })
            .await?;
        Ok(accepted.unwrap_or(0))
    }

    /// Replace the stats snapshot forwarded with each poll
    pub async fn set_stats_snapshot(&self, snapshot: serde_json::Value) -> Result<()> {
        self.request(|reply| Command::SetStats { snapshot, reply }).await
    }

    /// Record an externally fetched match clock
    pub async fn set_match_clock(&self, value: String) -> Result<MatchClock> {
        self.request(|reply| Command::SetMatchClock { value, reply }).await
    }

    /// Subscribe to active-item changes
    pub fn active_watch(&self) -> watch::Receiver<Option<ActiveSlot>> {
        self.active_rx.clone()
    }
}

/// Observable state compared before and after each command
#[derive(PartialEq)]
struct Observed {
    tag: SessionTag,
    items: Vec<QueueItem>,
    active: Option<(u64, String)>,
    auto_play: bool,
    connected: bool,
    clock: Option<MatchClock>,
}

impl Observed {
    fn of(scheduler: &Scheduler) -> Self {
        Self {
            tag: scheduler.tag(),
            items: scheduler.items().to_vec(),
            active: scheduler
                .active_slot()
                .map(|slot| (slot.activation, slot.item.id)),
            auto_play: scheduler.auto_play(),
            connected: scheduler.connected(),
            clock: scheduler.match_clock().cloned(),
        }
    }
}

struct SchedulerOwner {
    scheduler: Scheduler,
    bus: EventBus,
    media: MediaStore,
    active_tx: watch::Sender<Option<ActiveSlot>>,
    rx: mpsc::Receiver<Command>,
}

impl SchedulerOwner {
    async fn run(mut self) {
        info!("Scheduler owner started");
        while let Some(command) = self.rx.recv().await {
            self.handle(command);
        }
        info!("Scheduler owner stopped (all handles dropped)");
    }

    fn handle(&mut self, command: Command) {
        match command {
            // Read-only and unobserved commands
            Command::Queue { reply } => {
                let _ = reply.send(self.scheduler.items().to_vec());
            }
            Command::Status { reply } => {
                let _ = reply.send(self.scheduler.status());
            }
            Command::BeginPoll { reply } => {
                let _ = reply.send(self.scheduler.begin_poll());
            }
            Command::BeginChat {
                message,
                match_summary,
                reply,
            } => {
                let _ = reply.send(self.scheduler.begin_chat(message, match_summary));
            }
            Command::SetStats { snapshot, reply } => {
                self.scheduler.set_stats_snapshot(snapshot);
                let _ = reply.send(());
            }

            // Mutations: diff and publish
            Command::Execute { command, reply } => {
                info!("User action: {}", command.action_type());
                let trigger = command.trigger();
                let before = Observed::of(&self.scheduler);
                self.scheduler.execute(command);
                let _ = reply.send(self.scheduler.items().to_vec());
                self.publish(before, trigger);
            }
            Command::ApplyPoll { tag, result, reply } => {
                let before = Observed::of(&self.scheduler);
                let applied = self.scheduler.apply_poll(tag, result);
                match &applied {
                    PollApplied::Merged { accepted } if *accepted > 0 => {
                        info!(accepted, "Merged new commentary events");
                    }
                    PollApplied::Failed { reason, body } => {
                        self.bus.emit_lossy(CastEvent::SourceFailure {
                            reason: reason.clone(),
                            body: body.clone(),
                            timestamp: Utc::now(),
                        });
                    }
                    _ => {}
                }
                let _ = reply.send(applied);
                self.publish(before, QueueChangeTrigger::PollMerge);
            }
            Command::ApplyChat { tag, response, reply } => {
                let before = Observed::of(&self.scheduler);
                let accepted = self.scheduler.apply_chat(tag, response);
                info!("User action: {} ({:?} accepted)", UserActionType::ChatInject, accepted);
                let _ = reply.send(accepted);
                self.publish(before, QueueChangeTrigger::ChatInject);
            }
            Command::SetMatchClock { value, reply } => {
                let before = Observed::of(&self.scheduler);
                self.scheduler.set_match_clock(value, ClockSource::External);
                if let Some(clock) = self.scheduler.match_clock() {
                    let _ = reply.send(clock.clone());
                }
                self.publish(before, QueueChangeTrigger::UserCommand);
            }
        }
    }

    fn publish(&self, before: Observed, trigger: QueueChangeTrigger) {
        let after = Observed::of(&self.scheduler);
        if after == before {
            return;
        }
        let timestamp = Utc::now();

        if after.tag != before.tag {
            self.bus.emit_lossy(CastEvent::SessionReset {
                context_id: self.scheduler.session().context_id.clone(),
                timestamp,
            });
        }

        if after.items != before.items {
            debug!(%trigger, len = after.items.len(), "Queue changed");
            self.bus.emit_lossy(CastEvent::QueueChanged {
                items: after.items.clone(),
                trigger,
                timestamp,
            });
        }

        if after.active != before.active {
            let slot = self.scheduler.active_slot();
            self.bus.emit_lossy(CastEvent::ActiveItemChanged {
                item: slot.as_ref().map(|s| s.item.clone()),
                timestamp,
            });
            self.active_tx.send_replace(slot);
        }

        if after.auto_play != before.auto_play {
            self.bus.emit_lossy(CastEvent::AutoPlayChanged {
                enabled: after.auto_play,
                timestamp,
            });
        }

        if after.connected != before.connected {
            if after.connected {
                info!("Event source reachable again");
            } else {
                warn!("Event source unreachable");
            }
            self.bus.emit_lossy(CastEvent::ConnectivityChanged {
                reachable: after.connected,
                timestamp,
            });
        }

        if after.clock != before.clock {
            if let Some(clock) = after.clock.clone() {
                self.bus.emit_lossy(CastEvent::MatchClockUpdated { clock, timestamp });
            }
        }

        // Free the uploads of items that left the queue
        if after.items != before.items {
            let departed: Vec<QueueItem> = before
                .items
                .into_iter()
                .filter(|item| !after.items.iter().any(|kept| kept.id == item.id))
                .collect();
            self.media.release(departed);
        }
    }
}

/// Spawn the owner task for `scheduler`
///
/// `media` receives the uploads of manual items that leave the queue. The
/// task ends when every `SchedulerHandle` has been dropped.
pub fn spawn(scheduler: Scheduler, bus: EventBus, media: MediaStore) -> (SchedulerHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
    let (active_tx, active_rx) = watch::channel(scheduler.active_slot());

    let owner = SchedulerOwner {
        scheduler,
        bus,
        media,
        active_tx,
        rx,
    };
    let task = tokio::spawn(owner.run());

    (SchedulerHandle { tx, active_rx }, task)
}

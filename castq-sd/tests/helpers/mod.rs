//! Shared helpers for castq-sd integration tests

#![allow(dead_code)]

pub mod mock_source;

use castq_common::events::EventBus;
use castq_sd::media::MediaStore;
use castq_sd::scheduler::{self, Scheduler, SchedulerHandle, SessionSettings};
use castq_sd::source::{EventSourceClient, Poller};
use castq_sd::{build_router, AppContext};
use std::future::Future;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// Poll interval used by integration tests
pub const TEST_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A scheduler owner (and optionally a poll loop) wired to an EventBus
pub struct TestDaemon {
    pub handle: SchedulerHandle,
    pub bus: EventBus,
    pub client: EventSourceClient,
    pub media_dir: TempDir,
    poll_task: Option<JoinHandle<()>>,
}

impl TestDaemon {
    /// Owner only; no poll loop
    pub fn start(endpoint: Option<&str>, context_id: Option<&str>) -> Self {
        Self::build(endpoint, context_id, Duration::from_secs(2))
    }

    /// Owner plus a running poll loop
    pub fn start_polling(endpoint: Option<&str>, context_id: Option<&str>, timeout: Duration) -> Self {
        let mut daemon = Self::build(endpoint, context_id, timeout);
        daemon.spawn_poller(timeout);
        daemon
    }

    /// Start the poll loop with its own client (subscribe to the bus first
    /// to observe the very first poll)
    pub fn spawn_poller(&mut self, timeout: Duration) {
        let poller = Poller::new(
            self.handle.clone(),
            EventSourceClient::new(timeout).unwrap(),
            TEST_POLL_INTERVAL,
            Duration::from_millis(10),
        );
        self.poll_task = Some(tokio::spawn(poller.run()));
    }

    fn build(endpoint: Option<&str>, context_id: Option<&str>, timeout: Duration) -> Self {
        let settings = SessionSettings {
            endpoint: endpoint.map(str::to_string),
            ..SessionSettings::default()
        };
        let bus = EventBus::new(256);
        let media_dir = tempfile::tempdir().unwrap();
        let (handle, _owner) = scheduler::spawn(
            Scheduler::new(settings, context_id.map(str::to_string)),
            bus.clone(),
            MediaStore::new(media_dir.path()),
        );
        Self {
            handle,
            bus,
            client: EventSourceClient::new(timeout).unwrap(),
            media_dir,
            poll_task: None,
        }
    }

    /// HTTP router over this daemon
    pub fn router(&self) -> axum::Router {
        build_router(AppContext {
            scheduler: self.handle.clone(),
            client: self.client.clone(),
            bus: self.bus.clone(),
            media: MediaStore::new(self.media_dir.path()),
        })
    }

    /// Current queue ids in order
    pub async fn queue_ids(&self) -> Vec<String> {
        self.handle
            .queue()
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.id)
            .collect()
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }
}

/// Re-evaluate `check` until it holds, panicking after ~3 s
pub async fn wait_until<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..300 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for: {}", what);
}

//! Poll loop
//!
//! Runs on its own task. Each iteration asks the owner for a poll ticket,
//! performs the request outside the owner, hands the outcome back, and only
//! then sleeps for the poll interval. At most one poll is ever in flight.
//!
//! While the endpoint or context id is missing the loop retries after a
//! short fixed delay without counting an attempt or logging an error.

use std::time::Duration;
use tracing::{debug, info, warn};

use super::client::EventSourceClient;
use crate::scheduler::{PollApplied, SchedulerHandle};

/// Fixed-cadence poller feeding the scheduler
pub struct Poller {
    handle: SchedulerHandle,
    client: EventSourceClient,
    interval: Duration,
    unconfigured_retry: Duration,
}

impl Poller {
    pub fn new(
        handle: SchedulerHandle,
        client: EventSourceClient,
        interval: Duration,
        unconfigured_retry: Duration,
    ) -> Self {
        Self {
            handle,
            client,
            interval,
            unconfigured_retry,
        }
    }

    /// Run until the scheduler owner goes away
    pub async fn run(self) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            timeout_ms = self.client.timeout().as_millis() as u64,
            "Poll loop started"
        );

        loop {
            let ticket = match self.handle.begin_poll().await {
                Ok(Some(ticket)) => ticket,
                Ok(None) => {
                    tokio::time::sleep(self.unconfigured_retry).await;
                    continue;
                }
                Err(_) => break,
            };

            let result = self.client.poll(&ticket.endpoint, &ticket.request).await;
            if let Err(e) = &result {
                warn!(sequence = ticket.sequence, "Poll failed: {}", e);
            }

            match self.handle.apply_poll(ticket.tag, result).await {
                Ok(PollApplied::Merged { accepted }) => {
                    debug!(sequence = ticket.sequence, accepted, "Poll applied");
                }
                Ok(PollApplied::Stale) => {
                    debug!(sequence = ticket.sequence, "Poll result discarded (session changed)");
                }
                Ok(PollApplied::Failed { .. }) => {}
                Err(_) => break,
            }

            tokio::time::sleep(self.interval).await;
        }

        info!("Poll loop stopped");
    }
}

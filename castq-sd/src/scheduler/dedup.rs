//! Remote event deduplication
//!
//! A candidate is accepted only if its id is not already in the live queue,
//! does not equal the last-seen cursor, and has not appeared earlier in the
//! same batch. The cursor advances to each accepted id in arrival order, so
//! after a batch it names the last accepted event.

use castq_common::QueueItem;
use std::collections::HashSet;
use tracing::debug;

use super::queue::PlayQueue;

/// Filter `candidates` down to events never seen before, advancing `cursor`
pub fn accept_new(
    candidates: Vec<QueueItem>,
    queue: &PlayQueue,
    cursor: &mut Option<String>,
) -> Vec<QueueItem> {
    let mut batch_ids: HashSet<String> = HashSet::new();
    let mut accepted = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let duplicate = queue.contains(&candidate.id)
            || cursor.as_deref() == Some(candidate.id.as_str())
            || batch_ids.contains(&candidate.id);

        if duplicate {
            debug!(event_id = %candidate.id, "Dropping duplicate event");
            continue;
        }

        batch_ids.insert(candidate.id.clone());
        *cursor = Some(candidate.id.clone());
        accepted.push(candidate);
    }

    accepted
}

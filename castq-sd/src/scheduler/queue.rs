//! Play queue and playback state machine
//!
//! Owns the ordered list of queue items and enforces the item lifecycle
//! `Queued → Active → Done`:
//! - At most one item is `Active` at any time
//! - Finished items are pruned immediately, except an item explicitly
//!   stopped, which stays in place as `Done` and can be replayed
//! - Every promotion bumps an activation counter so observers can tell a
//!   restart of the same item apart from "nothing changed"
//!
//! The queue performs no I/O and emits no events; the scheduler core decides
//! which transitions to apply and the owner task publishes the results.

use castq_common::{ItemState, QueueItem};
use std::collections::HashSet;

/// Ordered queue with single-active enforcement
#[derive(Debug, Default, Clone)]
pub struct PlayQueue {
    items: Vec<QueueItem>,

    /// Incremented on every promotion to `Active`
    activation: u64,
}

impl PlayQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Items in play order
    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    pub fn active_index(&self) -> Option<usize> {
        self.items.iter().position(QueueItem::is_active)
    }

    /// Currently active item, if any
    pub fn active(&self) -> Option<&QueueItem> {
        self.active_index().map(|idx| &self.items[idx])
    }

    /// Activation counter (bumped by every promotion)
    pub fn activation(&self) -> u64 {
        self.activation
    }

    /// Number of items waiting to play
    pub fn queued_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.state == ItemState::Queued)
            .count()
    }

    fn activate(&mut self, index: usize) {
        debug_assert!(
            self.active_index().map_or(true, |idx| idx == index),
            "second active item"
        );
        self.items[index].state = ItemState::Active;
        self.activation += 1;
    }

    /// Promote the first `Queued` item if nothing is active
    ///
    /// Returns true if an item was promoted.
    pub fn promote_head(&mut self) -> bool {
        if self.active_index().is_some() {
            return false;
        }
        match self.items.iter().position(|item| item.state == ItemState::Queued) {
            Some(idx) => {
                self.activate(idx);
                true
            }
            None => false,
        }
    }

    /// Finish the active item: `Active → Done`, then prune it
    pub fn finish_active(&mut self) -> Option<QueueItem> {
        let idx = self.active_index()?;
        let mut item = self.items.remove(idx);
        item.state = ItemState::Done;
        Some(item)
    }

    /// Stop the active item in place: `Active → Done`, retained for replay
    pub fn retain_active_as_done(&mut self) -> Option<&QueueItem> {
        let idx = self.active_index()?;
        self.items[idx].state = ItemState::Done;
        Some(&self.items[idx])
    }

    /// Explicitly play `id` from any state
    ///
    /// The current active item (if any) is demoted to `Queued`; the named item
    /// keeps its position. Returns false if `id` is not in the queue.
    pub fn play(&mut self, id: &str) -> bool {
        let Some(target) = self.position(id) else {
            return false;
        };
        if let Some(idx) = self.active_index() {
            self.items[idx].state = ItemState::Queued;
        }
        self.activate(target);
        true
    }

    /// Remove an item in any state
    pub fn remove(&mut self, id: &str) -> Option<QueueItem> {
        let idx = self.position(id)?;
        Some(self.items.remove(idx))
    }

    /// Remove everything except the active item
    ///
    /// Returns the number of removed items.
    pub fn clear_waiting(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(QueueItem::is_active);
        before - self.items.len()
    }

    /// Drop every item (session reset)
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Apply an operator permutation without changing any state
    ///
    /// Listed ids move to the front in the given order. Unknown and repeated
    /// ids are ignored; unlisted items follow in their previous relative order.
    pub fn reorder(&mut self, order: &[String]) {
        let mut seen = HashSet::new();
        let mut remaining = std::mem::take(&mut self.items);
        let mut reordered = Vec::with_capacity(remaining.len());

        for id in order {
            if !seen.insert(id.as_str()) {
                continue;
            }
            if let Some(idx) = remaining.iter().position(|item| &item.id == id) {
                reordered.push(remaining.remove(idx));
            }
        }
        reordered.append(&mut remaining);
        self.items = reordered;
    }

    /// Merge a classified batch into the queue
    ///
    /// - With an active item: `priority` goes directly after it, `normal` at
    ///   the tail.
    /// - Without an active item and with priority items: the first priority
    ///   item becomes active at the front, the rest follow, then the items
    ///   that were already waiting, then `normal`.
    /// - Otherwise `normal` is appended and the head is promoted when
    ///   `auto_play` is set.
    ///
    /// Returns true if the merge promoted a priority item, which forces
    /// auto-play on.
    pub fn merge(&mut self, priority: Vec<QueueItem>, normal: Vec<QueueItem>, auto_play: bool) -> bool {
        if let Some(idx) = self.active_index() {
            let at = idx + 1;
            self.items.splice(at..at, priority);
            self.items.extend(normal);
            return false;
        }

        if !priority.is_empty() {
            let waiting = std::mem::take(&mut self.items);
            self.items = priority;
            self.items.extend(waiting);
            self.items.extend(normal);
            self.activate(0);
            return true;
        }

        self.items.extend(normal);
        if auto_play {
            self.promote_head();
        }
        false
    }

    /// Count of items in `Active` state (0 or 1 when invariants hold)
    pub fn active_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_active()).count()
    }
}

//! Priority classification for incoming commentary
//!
//! An event is high-priority when its label mentions a match-changing moment:
//! goal, penalty, red card, yellow card or video review (`VAR`). Matching is
//! case-insensitive; `VAR` must stand as its own word so labels such as
//! "variation" stay normal.

use castq_common::QueueItem;

/// Phrases that mark a label as high-priority (lowercase)
const PRIORITY_PHRASES: &[&str] = &[
    "goal",
    "penalty",
    "red card",
    "yellow card",
    "video review",
    "video-review",
];

/// Standalone token for video assistant referee reviews (lowercase)
const VAR_TOKEN: &str = "var";

/// True if `label` describes a high-priority moment
pub fn is_priority(label: &str) -> bool {
    let lower = label.to_lowercase();
    if PRIORITY_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        return true;
    }
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word == VAR_TOKEN)
}

/// Split a batch into (priority, normal), each in arrival order
pub fn partition(items: Vec<QueueItem>) -> (Vec<QueueItem>, Vec<QueueItem>) {
    items.into_iter().partition(|item| is_priority(&item.label))
}

// src/transitions.rs
use crate::broadcast::{Broadcast, BroadcastStatus, VideoId};
use std::collections::HashSet;

/// Entries of `new` that were Upcoming in `old` and are Live now.
///
/// Nothing is reported when `old` is empty, so the first population never
/// fires. Every matching occurrence in `new` is reported, duplicates
/// included.
pub fn detect_transitions(old: &[Broadcast], new: &[Broadcast]) -> Vec<Broadcast> {
    if old.is_empty() {
        return Vec::new();
    }

    let previously_upcoming: HashSet<&VideoId> = old
        .iter()
        .filter(|b| b.status() == BroadcastStatus::Upcoming)
        .map(Broadcast::id)
        .collect();

    new.iter()
        .filter(|b| b.status() == BroadcastStatus::Live && previously_upcoming.contains(b.id()))
        .cloned()
        .collect()
}

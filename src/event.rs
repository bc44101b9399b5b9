// src/event.rs
use crate::scheduler::{RefreshOutcome, RefreshTrigger};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Emitted by a refresh task once both query dimensions have returned.
    /// Applied by the UI loop, which is the only writer of the snapshot.
    RefreshCompleted {
        outcome: RefreshOutcome,
        trigger: RefreshTrigger,
        timestamp: DateTime<Utc>,
    },
}

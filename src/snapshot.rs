// src/snapshot.rs
use crate::broadcast::Broadcast;
use crate::transitions::detect_transitions;
use std::sync::Arc;

pub type Snapshot = Arc<Vec<Broadcast>>;

/// Most recent merged broadcast list. Only ever replaced wholesale.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: Snapshot,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cheap handle to the current snapshot; stays valid after a replace.
    pub fn current(&self) -> Snapshot {
        Arc::clone(&self.current)
    }

    /// Diffs `next` against the current snapshot, installs it, and returns
    /// the upcoming-to-live transitions.
    pub fn replace(&mut self, next: Vec<Broadcast>) -> Vec<Broadcast> {
        let transitions = detect_transitions(&self.current, &next);
        self.current = Arc::new(next);
        transitions
    }
}

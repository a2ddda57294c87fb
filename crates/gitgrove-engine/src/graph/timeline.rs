use gitgrove_core::CommitEvent;
use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;

/// Cursor over the time-sorted commit stream plus the set of already-applied commits.
#[derive(Debug, Clone)]
pub struct ReplayState {
    events: Arc<[CommitEvent]>,
    cursor: usize,
    processed: HashSet<String>,
}

impl Default for ReplayState {
    fn default() -> Self {
        Self {
            events: Arc::from(Vec::new()),
            cursor: 0,
            processed: HashSet::new(),
        }
    }
}

impl ReplayState {
    /// Stable sort, so events sharing a timestamp keep their input order.
    pub fn load(&mut self, mut events: Vec<CommitEvent>) {
        events.sort_by_key(|event| event.timestamp_ms);
        self.events = events.into();
        self.reset();
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
        self.processed.clear();
    }

    pub fn events(&self) -> Arc<[CommitEvent]> {
        Arc::clone(&self.events)
    }

    pub fn total(&self) -> usize {
        self.events.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.events.len()
    }

    pub fn time_range(&self) -> Option<(i64, i64)> {
        let first = self.events.first()?.timestamp_ms;
        let last = self.events.last()?.timestamp_ms;
        Some((first, last))
    }

    /// Moves the cursor past every event at or before `until` and returns the span it crossed.
    pub fn advance(&mut self, until: i64) -> Range<usize> {
        let start = self.cursor;
        while self
            .events
            .get(self.cursor)
            .map(|event| event.timestamp_ms <= until)
            .unwrap_or(false)
        {
            self.cursor += 1;
        }
        start..self.cursor
    }

    /// `false` when this commit was already applied.
    pub fn mark_processed(&mut self, event: &CommitEvent) -> bool {
        self.processed.insert(event.replay_key())
    }
}

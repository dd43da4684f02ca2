//! Bounded replay log of recent broadcasts

use std::collections::VecDeque;

/// Number of broadcasts replayed to a newly connected client
pub const HISTORY_CAPACITY: usize = 15;

/// A broadcast as it was said, frozen at append time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub sender: String,
    pub text: String,
    /// Position in the overall broadcast stream, starting at 0
    pub sequence: u64,
}

/// Fixed-capacity FIFO of broadcasts
///
/// Holds what was said, independent of who received it, and of the sessions
/// that said it: renaming or disconnecting later does not touch stored entries.
#[derive(Debug)]
pub struct HistoryBuffer {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    next_sequence: u64,
}

impl HistoryBuffer {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_sequence: 0,
        }
    }

    /// Appends a broadcast, dropping the oldest entry once full
    pub fn append(&mut self, sender: &str, text: &str) {
        if self.capacity == 0 {
            return;
        }

        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }

        self.entries.push_back(HistoryEntry {
            sender: sender.to_string(),
            text: text.to_string(),
            sequence: self.next_sequence,
        });
        self.next_sequence += 1;
    }

    /// Entries oldest-first, in replay order
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

//! Bounded conversation history for one session.

use aide_common::{MemoryEntry, Role};
use std::collections::VecDeque;

/// FIFO ring of conversation turns. Oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    entries: VecDeque<MemoryEntry>,
    capacity: usize,
}

impl ConversationMemory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, role: Role, text: impl Into<String>) {
        self.push(MemoryEntry::new(role, text));
    }

    pub fn push(&mut self, entry: MemoryEntry) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Last `n` entries, oldest first
    pub fn recent(&self, n: usize) -> Vec<MemoryEntry> {
        let n = n.min(self.entries.len());
        self.entries
            .iter()
            .skip(self.entries.len() - n)
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

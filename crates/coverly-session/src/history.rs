//! Bounded FIFO history for one chat session.
//!
//! `HistoryBuffer` keeps the `max_history` most recent messages of a
//! conversation (default 15) and counts every message ever appended, so the
//! assistant's prompt window stays bounded while session stats stay accurate.
//!
//! The buffer does no locking of its own: every mutation happens inside a
//! [`SessionRegistry::update`](crate::registry::SessionRegistry::update)
//! call, which already holds the owning key's lock.

use std::collections::VecDeque;

use coverly_types::chat::ChatMessage;

/// Default number of retained messages per session.
pub const DEFAULT_MAX_HISTORY: usize = 15;

/// Fixed-capacity FIFO message queue with oldest-first eviction.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    messages: VecDeque<ChatMessage>,
    max_history: usize,
    /// Total messages ever appended, including evicted ones.
    lifetime_count: u64,
    owner: Option<String>,
}

impl HistoryBuffer {
    /// Create an empty buffer retaining at most `max_history` messages.
    pub fn new(max_history: usize, owner: Option<String>) -> Self {
        Self {
            messages: VecDeque::with_capacity(max_history),
            max_history,
            lifetime_count: 0,
            owner,
        }
    }

    /// Append a message at the tail, evicting the oldest when over capacity.
    ///
    /// Always counts the message in `lifetime_count`, even when capacity is
    /// zero and nothing is retained. O(1) amortized.
    pub fn push(&mut self, message: ChatMessage) {
        self.lifetime_count += 1;
        if self.max_history == 0 {
            return;
        }
        if self.messages.len() == self.max_history {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    /// Defensive copy of the retained messages, oldest first.
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    /// Consume the buffer into its retained messages, oldest first.
    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages.into_iter().collect()
    }

    /// Iterate the retained messages, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    /// Number of currently retained messages (`<= max_history`).
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether no messages are retained.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Retention capacity this buffer was created with.
    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Total messages ever appended to this buffer.
    pub fn lifetime_count(&self) -> u64 {
        self.lifetime_count
    }

    /// Owner identifier this buffer was created for, if any.
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY, None)
    }
}

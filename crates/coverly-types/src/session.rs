//! Session bookkeeping types for Coverly.
//!
//! `SessionMetadata` carries the per-session timestamps the registry keeps in
//! lockstep with the payload; `SessionInfo` is the combined shape returned to
//! the HTTP layer for session introspection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Creation and last-access timestamps for one live session.
///
/// `created_at` is immutable after construction. `last_access` only moves
/// forward: `touch()` takes the max of the current stamp and now, so a
/// stepped-back wall clock cannot make it regress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub created_at: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
}

impl SessionMetadata {
    /// Metadata for a session created right now (both stamps equal).
    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            last_access: now,
        }
    }

    /// Refresh `last_access`, never moving it backwards.
    pub fn touch(&mut self) {
        self.last_access = self.last_access.max(Utc::now());
    }
}

/// Introspection snapshot of one session, as served by the HTTP layer.
///
/// `message_count` is the lifetime append total; `current_length` is how many
/// messages the bounded history currently retains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub created_at: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
    pub message_count: u64,
    pub current_length: usize,
    pub owner: Option<String>,
}

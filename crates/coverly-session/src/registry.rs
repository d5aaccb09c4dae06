//! Concurrent keyed session registry.
//!
//! `SessionRegistry` is a generic keyed store backed by `DashMap`: atomic
//! get-or-create, get, update, remove, over an opaque payload type. The
//! payload and its `created_at`/`last_access` metadata live in a single map
//! entry, so they can never drift apart, and removing a key drops all of its
//! per-key state at once.
//!
//! Per-key mutual exclusion is the shard lock taken by the `entry()` and
//! `get_mut()` calls: operations on the same key are totally ordered, and a
//! creation race runs the factory exactly once. Operations on different keys
//! proceed in parallel (up to shard granularity). Values are cloned on read --
//! no `DashMap` guard ever escapes a method, and caller closures must never
//! re-enter the registry (that would deadlock on the shard lock).

use coverly_types::session::SessionMetadata;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

/// One live session: the caller's payload plus the registry's timestamps.
#[derive(Debug)]
struct SessionEntry<T> {
    payload: T,
    meta: SessionMetadata,
}

impl<T> SessionEntry<T> {
    fn new(payload: T) -> Self {
        Self {
            payload,
            meta: SessionMetadata::now(),
        }
    }
}

/// Concurrent registry of keyed session payloads.
///
/// Generic over the payload type `T`, which the registry owns exclusively
/// once inserted: callers mutate it only through [`update`](Self::update)
/// and read it as a clone, never through a retained reference.
#[derive(Debug)]
pub struct SessionRegistry<T> {
    sessions: DashMap<String, SessionEntry<T>>,
}

impl<T> SessionRegistry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Run `f` against the payload under `key`, refreshing `last_access`.
    ///
    /// Returns `false` without calling `f` if the key is absent. The closure
    /// runs under the key's shard lock; it must not call back into the
    /// registry. If `f` panics, the unwind releases the lock and the
    /// registry's own bookkeeping stays consistent -- the payload's interior
    /// state after a partial mutation is the caller's responsibility.
    pub fn update<F>(&self, key: &str, f: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        match self.sessions.get_mut(key) {
            Some(mut entry) => {
                f(&mut entry.payload);
                entry.meta.touch();
                true
            }
            None => false,
        }
    }

    /// Remove the session under `key`, dropping payload and metadata together.
    ///
    /// Returns `false` if the key was absent. A remove racing a
    /// `get_or_create` on the same key serializes on the shard lock, so no
    /// half-removed state is observable.
    pub fn remove(&self, key: &str) -> bool {
        let removed = self.sessions.remove(key).is_some();
        if removed {
            debug!(session_key = %key, "removed session entry");
        }
        removed
    }

    /// Check whether `key` is live, without touching `last_access`.
    pub fn contains(&self, key: &str) -> bool {
        self.sessions.contains_key(key)
    }

    /// Snapshot of all live session keys.
    pub fn keys(&self) -> Vec<String> {
        self.sessions.iter().map(|r| r.key().clone()).collect()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Cloned timestamps for `key`, or `None` if absent. Pure read.
    pub fn metadata(&self, key: &str) -> Option<SessionMetadata> {
        self.sessions.get(key).map(|entry| entry.meta.clone())
    }

    /// Drop every live session.
    pub fn clear(&self) {
        let count = self.sessions.len();
        self.sessions.clear();
        debug!(count, "cleared session registry");
    }
}

impl<T: Clone> SessionRegistry<T> {
    /// Return the payload under `key`, inserting `factory()`'s result first
    /// if the key is absent.
    ///
    /// The shard lock is held across the absence check and the insert, so the
    /// factory runs at most once per key no matter how many callers race on
    /// it; every racing caller observes the one inserted payload. An existing
    /// payload is returned as-is without refreshing `last_access`.
    pub fn get_or_create<F>(&self, key: &str, factory: F) -> T
    where
        F: FnOnce() -> T,
    {
        match self.sessions.entry(key.to_string()) {
            Entry::Occupied(entry) => entry.get().payload.clone(),
            Entry::Vacant(slot) => {
                debug!(session_key = %key, "creating session entry");
                slot.insert(SessionEntry::new(factory())).payload.clone()
            }
        }
    }

    /// Fallible-factory variant of [`get_or_create`](Self::get_or_create).
    ///
    /// If the factory fails, nothing is inserted -- no payload, no metadata,
    /// no per-key state -- and the error propagates to the caller that
    /// triggered construction. A later (or concurrently waiting) caller
    /// re-runs construction from scratch rather than observing a half-built
    /// entry.
    pub fn try_get_or_create<F, E>(&self, key: &str, factory: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        match self.sessions.entry(key.to_string()) {
            Entry::Occupied(entry) => Ok(entry.get().payload.clone()),
            Entry::Vacant(slot) => {
                let payload = factory()?;
                debug!(session_key = %key, "creating session entry");
                Ok(slot.insert(SessionEntry::new(payload)).payload.clone())
            }
        }
    }

    /// Cloned payload under `key`, refreshing `last_access`; `None` if absent.
    pub fn get(&self, key: &str) -> Option<T> {
        self.sessions.get_mut(key).map(|mut entry| {
            entry.meta.touch();
            entry.payload.clone()
        })
    }

    /// One atomic read of payload and timestamps, or `None` if absent.
    ///
    /// Pure read: introspection does not count as access, so `last_access`
    /// is left alone.
    pub fn snapshot_entry(&self, key: &str) -> Option<(T, SessionMetadata)> {
        self.sessions
            .get(key)
            .map(|entry| (entry.payload.clone(), entry.meta.clone()))
    }
}

impl<T> Default for SessionRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

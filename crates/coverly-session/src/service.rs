//! Chat session lifecycle service.
//!
//! `ChatSessionService` is what the HTTP layer calls: it composes the
//! [`SessionRegistry`] with per-session [`HistoryBuffer`]s and exposes the
//! create/append/read/delete lifecycle. The registry owns all locking;
//! nothing here takes a lock of its own.
//!
//! Unknown session ids yield empty or `None` results, never errors, so the
//! HTTP boundary can translate absence into a 404 without special-casing.

use std::sync::Arc;

use chrono::Utc;
use coverly_types::chat::{ChatMessage, MessageRole, PromptMessage};
use coverly_types::session::SessionInfo;
use tracing::debug;
use uuid::Uuid;

use crate::history::{DEFAULT_MAX_HISTORY, HistoryBuffer};
use crate::registry::SessionRegistry;

/// Session lifecycle operations over a shared registry.
///
/// The registry is injected at construction (one per process, created at
/// startup) rather than reached through a global; cloning the `Arc` shares
/// the same live sessions.
pub struct ChatSessionService {
    registry: Arc<SessionRegistry<HistoryBuffer>>,
    max_history: usize,
}

impl ChatSessionService {
    /// Create a service retaining [`DEFAULT_MAX_HISTORY`] messages per session.
    pub fn new(registry: Arc<SessionRegistry<HistoryBuffer>>) -> Self {
        Self::with_max_history(registry, DEFAULT_MAX_HISTORY)
    }

    /// Create a service with an explicit per-session retention capacity.
    pub fn with_max_history(
        registry: Arc<SessionRegistry<HistoryBuffer>>,
        max_history: usize,
    ) -> Self {
        Self {
            registry,
            max_history,
        }
    }

    /// Retention capacity applied to newly created sessions.
    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Create a new chat session and return its id.
    ///
    /// The id is a freshly minted UUIDv4, so the get-or-create below always
    /// creates; `owner` is an opaque identifier the HTTP layer attaches
    /// (e.g. the authenticated agent).
    pub fn create_session(&self, owner: Option<String>) -> String {
        let session_id = Uuid::new_v4().to_string();
        let max_history = self.max_history;
        self.registry
            .get_or_create(&session_id, || HistoryBuffer::new(max_history, owner));
        debug!(%session_id, "created chat session");
        session_id
    }

    /// Append a message to a session's history.
    ///
    /// Creates the session lazily if `session_id` is unknown (a client may
    /// send its first message with a self-minted id). A delete racing between
    /// the lazy create and the append drops the message; the window is
    /// inherent to the two-step lifecycle and the drop is logged.
    pub fn add_message(&self, session_id: &str, role: MessageRole, content: impl Into<String>) {
        let max_history = self.max_history;
        self.registry
            .get_or_create(session_id, || HistoryBuffer::new(max_history, None));

        let message = ChatMessage {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        };
        let recorded = self
            .registry
            .update(session_id, |history| history.push(message));
        if !recorded {
            debug!(%session_id, "session deleted before message was recorded");
        }
    }

    /// The retained history of a session, oldest first.
    ///
    /// Unknown ids yield an empty vec. Refreshes the session's `last_access`.
    pub fn get_history(&self, session_id: &str) -> Vec<ChatMessage> {
        self.registry
            .get(session_id)
            .map(HistoryBuffer::into_messages)
            .unwrap_or_default()
    }

    /// The retained history projected to `{role, content}` pairs for an LLM
    /// provider call, oldest first. Unknown ids yield an empty vec.
    pub fn get_history_for_llm(&self, session_id: &str) -> Vec<PromptMessage> {
        self.registry
            .get(session_id)
            .map(|history| history.iter().map(PromptMessage::from).collect())
            .unwrap_or_default()
    }

    /// Introspection snapshot of a session, or `None` if unknown.
    ///
    /// A pure read: looking at a session does not refresh its `last_access`.
    pub fn get_session_info(&self, session_id: &str) -> Option<SessionInfo> {
        self.registry
            .snapshot_entry(session_id)
            .map(|(history, meta)| SessionInfo {
                created_at: meta.created_at,
                last_access: meta.last_access,
                message_count: history.lifetime_count(),
                current_length: history.len(),
                owner: history.owner().map(str::to_string),
            })
    }

    /// Delete a session; `false` if it was not live.
    pub fn delete_session(&self, session_id: &str) -> bool {
        let deleted = self.registry.remove(session_id);
        if deleted {
            debug!(%session_id, "deleted chat session");
        }
        deleted
    }

    /// Ids of all live sessions, in no particular order.
    pub fn list_sessions(&self) -> Vec<String> {
        self.registry.keys()
    }

    /// Whether a session is live.
    pub fn session_exists(&self, session_id: &str) -> bool {
        self.registry.contains(session_id)
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    /// Drop every live session. Test harnesses and admin tooling only.
    pub fn clear_all_sessions(&self) {
        self.registry.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    fn service() -> ChatSessionService {
        ChatSessionService::new(Arc::new(SessionRegistry::new()))
    }

    fn role_for(i: usize) -> MessageRole {
        if i % 2 == 0 {
            MessageRole::User
        } else {
            MessageRole::Assistant
        }
    }

    #[test]
    fn create_session_returns_distinct_live_ids() {
        let service = service();
        let a = service.create_session(None);
        let b = service.create_session(None);

        assert_ne!(a, b);
        assert!(service.session_exists(&a));
        assert!(service.session_exists(&b));
        assert_eq!(service.session_count(), 2);
    }

    #[test]
    fn unknown_id_yields_empty_results() {
        let service = service();
        assert!(service.get_history("nope").is_empty());
        assert!(service.get_history_for_llm("nope").is_empty());
        assert!(service.get_session_info("nope").is_none());
        assert!(!service.session_exists("nope"));
        assert!(!service.delete_session("nope"));
    }

    #[test]
    fn twenty_messages_retain_last_fifteen() {
        let service = service();
        let id = service.create_session(None);

        for i in 0..20 {
            service.add_message(&id, role_for(i), format!("message {i}"));
        }

        let history = service.get_history(&id);
        assert_eq!(history.len(), 15);
        for (offset, msg) in history.iter().enumerate() {
            let i = offset + 5;
            assert_eq!(msg.content, format!("message {i}"));
            assert_eq!(msg.role, role_for(i));
        }

        let info = service.get_session_info(&id).unwrap();
        assert_eq!(info.message_count, 20);
        assert_eq!(info.current_length, 15);
    }

    #[test]
    fn add_message_creates_session_lazily() {
        let service = service();
        assert!(!service.session_exists("client-minted"));

        service.add_message("client-minted", MessageRole::User, "hello");

        assert!(service.session_exists("client-minted"));
        let history = service.get_history("client-minted");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "hello");
    }

    #[test]
    fn delete_session_removes_everything() {
        let service = service();
        let id = service.create_session(None);
        service.add_message(&id, MessageRole::User, "hi");

        assert!(service.delete_session(&id));
        assert!(!service.session_exists(&id));
        assert!(!service.list_sessions().contains(&id));
        assert!(service.get_history(&id).is_empty());
        assert!(service.get_session_info(&id).is_none());
    }

    #[test]
    fn recreated_session_has_no_residue() {
        let service = service();
        let id = service.create_session(None);
        for i in 0..5 {
            service.add_message(&id, role_for(i), format!("old {i}"));
        }
        service.delete_session(&id);

        service.add_message(&id, MessageRole::User, "fresh start");

        let info = service.get_session_info(&id).unwrap();
        assert_eq!(info.message_count, 1);
        assert_eq!(info.current_length, 1);
        assert_eq!(service.get_history(&id)[0].content, "fresh start");
    }

    #[test]
    fn owner_flows_into_session_info() {
        let service = service();
        let id = service.create_session(Some("agent-12".to_string()));

        let info = service.get_session_info(&id).unwrap();
        assert_eq!(info.owner.as_deref(), Some("agent-12"));

        let anonymous = service.create_session(None);
        assert!(service.get_session_info(&anonymous).unwrap().owner.is_none());
    }

    #[test]
    fn prompt_projection_keeps_order_and_roles() {
        let service = service();
        let id = service.create_session(None);
        for i in 0..4 {
            service.add_message(&id, role_for(i), format!("message {i}"));
        }

        let prompt = service.get_history_for_llm(&id);
        assert_eq!(prompt.len(), 4);
        for (i, msg) in prompt.iter().enumerate() {
            assert_eq!(msg.role, role_for(i));
            assert_eq!(msg.content, format!("message {i}"));
        }
    }

    #[test]
    fn last_access_moves_forward_created_at_does_not() {
        let service = service();
        let id = service.create_session(None);
        let at_creation = service.get_session_info(&id).unwrap();
        assert_eq!(at_creation.created_at, at_creation.last_access);

        thread::sleep(Duration::from_millis(10));
        service.get_history(&id);
        let after_read = service.get_session_info(&id).unwrap();
        assert!(after_read.last_access > at_creation.last_access);
        assert_eq!(after_read.created_at, at_creation.created_at);

        thread::sleep(Duration::from_millis(10));
        service.add_message(&id, MessageRole::User, "ping");
        let after_write = service.get_session_info(&id).unwrap();
        assert!(after_write.last_access > after_read.last_access);
        assert_eq!(after_write.created_at, at_creation.created_at);
    }

    #[test]
    fn concurrent_creators_get_unique_sessions() {
        let service = Arc::new(service());
        let barrier = Arc::new(Barrier::new(16));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let service = Arc::clone(&service);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    service.create_session(None)
                })
            })
            .collect();

        let mut ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 16);
        assert_eq!(service.session_count(), 16);
    }

    #[test]
    fn concurrent_appends_to_one_session_all_count() {
        let service = Arc::new(service());
        let id = service.create_session(None);
        let barrier = Arc::new(Barrier::new(32));

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let service = Arc::clone(&service);
                let barrier = Arc::clone(&barrier);
                let id = id.clone();
                thread::spawn(move || {
                    barrier.wait();
                    service.add_message(&id, role_for(i), format!("message {i}"));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let info = service.get_session_info(&id).unwrap();
        assert_eq!(info.message_count, 32);
        assert_eq!(info.current_length, 15);
        assert_eq!(service.get_history(&id).len(), 15);
    }

    #[test]
    fn custom_capacity_is_applied() {
        let service =
            ChatSessionService::with_max_history(Arc::new(SessionRegistry::new()), 3);
        let id = service.create_session(None);

        for i in 0..10 {
            service.add_message(&id, role_for(i), format!("message {i}"));
        }

        let history = service.get_history(&id);
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].content, "message 7");
        assert_eq!(service.get_session_info(&id).unwrap().message_count, 10);
    }

    #[test]
    fn clear_all_sessions_empties_the_registry() {
        let service = service();
        for _ in 0..4 {
            service.create_session(None);
        }
        assert_eq!(service.session_count(), 4);

        service.clear_all_sessions();
        assert_eq!(service.session_count(), 0);
        assert!(service.list_sessions().is_empty());
    }

    #[test]
    fn services_sharing_a_registry_see_the_same_sessions() {
        let registry = Arc::new(SessionRegistry::new());
        let a = ChatSessionService::new(Arc::clone(&registry));
        let b = ChatSessionService::new(registry);

        let id = a.create_session(None);
        assert!(b.session_exists(&id));
        b.add_message(&id, MessageRole::Assistant, "seen by both");
        assert_eq!(a.get_history(&id).len(), 1);
    }
}

//! In-memory chat session state for Coverly.
//!
//! This crate holds the conversational state the chat subsystem keeps between
//! HTTP requests: a concurrent keyed registry of live sessions
//! ([`SessionRegistry`]), a fixed-capacity FIFO history per session
//! ([`HistoryBuffer`]), and the lifecycle service the HTTP layer calls
//! ([`ChatSessionService`]).
//!
//! All state is process-memory only and intentionally non-durable: a restart
//! clears every session. There is no idle-session expiry; sessions live until
//! deleted.

pub mod history;
pub mod registry;
pub mod service;

pub use history::{DEFAULT_MAX_HISTORY, HistoryBuffer};
pub use registry::SessionRegistry;
pub use service::ChatSessionService;

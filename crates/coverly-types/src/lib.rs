//! Shared domain types for Coverly.
//!
//! This crate contains the chat-facing domain types used across the Coverly
//! backend: message roles, chat messages, session metadata, and their
//! associated error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod chat;
pub mod error;
pub mod session;

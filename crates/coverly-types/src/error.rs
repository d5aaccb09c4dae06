use thiserror::Error;

/// Error returned when parsing a message role from its wire form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid message role: '{0}'")]
pub struct ParseRoleError(pub String);

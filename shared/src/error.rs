//! Per-datagram protocol failures
//!
//! Every variant is recoverable: the server answers the offending sender with a
//! single `ERR$<reason>` datagram, where `<reason>` is the `Display` text below,
//! and keeps serving everyone else.

use thiserror::Error;

/// Longest slice of a rejected datagram echoed back inside an error reply
const ECHO_LIMIT: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Malformed request (not valid UTF-8)")]
    InvalidEncoding,

    #[error("Malformed request (no $): {0}")]
    MissingDelimiter(String),

    #[error("Malformed request (empty command type)")]
    EmptyCommandType,

    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    #[error("{command} requires {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },

    #[error("Recipient '{0}' not found")]
    UnknownTarget(String),

    #[error("You must conn$<name> first")]
    NotConnected,

    #[error("{0} was not muted")]
    NotMuted(String),

    #[error("kick is admin-only")]
    NotAuthorized,
}

impl ProtocolError {
    /// Builds a `MissingDelimiter` error, truncating the echoed text
    pub fn missing_delimiter(text: &str) -> Self {
        ProtocolError::MissingDelimiter(text.chars().take(ECHO_LIMIT).collect())
    }
}

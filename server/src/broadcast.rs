//! Delivery sets for chat fan-out
//!
//! These functions only decide *who* gets a datagram. They read the registry
//! while the caller holds exclusive access to it and return plain addresses, so
//! the actual sends can happen after the dispatch step has finished.

use crate::registry::{Session, SessionRegistry};
use shared::ProtocolError;
use std::net::SocketAddr;

/// Everyone who should see a public message from `sender`
///
/// The sender never receives its own broadcast, and recipients that muted the
/// sender's current display name are skipped.
pub fn broadcast_recipients(registry: &SessionRegistry, sender: &Session) -> Vec<SocketAddr> {
    registry
        .sessions_in_join_order()
        .filter(|recipient| recipient.addr != sender.addr)
        .filter(|recipient| !recipient.has_muted(&sender.display_name))
        .map(|recipient| recipient.addr)
        .collect()
}

/// Resolves the recipient of a private message
///
/// Returns `Ok(None)` when the target exists but has muted the sender; the
/// message is dropped without telling the sender.
pub fn private_recipient(
    registry: &SessionRegistry,
    sender: &Session,
    target: &str,
) -> Result<Option<SocketAddr>, ProtocolError> {
    let recipient = registry
        .find_by_name(target)
        .ok_or_else(|| ProtocolError::UnknownTarget(target.to_string()))?;

    if recipient.has_muted(&sender.display_name) {
        Ok(None)
    } else {
        Ok(Some(recipient.addr))
    }
}

/// Everyone who should see a system notice, optionally excluding one address
pub fn notice_recipients(registry: &SessionRegistry, exclude: Option<SocketAddr>) -> Vec<SocketAddr> {
    registry
        .addresses()
        .into_iter()
        .filter(|addr| Some(*addr) != exclude)
        .collect()
}

//! Datagrams queued by a dispatch step for the sender task

use shared::Reply;
use std::net::SocketAddr;

/// Produced by the state machine, consumed by the network sender
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    SendReply {
        reply: Reply,
        addr: SocketAddr,
    },
    /// One reply delivered to a recipient set computed during dispatch
    Fanout {
        reply: Reply,
        recipients: Vec<SocketAddr>,
    },
}

impl OutboundMessage {
    pub fn reply(addr: SocketAddr, reply: Reply) -> Self {
        OutboundMessage::SendReply { reply, addr }
    }

    /// A fan-out message, or nothing when there is nobody to tell
    pub fn fanout(recipients: Vec<SocketAddr>, reply: Reply) -> Option<Self> {
        if recipients.is_empty() {
            None
        } else {
            Some(OutboundMessage::Fanout { reply, recipients })
        }
    }

    /// Number of datagrams this message turns into
    pub fn datagram_count(&self) -> usize {
        match self {
            OutboundMessage::SendReply { .. } => 1,
            OutboundMessage::Fanout { recipients, .. } => recipients.len(),
        }
    }
}

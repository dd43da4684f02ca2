//! Classification of terminal input and of datagrams from the server

use shared::{trim_padding, DISCONNECT_DATAGRAM, PING_DATAGRAM};

/// What to do with one line typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// Blank line, nothing to send
    Skip,
    /// Send the line verbatim and keep going
    Send(String),
    /// Send the line, then exit
    SendAndQuit(String),
}

/// Lines are sent as typed; the server does all validation
pub fn classify_line(line: &str) -> InputAction {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        InputAction::Skip
    } else if line.trim_start().starts_with(DISCONNECT_DATAGRAM) {
        InputAction::SendAndQuit(line.to_string())
    } else {
        InputAction::Send(line.to_string())
    }
}

/// A datagram received from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// Liveness probe, answered automatically
    Ping,
    /// Anything else, shown to the user as text
    Text(String),
}

pub fn classify_datagram(data: &[u8]) -> Incoming {
    let text = String::from_utf8_lossy(trim_padding(data));
    let text = text.trim();
    if text == PING_DATAGRAM {
        Incoming::Ping
    } else {
        Incoming::Text(text.to_string())
    }
}

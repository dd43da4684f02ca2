//! Wire protocol shared by the chat server and client
//!
//! Every datagram carries exactly one command or one reply as text of the form
//! `<command>$<payload>`. Inbound datagrams are turned into a [`Command`] by
//! [`parse_datagram`]; outbound datagrams are rendered from a [`Reply`].

mod error;

pub use error::ProtocolError;

use std::fmt;

pub const DEFAULT_PORT: u16 = 12000;
pub const DELIMITER: char = '$';
/// Large enough for any UDP payload
pub const MAX_DATAGRAM_SIZE: usize = 65_536;
pub const PING_DATAGRAM: &str = "ping$";
pub const PONG_DATAGRAM: &str = "pong$";
pub const DISCONNECT_DATAGRAM: &str = "disconn$";

/// A client request decoded from one datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect { name: String },
    /// An empty `text` is a valid no-op
    Broadcast { text: String },
    PrivateMessage { target: String, text: String },
    Mute { target: String },
    Unmute { target: String },
    Rename { name: String },
    Disconnect,
    Pong,
    Kick { target: String },
}

/// Strips the trailing NUL padding some peers append to fixed-size buffers
pub fn trim_padding(data: &[u8]) -> &[u8] {
    let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &data[..end]
}

/// Decodes one raw datagram into a command
///
/// Padding is removed before decoding, and bytes that are not UTF-8 are
/// reported as [`ProtocolError::InvalidEncoding`] rather than dropped silently.
pub fn parse_datagram(data: &[u8]) -> Result<Command, ProtocolError> {
    let text = std::str::from_utf8(trim_padding(data)).map_err(|_| ProtocolError::InvalidEncoding)?;
    parse_command(text)
}

/// Parses `<command>$<payload>` text
///
/// Only the first delimiter splits; anything after it, including further `$`
/// characters, belongs to the payload.
pub fn parse_command(text: &str) -> Result<Command, ProtocolError> {
    let text = text.trim();
    let (head, tail) = text
        .split_once(DELIMITER)
        .ok_or_else(|| ProtocolError::missing_delimiter(text))?;

    let head = head.trim();
    if head.is_empty() {
        return Err(ProtocolError::EmptyCommandType);
    }

    match head {
        "conn" => Ok(Command::Connect {
            name: required(tail, "conn", "a name")?,
        }),
        "say" => Ok(Command::Broadcast {
            text: tail.trim().to_string(),
        }),
        "sayto" => parse_private_message(tail),
        "mute" => Ok(Command::Mute {
            target: required(tail, "mute", "a client name")?,
        }),
        "unmute" => Ok(Command::Unmute {
            target: required(tail, "unmute", "a client name")?,
        }),
        "rename" => Ok(Command::Rename {
            name: required(tail, "rename", "a new name")?,
        }),
        "disconn" => Ok(Command::Disconnect),
        "pong" => Ok(Command::Pong),
        "kick" => Ok(Command::Kick {
            target: required(tail, "kick", "a client name")?,
        }),
        other => Err(ProtocolError::UnknownCommand(other.to_string())),
    }
}

fn required(
    tail: &str,
    command: &'static str,
    expected: &'static str,
) -> Result<String, ProtocolError> {
    let value = tail.trim();
    if value.is_empty() {
        Err(ProtocolError::MissingArgument { command, expected })
    } else {
        Ok(value.to_string())
    }
}

/// `sayto$<target> <text>`: the target is the first whitespace-separated token
fn parse_private_message(tail: &str) -> Result<Command, ProtocolError> {
    let missing = ProtocolError::MissingArgument {
        command: "sayto",
        expected: "a recipient name and a message",
    };

    let (target, text) = tail
        .trim()
        .split_once(char::is_whitespace)
        .ok_or_else(|| missing.clone())?;
    let text = text.trim();

    if target.is_empty() || text.is_empty() {
        return Err(missing);
    }

    Ok(Command::PrivateMessage {
        target: target.to_string(),
        text: text.to_string(),
    })
}

/// Why a session was removed by the server rather than by its own `disconn$`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    Inactive,
    Kicked,
}

/// A server-to-client datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Welcome { name: String },
    Joined { name: String },
    Chat { sender: String, text: String },
    Private { sender: String, text: String },
    History { sender: String, text: String },
    Muted { target: String },
    Unmuted { target: String },
    Renamed { name: String },
    NameChanged { old: String, new: String },
    Left { name: String },
    Removed { name: String, cause: RemovalCause },
    /// Sent to the kicked client itself
    Kicked,
    NotConnected,
    Ping,
    Error(ProtocolError),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Welcome { name } => write!(
                f,
                "SYS$Hi {}, you have successfully connected to the chat",
                name
            ),
            Reply::Joined { name } => write!(f, "SYS${} has joined the chat", name),
            Reply::Chat { sender, text } => write!(f, "{}: {}", sender, text),
            Reply::Private { sender, text } => write!(f, "{} (private): {}", sender, text),
            Reply::History { sender, text } => write!(f, "[History] {}: {}", sender, text),
            Reply::Muted { target } => write!(f, "SYS$You have muted {}", target),
            Reply::Unmuted { target } => write!(f, "SYS$You have unmuted {}", target),
            Reply::Renamed { name } => write!(f, "SYS$You are now known as {}", name),
            Reply::NameChanged { old, new } => {
                write!(f, "SYS${} is now known as {}", old, new)
            }
            Reply::Left { name } => write!(f, "SYS${} has left the chat", name),
            Reply::Removed { name, cause } => match cause {
                RemovalCause::Inactive => {
                    write!(f, "SYS${} has been removed from the chat (inactive)", name)
                }
                RemovalCause::Kicked => write!(f, "SYS${} has been removed from the chat", name),
            },
            Reply::Kicked => write!(f, "SYS$You have been removed from the chat"),
            Reply::NotConnected => write!(f, "SYS$You are not connected"),
            Reply::Ping => write!(f, "{}", PING_DATAGRAM),
            Reply::Error(e) => write!(f, "ERR${}", e),
        }
    }
}

impl From<ProtocolError> for Reply {
    fn from(error: ProtocolError) -> Self {
        Reply::Error(error)
    }
}

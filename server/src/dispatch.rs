//! Command handling for the chat server
//!
//! [`ChatState`] owns every piece of mutable chat state (the session registry
//! and the broadcast history). Each inbound datagram and each monitor sweep is
//! applied to it as one step that returns the datagrams to send. It performs no
//! I/O itself, which keeps every step atomic with respect to the others and lets
//! the network layer send after the step is over.

use crate::broadcast::{broadcast_recipients, notice_recipients, private_recipient};
use crate::config::MonitorConfig;
use crate::history::HistoryBuffer;
use crate::monitor::InactivityMonitor;
use crate::outbound::OutboundMessage;
use crate::registry::{Session, SessionRegistry};
use log::{debug, info, warn};
use shared::{parse_datagram, Command, ProtocolError, RemovalCause, Reply};
use std::net::SocketAddr;
use std::time::Instant;

pub struct ChatState {
    registry: SessionRegistry,
    history: HistoryBuffer,
    monitor: InactivityMonitor,
    admin_port: u16,
}

impl ChatState {
    pub fn new(monitor: MonitorConfig, admin_port: u16) -> Self {
        Self {
            registry: SessionRegistry::new(),
            history: HistoryBuffer::new(),
            monitor: InactivityMonitor::new(monitor),
            admin_port,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// Parses and applies one raw datagram from `addr`
    ///
    /// Malformed input yields a single `ERR$` reply to the sender and leaves
    /// all state untouched.
    pub fn handle_datagram(
        &mut self,
        data: &[u8],
        addr: SocketAddr,
        now: Instant,
    ) -> Vec<OutboundMessage> {
        match parse_datagram(data) {
            Ok(command) => {
                debug!("{} -> {:?}", addr, command);
                self.handle_command(command, addr, now)
            }
            Err(e) => {
                warn!("Malformed datagram from {}: {}", addr, e);
                vec![reply(addr, e.into())]
            }
        }
    }

    /// Applies one well-formed command from `addr`
    ///
    /// `conn$` and `kick$` work from any address. Everything else needs a
    /// session, and refreshes its activity clock.
    pub fn handle_command(
        &mut self,
        command: Command,
        addr: SocketAddr,
        now: Instant,
    ) -> Vec<OutboundMessage> {
        let sender = self.registry.find_by_address(&addr).cloned();
        if sender.is_some() {
            self.registry.touch(&addr, now);
        }

        let outgoing = match (command, sender) {
            (Command::Connect { name }, _) => Ok(self.connect(addr, &name, now)),
            (Command::Kick { target }, _) => self.kick(addr, &target),
            (Command::Pong, _) => Ok(Vec::new()),
            (Command::Disconnect, None) => Ok(vec![reply(addr, Reply::NotConnected)]),
            (_, None) => Err(ProtocolError::NotConnected),
            (Command::Broadcast { text }, Some(sender)) => Ok(self.broadcast(&sender, text)),
            (Command::PrivateMessage { target, text }, Some(sender)) => {
                self.private_message(&sender, &target, text)
            }
            (Command::Mute { target }, Some(sender)) => Ok(self.mute(&sender, target)),
            (Command::Unmute { target }, Some(sender)) => self.unmute(&sender, target),
            (Command::Rename { name }, Some(_)) => Ok(self.rename(addr, name)),
            (Command::Disconnect, Some(_)) => Ok(self.disconnect(addr)),
        };

        outgoing.unwrap_or_else(|e| {
            debug!("Rejected command from {}: {}", addr, e);
            vec![reply(addr, e.into())]
        })
    }

    /// Runs one inactivity sweep
    pub fn check_inactivity(&mut self, now: Instant) -> Vec<OutboundMessage> {
        self.monitor.sweep(&mut self.registry, now)
    }

    fn connect(&mut self, addr: SocketAddr, name: &str, now: Instant) -> Vec<OutboundMessage> {
        self.registry.create_or_replace(addr, name, now);

        let mut outgoing: Vec<OutboundMessage> = self
            .history
            .snapshot()
            .into_iter()
            .map(|entry| {
                reply(
                    addr,
                    Reply::History {
                        sender: entry.sender,
                        text: entry.text,
                    },
                )
            })
            .collect();

        outgoing.push(reply(
            addr,
            Reply::Welcome {
                name: name.to_string(),
            },
        ));
        outgoing.extend(fanout(
            notice_recipients(&self.registry, Some(addr)),
            Reply::Joined {
                name: name.to_string(),
            },
        ));

        outgoing
    }

    fn mute(&mut self, sender: &Session, target: String) -> Vec<OutboundMessage> {
        self.registry.set_mute(&sender.addr, &target, true);
        info!("{} muted {}", sender.display_name, target);
        vec![reply(sender.addr, Reply::Muted { target })]
    }

    fn unmute(
        &mut self,
        sender: &Session,
        target: String,
    ) -> Result<Vec<OutboundMessage>, ProtocolError> {
        if self.registry.set_mute(&sender.addr, &target, false) == Some(true) {
            info!("{} unmuted {}", sender.display_name, target);
            Ok(vec![reply(sender.addr, Reply::Unmuted { target })])
        } else {
            Err(ProtocolError::NotMuted(target))
        }
    }

    fn broadcast(&mut self, sender: &Session, text: String) -> Vec<OutboundMessage> {
        if text.is_empty() {
            return Vec::new();
        }

        self.history.append(&sender.display_name, &text);

        fanout(
            broadcast_recipients(&self.registry, sender),
            Reply::Chat {
                sender: sender.display_name.clone(),
                text,
            },
        )
        .into_iter()
        .collect()
    }

    fn private_message(
        &self,
        sender: &Session,
        target: &str,
        text: String,
    ) -> Result<Vec<OutboundMessage>, ProtocolError> {
        match private_recipient(&self.registry, sender, target)? {
            Some(recipient) => Ok(vec![reply(
                recipient,
                Reply::Private {
                    sender: sender.display_name.clone(),
                    text,
                },
            )]),
            None => {
                debug!(
                    "Dropped private message from {}: muted by {}",
                    sender.display_name, target
                );
                Ok(Vec::new())
            }
        }
    }

    fn rename(&mut self, addr: SocketAddr, name: String) -> Vec<OutboundMessage> {
        let Some(old) = self.registry.rename(&addr, &name) else {
            return Vec::new();
        };

        let mut outgoing = vec![reply(addr, Reply::Renamed { name: name.clone() })];
        outgoing.extend(fanout(
            notice_recipients(&self.registry, Some(addr)),
            Reply::NameChanged { old, new: name },
        ));
        outgoing
    }

    fn disconnect(&mut self, addr: SocketAddr) -> Vec<OutboundMessage> {
        let Some(session) = self.registry.remove(&addr) else {
            return Vec::new();
        };

        info!("{} disconnected", session.display_name);
        fanout(
            notice_recipients(&self.registry, None),
            Reply::Left {
                name: session.display_name,
            },
        )
        .into_iter()
        .collect()
    }

    /// Admin-only removal, authorised by the requester's source port
    fn kick(
        &mut self,
        addr: SocketAddr,
        target: &str,
    ) -> Result<Vec<OutboundMessage>, ProtocolError> {
        if addr.port() != self.admin_port {
            return Err(ProtocolError::NotAuthorized);
        }

        let target_addr = self
            .registry
            .find_by_name(target)
            .map(|session| session.addr)
            .ok_or_else(|| ProtocolError::UnknownTarget(target.to_string()))?;

        let Some(removed) = self.registry.remove(&target_addr) else {
            return Ok(Vec::new());
        };
        info!("{} kicked {} ({})", addr, removed.display_name, target_addr);

        let mut outgoing = vec![reply(target_addr, Reply::Kicked)];
        outgoing.extend(fanout(
            notice_recipients(&self.registry, None),
            Reply::Removed {
                name: removed.display_name,
                cause: RemovalCause::Kicked,
            },
        ));
        Ok(outgoing)
    }
}

fn reply(addr: SocketAddr, reply: Reply) -> OutboundMessage {
    OutboundMessage::reply(addr, reply)
}

fn fanout(recipients: Vec<SocketAddr>, reply: Reply) -> Option<OutboundMessage> {
    OutboundMessage::fanout(recipients, reply)
}

//! Liveness probing for silent clients
//!
//! UDP never tells us a client went away, so every session runs a small state
//! machine driven by periodic sweeps:
//!
//! ```text
//! Active --(idle >= inactivity_timeout)--> PingPending --(no reply >= ping_timeout)--> Removed
//!    ^                                          |
//!    +------------(any valid command)-----------+
//! ```
//!
//! The "any valid command" edge is taken by the dispatcher through
//! [`SessionRegistry::touch`]; the monitor only moves sessions forward.

use crate::broadcast::notice_recipients;
use crate::config::MonitorConfig;
use crate::outbound::OutboundMessage;
use crate::registry::SessionRegistry;
use log::info;
use shared::{RemovalCause, Reply};
use std::net::SocketAddr;
use std::time::Instant;

pub struct InactivityMonitor {
    config: MonitorConfig,
}

impl InactivityMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Runs one sweep over every live session
    ///
    /// Idle sessions without an outstanding probe get exactly one `ping$`.
    /// Sessions whose probe went unanswered for `ping_timeout` are removed, and
    /// each remaining session is told once per removed client.
    pub fn sweep(&self, registry: &mut SessionRegistry, now: Instant) -> Vec<OutboundMessage> {
        let mut idle: Vec<SocketAddr> = Vec::new();
        let mut expired: Vec<SocketAddr> = Vec::new();

        for session in registry.sessions_in_join_order() {
            match session.ping_sent_at {
                None => {
                    let silent_for = now.saturating_duration_since(session.last_activity);
                    if silent_for >= self.config.inactivity_timeout {
                        info!(
                            "Pinging {} ({}) after {:.1}s of inactivity",
                            session.display_name,
                            session.addr,
                            silent_for.as_secs_f32()
                        );
                        idle.push(session.addr);
                    }
                }
                Some(sent_at) => {
                    if now.saturating_duration_since(sent_at) >= self.config.ping_timeout {
                        expired.push(session.addr);
                    }
                }
            }
        }

        let mut outgoing = Vec::with_capacity(idle.len());
        for addr in idle {
            registry.mark_pinged(&addr, now);
            outgoing.push(OutboundMessage::reply(addr, Reply::Ping));
        }

        let mut removed_names = Vec::new();
        for addr in expired {
            if let Some(session) = registry.remove(&addr) {
                info!(
                    "Evicting {} ({}): no answer to ping",
                    session.display_name, addr
                );
                removed_names.push(session.display_name);
            }
        }

        let recipients = notice_recipients(registry, None);
        outgoing.extend(removed_names.into_iter().filter_map(|name| {
            OutboundMessage::fanout(
                recipients.clone(),
                Reply::Removed {
                    name,
                    cause: RemovalCause::Inactive,
                },
            )
        }));

        outgoing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn monitor() -> InactivityMonitor {
        InactivityMonitor::new(MonitorConfig {
            interval: Duration::from_secs(1),
            inactivity_timeout: Duration::from_secs(10),
            ping_timeout: Duration::from_secs(5),
        })
    }

    fn pings(outgoing: &[OutboundMessage]) -> Vec<SocketAddr> {
        outgoing
            .iter()
            .filter_map(|message| match message {
                OutboundMessage::SendReply {
                    reply: Reply::Ping,
                    addr,
                } => Some(*addr),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_active_session_untouched() {
        let monitor = monitor();
        let mut registry = SessionRegistry::new();
        let start = Instant::now();
        registry.create_or_replace(addr(1), "Alice", start);

        let outgoing = monitor.sweep(&mut registry, start + Duration::from_secs(9));
        assert!(outgoing.is_empty());
        assert!(!registry.find_by_address(&addr(1)).unwrap().is_ping_pending());
    }

    #[test]
    fn test_idle_session_pinged_once() {
        let monitor = monitor();
        let mut registry = SessionRegistry::new();
        let start = Instant::now();
        registry.create_or_replace(addr(1), "Idle", start);

        let outgoing = monitor.sweep(&mut registry, start + Duration::from_secs(10));
        assert_eq!(pings(&outgoing), vec![addr(1)]);
        assert!(registry.find_by_address(&addr(1)).unwrap().is_ping_pending());

        let outgoing = monitor.sweep(&mut registry, start + Duration::from_secs(12));
        assert!(outgoing.is_empty());
    }

    #[test]
    fn test_unanswered_ping_evicts_and_notifies() {
        let monitor = monitor();
        let mut registry = SessionRegistry::new();
        let start = Instant::now();
        registry.create_or_replace(addr(1), "Idle", start);
        registry.create_or_replace(addr(2), "Active", start);

        let later = start + Duration::from_secs(10);
        registry.touch(&addr(2), later);
        monitor.sweep(&mut registry, later);

        let outgoing = monitor.sweep(&mut registry, later + Duration::from_secs(5));
        assert!(registry.find_by_address(&addr(1)).is_none());
        assert_eq!(registry.len(), 1);

        assert_eq!(outgoing.len(), 1);
        match &outgoing[0] {
            OutboundMessage::Fanout { reply, recipients } => {
                assert_eq!(recipients, &vec![addr(2)]);
                assert!(reply.to_string().contains("Idle has been removed"));
            }
            other => panic!("Unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_activity_cancels_probe() {
        let monitor = monitor();
        let mut registry = SessionRegistry::new();
        let start = Instant::now();
        registry.create_or_replace(addr(1), "Slow", start);

        let pinged_at = start + Duration::from_secs(10);
        monitor.sweep(&mut registry, pinged_at);
        registry.touch(&addr(1), pinged_at + Duration::from_secs(2));

        let outgoing = monitor.sweep(&mut registry, pinged_at + Duration::from_secs(6));
        assert!(outgoing.is_empty());
        assert!(registry.find_by_address(&addr(1)).is_some());

        // Idle clock restarted at the touch, so the next probe comes 10s later
        let outgoing = monitor.sweep(&mut registry, pinged_at + Duration::from_secs(12));
        assert_eq!(pings(&outgoing), vec![addr(1)]);
    }

    #[test]
    fn test_last_session_evicted_silently() {
        let monitor = monitor();
        let mut registry = SessionRegistry::new();
        let start = Instant::now();
        registry.create_or_replace(addr(1), "Alone", start);

        monitor.sweep(&mut registry, start + Duration::from_secs(10));
        let outgoing = monitor.sweep(&mut registry, start + Duration::from_secs(15));

        assert!(registry.is_empty());
        assert!(outgoing.is_empty());
    }
}

//! Session bookkeeping for the chat server
//!
//! UDP has no connections, so the registry is what gives an address a
//! "session": it tracks who is logged in, under which display name, whom they
//! have muted and when they were last heard from. It is the only owner of
//! session state; other components borrow it for the length of one dispatch
//! step and keep addresses, never references.

use log::info;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::time::Instant;

/// One logged-in client, keyed by its network address
#[derive(Debug, Clone)]
pub struct Session {
    /// Join order, assigned by the registry. Lower ids are older sessions.
    pub id: u64,
    /// Network address for sending responses
    pub addr: SocketAddr,
    pub display_name: String,
    /// Display names whose messages this session does not want to receive
    pub muted: HashSet<String>,
    /// Last time we received a valid command from this client
    pub last_activity: Instant,
    /// Set while a liveness probe is outstanding
    pub ping_sent_at: Option<Instant>,
}

impl Session {
    pub fn new(id: u64, addr: SocketAddr, display_name: String, now: Instant) -> Self {
        Self {
            id,
            addr,
            display_name,
            muted: HashSet::new(),
            last_activity: now,
            ping_sent_at: None,
        }
    }

    pub fn is_ping_pending(&self) -> bool {
        self.ping_sent_at.is_some()
    }

    pub fn has_muted(&self, name: &str) -> bool {
        self.muted.contains(name)
    }
}

/// Owns every live session
///
/// At most one session exists per address. Display names are free-form labels
/// and may collide across addresses; lookups by name resolve to the oldest
/// matching session.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: HashMap<SocketAddr, Session>,
    next_session_id: u64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            next_session_id: 1,
        }
    }

    /// Logs `addr` in under `name`
    ///
    /// A repeated login from the same address replaces the old session
    /// outright: the name is reset, the mute list is cleared and the session
    /// gets a fresh id.
    pub fn create_or_replace(&mut self, addr: SocketAddr, name: &str, now: Instant) -> &Session {
        let id = self.next_session_id;
        self.next_session_id += 1;

        let session = Session::new(id, addr, name.to_string(), now);
        match self.sessions.entry(addr) {
            Entry::Occupied(mut entry) => {
                let previous = entry.insert(session);
                info!(
                    "Session {} from {} replaced ({} -> {})",
                    previous.id, addr, previous.display_name, name
                );
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                info!("Session {} created for {} from {}", id, name, addr);
                entry.insert(session)
            }
        }
    }

    pub fn find_by_address(&self, addr: &SocketAddr) -> Option<&Session> {
        self.sessions.get(addr)
    }

    /// Oldest live session currently using `name`
    pub fn find_by_name(&self, name: &str) -> Option<&Session> {
        self.sessions
            .values()
            .filter(|session| session.display_name == name)
            .min_by_key(|session| session.id)
    }

    /// Changes a session's display name, returning the previous one
    pub fn rename(&mut self, addr: &SocketAddr, new_name: &str) -> Option<String> {
        let session = self.sessions.get_mut(addr)?;
        let old_name = std::mem::replace(&mut session.display_name, new_name.to_string());
        info!("Session {} renamed {} -> {}", session.id, old_name, new_name);
        Some(old_name)
    }

    /// Adds or removes `target` from the session's mute list
    ///
    /// Returns whether the list changed, or None for an unknown address.
    pub fn set_mute(&mut self, addr: &SocketAddr, target: &str, muted: bool) -> Option<bool> {
        let session = self.sessions.get_mut(addr)?;
        let changed = if muted {
            session.muted.insert(target.to_string())
        } else {
            session.muted.remove(target)
        };
        Some(changed)
    }

    /// Records activity: refreshes the idle clock and cancels any pending probe
    pub fn touch(&mut self, addr: &SocketAddr, now: Instant) -> bool {
        if let Some(session) = self.sessions.get_mut(addr) {
            session.last_activity = now;
            session.ping_sent_at = None;
            true
        } else {
            false
        }
    }

    /// Records that a liveness probe was just sent
    pub fn mark_pinged(&mut self, addr: &SocketAddr, now: Instant) {
        if let Some(session) = self.sessions.get_mut(addr) {
            session.ping_sent_at = Some(now);
        }
    }

    pub fn remove(&mut self, addr: &SocketAddr) -> Option<Session> {
        let session = self.sessions.remove(addr)?;
        info!("Session {} ({}) removed", session.id, session.display_name);
        Some(session)
    }

    /// Every live session, oldest first
    pub fn sessions_in_join_order(&self) -> impl Iterator<Item = &Session> {
        let mut sessions: Vec<&Session> = self.sessions.values().collect();
        sessions.sort_by_key(|session| session.id);
        sessions.into_iter()
    }

    /// Owned snapshot of every live session, oldest first
    pub fn all_sessions(&self) -> Vec<Session> {
        self.sessions_in_join_order().cloned().collect()
    }

    /// Addresses of every live session, oldest first
    pub fn addresses(&self) -> Vec<SocketAddr> {
        self.sessions_in_join_order()
            .map(|session| session.addr)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    #[test]
    fn test_registry_creation() {
        let registry = SessionRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_create_session() {
        let mut registry = SessionRegistry::new();
        let now = Instant::now();

        let session = registry.create_or_replace(test_addr(), "Alice", now);
        assert_eq!(session.id, 1);
        assert_eq!(session.display_name, "Alice");
        assert!(session.muted.is_empty());
        assert!(!session.is_ping_pending());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_repeat_connect_replaces_session() {
        let mut registry = SessionRegistry::new();
        let now = Instant::now();

        registry.create_or_replace(test_addr(), "Alice", now);
        registry.set_mute(&test_addr(), "Bob", true);

        let session = registry.create_or_replace(test_addr(), "Alicia", now);
        assert_eq!(session.id, 2);
        assert_eq!(session.display_name, "Alicia");
        assert!(session.muted.is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_find_by_address() {
        let mut registry = SessionRegistry::new();
        registry.create_or_replace(test_addr(), "Alice", Instant::now());

        assert!(registry.find_by_address(&test_addr()).is_some());
        assert!(registry.find_by_address(&test_addr2()).is_none());
    }

    #[test]
    fn test_find_by_name_prefers_oldest() {
        let mut registry = SessionRegistry::new();
        let now = Instant::now();

        registry.create_or_replace(test_addr2(), "Sam", now);
        registry.create_or_replace(test_addr(), "Sam", now);

        let found = registry.find_by_name("Sam").unwrap();
        assert_eq!(found.addr, test_addr2());
        assert!(registry.find_by_name("Nobody").is_none());
    }

    #[test]
    fn test_join_order_survives_u32_ids() {
        let mut registry = SessionRegistry::new();
        registry.next_session_id = u64::from(u32::MAX);
        let now = Instant::now();

        registry.create_or_replace(test_addr2(), "Sam", now);
        let newer = registry.create_or_replace(test_addr(), "Sam", now);
        assert_eq!(newer.id, u64::from(u32::MAX) + 1);

        assert_eq!(registry.find_by_name("Sam").unwrap().addr, test_addr2());
        assert_eq!(registry.addresses(), vec![test_addr2(), test_addr()]);
    }

    #[test]
    fn test_rename() {
        let mut registry = SessionRegistry::new();
        registry.create_or_replace(test_addr(), "Alice", Instant::now());

        assert_eq!(registry.rename(&test_addr(), "Alice123"), Some("Alice".to_string()));
        assert!(registry.find_by_name("Alice").is_none());
        assert!(registry.find_by_name("Alice123").is_some());
        assert_eq!(registry.rename(&test_addr2(), "Ghost"), None);
    }

    #[test]
    fn test_set_mute_reports_changes() {
        let mut registry = SessionRegistry::new();
        registry.create_or_replace(test_addr(), "Charlie", Instant::now());

        assert_eq!(registry.set_mute(&test_addr(), "Alice", true), Some(true));
        assert_eq!(registry.set_mute(&test_addr(), "Alice", true), Some(false));
        assert!(registry.find_by_address(&test_addr()).unwrap().has_muted("Alice"));

        assert_eq!(registry.set_mute(&test_addr(), "Alice", false), Some(true));
        assert_eq!(registry.set_mute(&test_addr(), "Alice", false), Some(false));
        assert_eq!(registry.set_mute(&test_addr2(), "Alice", true), None);
    }

    #[test]
    fn test_touch_clears_pending_ping() {
        let mut registry = SessionRegistry::new();
        let start = Instant::now();
        registry.create_or_replace(test_addr(), "Alice", start);

        registry.mark_pinged(&test_addr(), start + Duration::from_secs(5));
        assert!(registry.find_by_address(&test_addr()).unwrap().is_ping_pending());

        let later = start + Duration::from_secs(6);
        assert!(registry.touch(&test_addr(), later));

        let session = registry.find_by_address(&test_addr()).unwrap();
        assert!(!session.is_ping_pending());
        assert_eq!(session.last_activity, later);
        assert!(!registry.touch(&test_addr2(), later));
    }

    #[test]
    fn test_remove() {
        let mut registry = SessionRegistry::new();
        registry.create_or_replace(test_addr(), "Alice", Instant::now());

        let removed = registry.remove(&test_addr()).unwrap();
        assert_eq!(removed.display_name, "Alice");
        assert!(registry.is_empty());
        assert!(registry.remove(&test_addr()).is_none());
    }

    #[test]
    fn test_sessions_in_join_order() {
        let mut registry = SessionRegistry::new();
        let now = Instant::now();
        let addr3: SocketAddr = "192.168.1.1:9999".parse().unwrap();

        registry.create_or_replace(addr3, "First", now);
        registry.create_or_replace(test_addr(), "Second", now);
        registry.create_or_replace(test_addr2(), "Third", now);

        let names: Vec<&str> = registry
            .sessions_in_join_order()
            .map(|session| session.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["First", "Second", "Third"]);
        assert_eq!(registry.addresses(), vec![addr3, test_addr(), test_addr2()]);
    }

    #[test]
    fn test_all_sessions_is_a_snapshot() {
        let mut registry = SessionRegistry::new();
        let now = Instant::now();
        let addr3: SocketAddr = "192.168.1.1:9999".parse().unwrap();

        registry.create_or_replace(addr3, "First", now);
        registry.create_or_replace(test_addr(), "Second", now);
        registry.create_or_replace(test_addr2(), "Third", now);

        let snapshot = registry.all_sessions();
        registry.set_mute(&test_addr(), "First", true);
        registry.remove(&addr3);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].display_name, "First");
        assert!(!snapshot[1].has_muted("First"));
        assert_eq!(registry.addresses(), vec![test_addr(), test_addr2()]);
    }
}

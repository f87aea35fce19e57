//! Per-connection state (spec §3 Session, §4.D).
//!
//! A `Session` never touches a socket directly — it only owns the data the
//! registry and dispatcher mutate. The event loop (`server.rs`) is the sole
//! owner of the real transport and pulls queued lines out of a session with
//! `drain_outbox` to hand to the socket.

use std::collections::{HashSet, VecDeque};
use std::time::Instant;

pub type SessionId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Unregistered,
    Registered,
}

#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub host: String,
    pub port: u16,
    pub nick: Option<String>,
    pub user: Option<String>,
    pub realname: Option<String>,
    /// Lowercased channel names this session has joined. Never stores a
    /// direct channel handle (spec §9 "weak references via indirection") —
    /// all lookups go through the registry's `by_channel` map.
    pub channels: HashSet<String>,
    write_queue: VecDeque<String>,
    pub last_activity: Instant,
    pub last_ping_sent: Instant,
    pub ping_pending: bool,
    pub state: RegistrationState,
}

impl Session {
    pub fn new(id: SessionId, host: String, port: u16, now: Instant) -> Self {
        Session {
            id,
            host,
            port,
            nick: None,
            user: None,
            realname: None,
            channels: HashSet::new(),
            write_queue: VecDeque::new(),
            last_activity: now,
            last_ping_sent: now,
            ping_pending: false,
            state: RegistrationState::Unregistered,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.state == RegistrationState::Registered
    }

    /// Appends one already CRLF-terminated line to the write queue.
    /// Idempotent in the sense that it never drops or reorders prior
    /// queued lines (spec §4.D enqueue).
    pub fn enqueue(&mut self, line: String) {
        debug_assert!(line.ends_with("\r\n"));
        self.write_queue.push_back(line);
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.write_queue.is_empty()
    }

    /// Drains the whole queue as one contiguous buffer, in enqueue order,
    /// for a single `write_all` by the event loop.
    pub fn drain_outbox(&mut self) -> String {
        let mut out = String::new();
        while let Some(line) = self.write_queue.pop_front() {
            out.push_str(&line);
        }
        out
    }

    /// The `nick!user@host` source used for client-originated broadcasts
    /// (spec §4.C). Falls back to empty fields before registration
    /// completes; in practice every caller of this is already registered.
    pub fn source(&self) -> String {
        format!(
            "{}!{}@{}",
            self.nick.as_deref().unwrap_or(""),
            self.user.as_deref().unwrap_or(""),
            self.host
        )
    }

    pub fn touch_activity(&mut self, now: Instant) {
        self.last_activity = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_preserves_order_and_drains_once() {
        let mut s = Session::new(1, "host".into(), 1234, Instant::now());
        s.enqueue("a\r\n".into());
        s.enqueue("b\r\n".into());
        assert!(s.has_pending_writes());
        assert_eq!(s.drain_outbox(), "a\r\nb\r\n");
        assert!(!s.has_pending_writes());
    }

    #[test]
    fn source_formats_nick_user_host() {
        let mut s = Session::new(1, "example.com".into(), 1234, Instant::now());
        s.nick = Some("alice".into());
        s.user = Some("alice".into());
        assert_eq!(s.source(), "alice!alice@example.com");
    }
}

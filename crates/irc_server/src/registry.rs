//! The authoritative in-memory directory (spec §3 Registry, §4.E).
//!
//! Exclusively owned by the event loop's single thread of control — see
//! spec §5. No locks, no `Arc`, no interior mutability: every map here is a
//! plain `HashMap` mutated in place.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use crate::channel::Channel;
use crate::session::{Session, SessionId};

#[derive(Debug, Default)]
pub struct Registry {
    by_session: HashMap<SessionId, Session>,
    /// Lowercased nick -> session id (spec invariant 1: case-insensitive
    /// claim, canonical case is kept on the `Session` itself).
    by_nick: HashMap<String, SessionId>,
    /// Lowercased channel name -> channel.
    by_channel: HashMap<String, Channel>,
}

pub enum ClaimNickError {
    Empty,
    TooLong,
    BadFirstChar,
    BadChar,
    InUse,
    /// The session already holds a nickname. Rename is forbidden in this
    /// core (spec §9, SPEC_FULL.md §D.5) — reported distinctly from `InUse`
    /// so the dispatcher can reuse 432 rather than 433 for it.
    AlreadyNicked,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    pub fn attach(&mut self, session: Session) {
        self.by_session.insert(session.id, session);
    }

    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.by_session.get(&id)
    }

    pub fn session_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.by_session.get_mut(&id)
    }

    pub fn session_count(&self) -> usize {
        self.by_session.len()
    }

    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.by_session.values()
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.by_session.keys().copied().collect()
    }

    pub fn find_by_nick(&self, nick: &str) -> Option<SessionId> {
        self.by_nick.get(&nick.to_ascii_lowercase()).copied()
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.by_channel.get(&name.to_ascii_lowercase())
    }

    pub fn channel_exists(&self, name: &str) -> bool {
        self.by_channel.contains_key(&name.to_ascii_lowercase())
    }

    /// Validates and claims `nick` for `id` (spec §4.F NICK contract). A
    /// session may claim a nickname at most once in this core — a second
    /// NICK from an already-nicked session is treated the same as a taken
    /// nickname attempt (see SPEC_FULL.md §D.5).
    pub fn claim_nick(&mut self, id: SessionId, nick: &str) -> Result<(), ClaimNickError> {
        let trimmed = nick.trim();
        if trimmed.is_empty() {
            return Err(ClaimNickError::Empty);
        }
        if trimmed.len() > crate::constants::MAX_NICK_LEN {
            return Err(ClaimNickError::TooLong);
        }
        if trimmed
            .chars()
            .next()
            .is_some_and(|c| crate::constants::NICK_FORBIDDEN_FIRST_CHARS.contains(&c))
        {
            return Err(ClaimNickError::BadFirstChar);
        }
        if trimmed
            .chars()
            .any(|c| crate::constants::NICK_FORBIDDEN_CHARS.contains(&c))
        {
            return Err(ClaimNickError::BadChar);
        }

        // Check `InUse` before `AlreadyNicked` (SPEC_FULL.md §D.5): a
        // re-nick attempt against a name genuinely held by someone else
        // must still report 433, not 432. A re-nick to the session's own
        // already-claimed name is not "in use by someone else", so it falls
        // through to the `AlreadyNicked` check below instead.
        let lowered = trimmed.to_ascii_lowercase();
        if self.by_nick.get(&lowered).is_some_and(|&owner| owner != id) {
            return Err(ClaimNickError::InUse);
        }

        let already_has_nick = self
            .by_session
            .get(&id)
            .is_some_and(|s| s.nick.is_some());
        if already_has_nick {
            return Err(ClaimNickError::AlreadyNicked);
        }

        if let Some(session) = self.by_session.get_mut(&id) {
            session.nick = Some(trimmed.to_string());
        }
        self.by_nick.insert(lowered, id);
        Ok(())
    }

    /// Adds `id` (by its current nick) to channel `name`, creating the
    /// channel if this is its first member (spec §4.E add_to_channel).
    pub fn add_to_channel(&mut self, id: SessionId, name: &str) {
        let Some(nick) = self.by_session.get(&id).and_then(|s| s.nick.clone()) else {
            return;
        };
        let key = name.to_ascii_lowercase();
        let channel = self
            .by_channel
            .entry(key)
            .or_insert_with(|| Channel::new(name.to_string()));
        channel.members.insert(nick);
        if let Some(session) = self.by_session.get_mut(&id) {
            session.channels.insert(name.to_ascii_lowercase());
        }
    }

    /// Removes `id` from channel `name`; deletes the channel once it is
    /// left with no members (spec invariant 4).
    pub fn remove_from_channel(&mut self, id: SessionId, name: &str) {
        let Some(nick) = self.by_session.get(&id).and_then(|s| s.nick.clone()) else {
            return;
        };
        let key = name.to_ascii_lowercase();
        let mut now_empty = false;
        if let Some(channel) = self.by_channel.get_mut(&key) {
            channel.members.remove(&nick);
            now_empty = channel.is_empty();
        }
        if now_empty {
            self.by_channel.remove(&key);
        }
        if let Some(session) = self.by_session.get_mut(&id) {
            session.channels.remove(&key);
        }
    }

    /// Returns the distinct set of canonical-case peer nicknames sharing
    /// at least one channel with `id`, excluding `id` itself. Used by QUIT
    /// to notify each peer exactly once even when co-resident in several
    /// shared channels (spec §9 de-duplication decision).
    pub fn channel_peers(&self, id: SessionId) -> HashSet<SessionId> {
        let mut peers = HashSet::new();
        let Some(session) = self.by_session.get(&id) else {
            return peers;
        };
        for chan_key in &session.channels {
            if let Some(channel) = self.by_channel.get(chan_key) {
                for nick in &channel.members {
                    if let Some(peer_id) = self.find_by_nick(nick) {
                        if peer_id != id {
                            peers.insert(peer_id);
                        }
                    }
                }
            }
        }
        peers
    }

    /// Removes `id` from every channel it joined (cascading empty-channel
    /// deletion), its nick entry, and its session entry (spec §4.E detach).
    /// Does not touch the transport — the event loop closes the socket
    /// itself once this returns.
    pub fn detach(&mut self, id: SessionId) {
        let joined: Vec<String> = self
            .by_session
            .get(&id)
            .map(|s| s.channels.iter().cloned().collect())
            .unwrap_or_default();
        for chan_key in joined {
            if let Some(channel) = self.by_channel.get_mut(&chan_key) {
                if let Some(session) = self.by_session.get(&id) {
                    if let Some(nick) = &session.nick {
                        channel.members.remove(nick);
                    }
                }
                if channel.is_empty() {
                    self.by_channel.remove(&chan_key);
                }
            }
        }
        if let Some(session) = self.by_session.get(&id) {
            if let Some(nick) = &session.nick {
                self.by_nick.remove(&nick.to_ascii_lowercase());
            }
        }
        self.by_session.remove(&id);
    }

    pub fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attach_session(reg: &mut Registry, id: SessionId) {
        reg.attach(Session::new(id, "host".into(), 1234, Instant::now()));
    }

    #[test]
    fn nick_claim_is_case_insensitive_unique() {
        let mut reg = Registry::new();
        attach_session(&mut reg, 1);
        attach_session(&mut reg, 2);
        assert!(reg.claim_nick(1, "bob").is_ok());
        assert!(matches!(
            reg.claim_nick(2, "BOB"),
            Err(ClaimNickError::InUse)
        ));
    }

    #[test]
    fn second_nick_from_same_session_is_rejected() {
        let mut reg = Registry::new();
        attach_session(&mut reg, 1);
        assert!(reg.claim_nick(1, "alice").is_ok());
        assert!(matches!(
            reg.claim_nick(1, "alice2"),
            Err(ClaimNickError::AlreadyNicked)
        ));
    }

    #[test]
    fn re_nick_to_a_name_taken_by_someone_else_reports_in_use() {
        let mut reg = Registry::new();
        attach_session(&mut reg, 1);
        attach_session(&mut reg, 2);
        assert!(reg.claim_nick(1, "alice").is_ok());
        assert!(reg.claim_nick(2, "bob").is_ok());
        assert!(matches!(
            reg.claim_nick(2, "ALICE"),
            Err(ClaimNickError::InUse)
        ));
    }

    #[test]
    fn re_nick_to_own_current_name_reports_already_nicked() {
        let mut reg = Registry::new();
        attach_session(&mut reg, 1);
        assert!(reg.claim_nick(1, "alice").is_ok());
        assert!(matches!(
            reg.claim_nick(1, "alice"),
            Err(ClaimNickError::AlreadyNicked)
        ));
    }

    #[test]
    fn channel_is_removed_once_membership_empties() {
        let mut reg = Registry::new();
        attach_session(&mut reg, 1);
        reg.claim_nick(1, "alice").unwrap();
        reg.add_to_channel(1, "room");
        assert!(reg.channel_exists("room"));
        reg.remove_from_channel(1, "room");
        assert!(!reg.channel_exists("room"));
    }

    #[test]
    fn detach_cascades_through_channels_and_nick() {
        let mut reg = Registry::new();
        attach_session(&mut reg, 1);
        attach_session(&mut reg, 2);
        reg.claim_nick(1, "alice").unwrap();
        reg.claim_nick(2, "bob").unwrap();
        reg.add_to_channel(1, "room");
        reg.add_to_channel(2, "room");

        reg.detach(1);
        assert!(reg.session(1).is_none());
        assert!(reg.find_by_nick("alice").is_none());
        assert!(reg.channel_exists("room"));
        assert_eq!(reg.channel("room").unwrap().members.len(), 1);

        reg.detach(2);
        assert!(!reg.channel_exists("room"));
    }

    #[test]
    fn channel_peers_deduplicates_across_shared_channels() {
        let mut reg = Registry::new();
        attach_session(&mut reg, 1);
        attach_session(&mut reg, 2);
        reg.claim_nick(1, "alice").unwrap();
        reg.claim_nick(2, "bob").unwrap();
        reg.add_to_channel(1, "room1");
        reg.add_to_channel(2, "room1");
        reg.add_to_channel(1, "room2");
        reg.add_to_channel(2, "room2");

        let peers = reg.channel_peers(1);
        assert_eq!(peers.len(), 1);
        assert!(peers.contains(&2));
    }
}

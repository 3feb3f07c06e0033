//! Authoritative participant roster for the replication server
//!
//! This module owns every connected participant and is the only place their
//! state changes:
//! - Participant lifecycle (join, explicit leave, activity timeout)
//! - Last reported pose and display name (last writer wins)
//! - Activity tracking that drives timeout eviction
//! - Capacity enforcement and address lookup for id-less messages
//!
//! The roster is mutated exclusively from the server tick. Replication and the
//! lobby trigger only read it.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use shared::{Outbound, Pose, WireMessage};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// One connected session
///
/// Each participant carries:
/// - The id it chose, stable for the life of the session
/// - Its display name and last reported pose
/// - The address replication is unicast to
/// - The last time any valid message arrived from it
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub pose: Pose,
    pub addr: SocketAddr,
    pub last_seen: Instant,
}

impl Participant {
    /// Creates a participant standing at the spawn pose
    pub fn new(id: String, name: String, addr: SocketAddr, now: Instant) -> Self {
        Self {
            id,
            name,
            pose: Pose::SPAWN,
            addr,
            last_seen: now,
        }
    }

    /// Checks whether the participant has been silent for longer than `timeout`
    pub fn is_timed_out(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > timeout
    }

    pub fn snapshot(&self) -> ParticipantSnapshot {
        ParticipantSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            pose: self.pose,
        }
    }
}

/// Read-only view of a participant for presentation layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantSnapshot {
    pub id: String,
    pub name: String,
    pub pose: Pose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The id is already in the roster
    Duplicate,
    /// The roster is at capacity
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    Rejected(RejectReason),
}

/// Table of connected participants keyed by id
pub struct Roster {
    participants: HashMap<String, Participant>,
    max_participants: usize,
}

impl Roster {
    /// Creates an empty roster with the given capacity
    pub fn new(max_participants: usize) -> Self {
        Self {
            participants: HashMap::new(),
            max_participants,
        }
    }

    /// Adds a participant
    ///
    /// Joining with an id that is already present is not an error: the
    /// request is logged and ignored, so retransmitted join messages are
    /// harmless.
    pub fn join(&mut self, id: &str, name: &str, addr: SocketAddr, now: Instant) -> JoinOutcome {
        if self.participants.contains_key(id) {
            warn!("Ignoring duplicate join for participant {}", id);
            return JoinOutcome::Rejected(RejectReason::Duplicate);
        }

        if self.participants.len() >= self.max_participants {
            warn!(
                "Rejecting participant {} from {}: roster full ({})",
                id, addr, self.max_participants
            );
            return JoinOutcome::Rejected(RejectReason::Full);
        }

        info!("Participant {} ({}) joined from {}", id, name, addr);
        self.participants.insert(
            id.to_string(),
            Participant::new(id.to_string(), name.to_string(), addr, now),
        );
        JoinOutcome::Joined
    }

    /// Stores the latest pose; returns false for unknown ids
    pub fn update_pose(&mut self, id: &str, pose: Pose) -> bool {
        match self.participants.get_mut(id) {
            Some(participant) => {
                participant.pose = pose;
                true
            }
            None => {
                warn!("Pose update for unknown participant {}", id);
                false
            }
        }
    }

    /// Refreshes activity for a participant; returns false for unknown ids
    pub fn touch(&mut self, id: &str, now: Instant) -> bool {
        match self.participants.get_mut(id) {
            Some(participant) => {
                participant.last_seen = now;
                true
            }
            None => false,
        }
    }

    /// Refreshes activity for whoever joined from `addr`
    pub fn touch_addr(&mut self, addr: SocketAddr, now: Instant) -> Option<String> {
        let id = self.find_by_addr(addr)?.id.clone();
        self.touch(&id, now);
        Some(id)
    }

    /// Finds the participant that joined from `addr`
    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<&Participant> {
        self.participants.values().find(|p| p.addr == addr)
    }

    /// Changes a display name and returns the `NameUpdate` broadcast
    ///
    /// Unknown ids produce a warning and no messages.
    pub fn rename(&mut self, id: &str, name: &str) -> Vec<Outbound> {
        match self.participants.get_mut(id) {
            Some(participant) => {
                info!("Participant {} renamed to {}", id, name);
                participant.name = name.to_string();
            }
            None => {
                warn!("Rename for unknown participant {}", id);
                return Vec::new();
            }
        }

        self.broadcast(&WireMessage::NameUpdate {
            id: id.to_string(),
            name: name.to_string(),
        })
    }

    /// Removes a participant
    pub fn remove(&mut self, id: &str) -> Option<Participant> {
        let removed = self.participants.remove(id);
        if removed.is_some() {
            info!("Participant {} left", id);
        }
        removed
    }

    /// Evicts every participant silent for longer than `threshold`
    ///
    /// Returns the evicted participants so the caller can notify the rest.
    pub fn sweep_timeouts(&mut self, now: Instant, threshold: Duration) -> Vec<Participant> {
        let timed_out: Vec<String> = self
            .participants
            .values()
            .filter(|p| p.is_timed_out(now, threshold))
            .map(|p| p.id.clone())
            .collect();

        timed_out
            .iter()
            .filter_map(|id| self.participants.remove(id))
            .inspect(|p| info!("Participant {} timed out", p.id))
            .collect()
    }

    /// Addresses one message to every participant
    pub fn broadcast(&self, message: &WireMessage) -> Vec<Outbound> {
        self.participants
            .values()
            .map(|p| Outbound {
                message: message.clone(),
                addr: p.addr,
            })
            .collect()
    }

    /// Every participant's pose sent to every participant, self included
    pub fn pose_fan_out(&self) -> Vec<Outbound> {
        self.fan_out(|sender| WireMessage::PoseUpdate {
            id: sender.id.clone(),
            pose: sender.pose,
        })
    }

    /// Every participant's name sent to every participant, self included
    pub fn name_fan_out(&self) -> Vec<Outbound> {
        self.fan_out(|sender| WireMessage::NameUpdate {
            id: sender.id.clone(),
            name: sender.name.clone(),
        })
    }

    fn fan_out(&self, message_for: impl Fn(&Participant) -> WireMessage) -> Vec<Outbound> {
        let mut outbox = Vec::with_capacity(self.participants.len() * self.participants.len());
        for sender in self.participants.values() {
            let message = message_for(sender);
            for receiver in self.participants.values() {
                outbox.push(Outbound {
                    message: message.clone(),
                    addr: receiver.addr,
                });
            }
        }
        outbox
    }

    pub fn get(&self, id: &str) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    /// Participants sorted by id
    pub fn snapshot(&self) -> Vec<ParticipantSnapshot> {
        let mut snapshot: Vec<ParticipantSnapshot> =
            self.participants.values().map(Participant::snapshot).collect();
        snapshot.sort_by(|a, b| a.id.cmp(&b.id));
        snapshot
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Vec3;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    fn test_addr3() -> SocketAddr {
        "127.0.0.1:8082".parse().unwrap()
    }

    #[test]
    fn test_participant_creation() {
        let now = Instant::now();
        let participant = Participant::new("42".into(), "Ann".into(), test_addr(), now);

        assert_eq!(participant.id, "42");
        assert_eq!(participant.name, "Ann");
        assert_eq!(participant.pose, Pose::SPAWN);
        assert_eq!(participant.addr, test_addr());
    }

    #[test]
    fn test_participant_timeout() {
        let start = Instant::now();
        let participant = Participant::new("1".into(), "A".into(), test_addr(), start);

        assert!(!participant.is_timed_out(start + Duration::from_millis(500), Duration::from_secs(1)));
        assert!(!participant.is_timed_out(start + Duration::from_secs(1), Duration::from_secs(1)));
        assert!(participant.is_timed_out(start + Duration::from_secs(2), Duration::from_secs(1)));
    }

    #[test]
    fn test_join() {
        let mut roster = Roster::new(4);
        let outcome = roster.join("42", "Ann", test_addr(), Instant::now());

        assert_eq!(outcome, JoinOutcome::Joined);
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.get("42").unwrap().name, "Ann");
    }

    #[test]
    fn test_duplicate_join_is_idempotent() {
        let mut roster = Roster::new(4);
        let now = Instant::now();
        roster.join("42", "Ann", test_addr(), now);
        let outcome = roster.join("42", "Bob", test_addr2(), now);

        assert_eq!(outcome, JoinOutcome::Rejected(RejectReason::Duplicate));
        assert_eq!(roster.len(), 1);
        let participant = roster.get("42").unwrap();
        assert_eq!(participant.name, "Ann");
        assert_eq!(participant.addr, test_addr());
    }

    #[test]
    fn test_join_max_capacity() {
        let mut roster = Roster::new(1);
        let now = Instant::now();

        assert_eq!(roster.join("1", "A", test_addr(), now), JoinOutcome::Joined);
        assert_eq!(
            roster.join("2", "B", test_addr2(), now),
            JoinOutcome::Rejected(RejectReason::Full)
        );
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_update_pose() {
        let mut roster = Roster::new(4);
        roster.join("1", "A", test_addr(), Instant::now());
        let pose = Pose::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 90.0, 0.0));

        assert!(roster.update_pose("1", pose));
        assert_eq!(roster.get("1").unwrap().pose, pose);
    }

    #[test]
    fn test_update_pose_unknown_id() {
        let mut roster = Roster::new(4);
        assert!(!roster.update_pose("ghost", Pose::SPAWN));
        assert!(roster.is_empty());
    }

    #[test]
    fn test_touch_and_touch_addr() {
        let start = Instant::now();
        let mut roster = Roster::new(4);
        roster.join("1", "A", test_addr(), start);

        let later = start + Duration::from_secs(3);
        assert!(roster.touch("1", later));
        assert_eq!(roster.get("1").unwrap().last_seen, later);
        assert!(!roster.touch("2", later));

        let even_later = later + Duration::from_secs(1);
        assert_eq!(roster.touch_addr(test_addr(), even_later), Some("1".to_string()));
        assert_eq!(roster.get("1").unwrap().last_seen, even_later);
        assert_eq!(roster.touch_addr(test_addr2(), even_later), None);
    }

    #[test]
    fn test_find_by_addr() {
        let mut roster = Roster::new(4);
        let now = Instant::now();
        roster.join("1", "A", test_addr(), now);
        roster.join("2", "B", test_addr2(), now);

        assert_eq!(roster.find_by_addr(test_addr2()).unwrap().id, "2");
        assert!(roster.find_by_addr(test_addr3()).is_none());
    }

    #[test]
    fn test_rename_broadcasts_to_everyone() {
        let mut roster = Roster::new(4);
        let now = Instant::now();
        roster.join("1", "A", test_addr(), now);
        roster.join("2", "B", test_addr2(), now);

        let outbox = roster.rename("1", "Alice");
        assert_eq!(roster.get("1").unwrap().name, "Alice");
        assert_eq!(outbox.len(), 2);
        for outbound in &outbox {
            assert_eq!(
                outbound.message,
                WireMessage::NameUpdate {
                    id: "1".into(),
                    name: "Alice".into()
                }
            );
        }
        let mut addrs: Vec<SocketAddr> = outbox.iter().map(|o| o.addr).collect();
        addrs.sort();
        assert_eq!(addrs, vec![test_addr(), test_addr2()]);
    }

    #[test]
    fn test_rename_unknown_id() {
        let mut roster = Roster::new(4);
        assert!(roster.rename("ghost", "Casper").is_empty());
    }

    #[test]
    fn test_remove() {
        let mut roster = Roster::new(4);
        roster.join("1", "A", test_addr(), Instant::now());

        assert!(roster.remove("1").is_some());
        assert!(roster.remove("1").is_none());
        assert!(roster.is_empty());
    }

    #[test]
    fn test_sweep_timeouts() {
        let start = Instant::now();
        let mut roster = Roster::new(4);
        roster.join("stale", "A", test_addr(), start);
        roster.join("fresh", "B", test_addr2(), start);

        let now = start + Duration::from_secs(6);
        roster.touch("fresh", now);

        let evicted = roster.sweep_timeouts(now, Duration::from_secs(5));
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].id, "stale");
        assert_eq!(roster.len(), 1);
        assert!(roster.get("fresh").is_some());

        assert!(roster.sweep_timeouts(now, Duration::from_secs(5)).is_empty());
    }

    #[test]
    fn test_pose_fan_out_is_n_squared() {
        let mut roster = Roster::new(8);
        let now = Instant::now();
        roster.join("1", "A", test_addr(), now);
        roster.join("2", "B", test_addr2(), now);
        roster.join("3", "C", test_addr3(), now);

        let outbox = roster.pose_fan_out();
        assert_eq!(outbox.len(), 9);

        for receiver in [test_addr(), test_addr2(), test_addr3()] {
            let mut senders: Vec<String> = outbox
                .iter()
                .filter(|o| o.addr == receiver)
                .map(|o| match &o.message {
                    WireMessage::PoseUpdate { id, .. } => id.clone(),
                    other => panic!("Unexpected message {:?}", other),
                })
                .collect();
            senders.sort();
            assert_eq!(senders, vec!["1", "2", "3"]);
        }
    }

    #[test]
    fn test_name_fan_out() {
        let mut roster = Roster::new(8);
        let now = Instant::now();
        roster.join("1", "A", test_addr(), now);
        roster.join("2", "B", test_addr2(), now);

        let outbox = roster.name_fan_out();
        assert_eq!(outbox.len(), 4);
        assert!(outbox
            .iter()
            .all(|o| matches!(o.message, WireMessage::NameUpdate { .. })));
    }

    #[test]
    fn test_snapshot_sorted_by_id() {
        let mut roster = Roster::new(8);
        let now = Instant::now();
        roster.join("b", "Bob", test_addr(), now);
        roster.join("a", "Ann", test_addr2(), now);

        let snapshot = roster.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].id, "a");
        assert_eq!(snapshot[0].name, "Ann");
        assert_eq!(snapshot[1].id, "b");
    }
}

//! Server-side game state: message handling and the periodic actions
//!
//! Everything here runs on the server tick and performs no I/O. Replies and
//! broadcasts are queued in an outbox that the network layer flushes.

use crate::config::ServerConfig;
use crate::phase::{ServerPhase, TransitionController};
use crate::roster::{JoinOutcome, RejectReason, Roster};
use log::{debug, info, warn};
use shared::{MapName, Outbound, SceneTransition, WireMessage};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Everything the server tick owns
///
/// Handlers never send directly; they queue [`Outbound`] messages that the
/// network layer flushes after each step.
pub struct GameState {
    pub tick: u64,
    roster: Roster,
    transition: TransitionController,
    scene: Box<dyn SceneTransition>,
    outbox: Vec<Outbound>,
}

impl GameState {
    pub fn new(config: &ServerConfig, mut scene: Box<dyn SceneTransition>) -> Self {
        scene.instantiate(MapName::Lobby);

        Self {
            tick: 0,
            roster: Roster::new(config.max_participants),
            transition: TransitionController::new(config.trigger_point, config.trigger_radius),
            scene,
            outbox: Vec::new(),
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn phase(&self) -> ServerPhase {
        self.transition.phase()
    }

    /// Applies one inbound message
    pub fn handle_message(&mut self, message: WireMessage, from: SocketAddr, now: Instant) {
        match message {
            WireMessage::Ping => {
                self.roster.touch_addr(from, now);
                self.send(WireMessage::Pong, from);
            }

            WireMessage::MapRequest => {
                self.roster.touch_addr(from, now);
                let phase = self.phase().map_name();
                self.send(WireMessage::MapPhase(phase), from);
            }

            WireMessage::JoinRequest { id, name } => {
                match self.roster.join(&id, &name, from, now) {
                    JoinOutcome::Joined => {}
                    JoinOutcome::Rejected(RejectReason::Duplicate) => {
                        // Only the registered address keeps an entry alive; a
                        // restarted client waits for the old one to time out.
                        match self.roster.get(&id) {
                            Some(existing) if existing.addr == from => {
                                self.roster.touch(&id, now);
                            }
                            Some(existing) => warn!(
                                "Participant {} is registered from {}, not {}",
                                id, existing.addr, from
                            ),
                            None => {}
                        }
                    }
                    JoinOutcome::Rejected(RejectReason::Full) => {}
                }
            }

            WireMessage::PoseUpdate { id, pose } => {
                if self.roster.update_pose(&id, pose) {
                    self.roster.touch(&id, now);
                } else {
                    // Tells an evicted sender to join again
                    self.send(WireMessage::LeaveNotice { id }, from);
                }
            }

            WireMessage::NameUpdate { id, name } => {
                self.roster.touch(&id, now);
                let outbox = self.roster.rename(&id, &name);
                self.outbox.extend(outbox);
            }

            WireMessage::LeaveNotice { id } => {
                if self.roster.remove(&id).is_some() {
                    self.broadcast(WireMessage::LeaveNotice { id });
                } else {
                    debug!("Leave notice for unknown participant {}", id);
                }
            }

            WireMessage::SpawnRequest => match self.roster.touch_addr(from, now) {
                Some(id) => {
                    debug!("Acknowledging spawn for participant {}", id);
                    self.send(WireMessage::SpawnAck, from);
                }
                None => warn!("Spawn request from {} before joining", from),
            },

            WireMessage::Pong | WireMessage::MapPhase(_) | WireMessage::SpawnAck => {
                warn!("Unexpected {} message from {}", message.tag(), from);
            }
        }
    }

    /// Queues every participant's pose for every participant
    pub fn replicate_poses(&mut self) {
        let outbox = self.roster.pose_fan_out();
        self.outbox.extend(outbox);
        self.tick += 1;
    }

    /// Re-sends every name and the current phase to everyone
    ///
    /// Repairs clients that joined after a rename or lost a phase broadcast.
    pub fn refresh(&mut self) {
        let names = self.roster.name_fan_out();
        self.outbox.extend(names);
        self.broadcast(WireMessage::MapPhase(self.phase().map_name()));
    }

    /// Evicts silent participants and tells the rest
    ///
    /// The evicted participant is told too, in case it is still alive.
    pub fn sweep_timeouts(&mut self, now: Instant, threshold: Duration) {
        for evicted in self.roster.sweep_timeouts(now, threshold) {
            let notice = WireMessage::LeaveNotice { id: evicted.id };
            self.broadcast(notice.clone());
            self.send(notice, evicted.addr);
        }
    }

    /// Runs the lobby trigger and performs the one-time map transition
    pub fn check_transition(&mut self) {
        if !self.transition.check(&self.roster) {
            return;
        }

        self.broadcast(WireMessage::MapPhase(MapName::FirstMap));
        self.scene.instantiate(MapName::FirstMap);
        self.scene.tear_down(MapName::Lobby);
        info!("Map transition to {} complete", MapName::FirstMap);
    }

    /// Hands queued messages to the network layer
    pub fn take_outbox(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    fn send(&mut self, message: WireMessage, addr: SocketAddr) {
        self.outbox.push(Outbound { message, addr });
    }

    fn broadcast(&mut self, message: WireMessage) {
        let outbox = self.roster.broadcast(&message);
        self.outbox.extend(outbox);
    }
}

//! Client-side session state machine
//!
//! Connectivity advances `Disconnected -> Awaiting -> Connected` and the map
//! stage advances `Unloaded -> Lobby -> ActiveMap`. Neither ever moves back
//! within one session. The session is plain data driven by two kinds of input:
//! timer ticks, which return the messages to send, and decoded messages from
//! the server, which update the remote mirror and call into the
//! presentation collaborators.

use crate::presentation::{AvatarFactory, PoseProvider};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use shared::{is_valid_name, MapName, Pose, SceneTransition, WireMessage};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectionPhase {
    Disconnected,
    /// A ping is out and no pong has arrived yet
    Awaiting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MapPhase {
    Unloaded,
    Lobby,
    ActiveMap,
}

impl From<MapName> for MapPhase {
    fn from(map: MapName) -> Self {
        match map {
            MapName::Lobby => MapPhase::Lobby,
            MapName::FirstMap => MapPhase::ActiveMap,
        }
    }
}

/// Local mirror of one remote participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAvatar {
    pub id: String,
    pub name: String,
    pub pose: Pose,
}

pub struct Session {
    phase: ConnectionPhase,
    map_phase: MapPhase,
    local_id: String,
    local_name: String,
    spawned: bool,
    remotes: HashMap<String, RemoteAvatar>,
    // Names that arrived before the first pose of their participant
    pending_names: HashMap<String, String>,
}

impl Session {
    pub fn new(local_id: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            phase: ConnectionPhase::Disconnected,
            map_phase: MapPhase::Unloaded,
            local_id: local_id.into(),
            local_name: local_name.into(),
            spawned: false,
            remotes: HashMap::new(),
            pending_names: HashMap::new(),
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn map_phase(&self) -> MapPhase {
        self.map_phase
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn is_spawned(&self) -> bool {
        self.spawned
    }

    pub fn remote(&self, id: &str) -> Option<&RemoteAvatar> {
        self.remotes.get(id)
    }

    /// Remote participants sorted by id
    pub fn remotes(&self) -> Vec<RemoteAvatar> {
        let mut remotes: Vec<RemoteAvatar> = self.remotes.values().cloned().collect();
        remotes.sort_by(|a, b| a.id.cmp(&b.id));
        remotes
    }

    /// Slow control period: connect, then download the phase, then spawn
    pub fn on_control_tick(&mut self) -> Vec<WireMessage> {
        match self.phase {
            ConnectionPhase::Disconnected | ConnectionPhase::Awaiting => {
                if self.phase == ConnectionPhase::Disconnected {
                    debug!("Looking for server");
                    self.phase = ConnectionPhase::Awaiting;
                }
                return vec![WireMessage::Ping];
            }
            ConnectionPhase::Connected => {}
        }

        if self.map_phase == MapPhase::Unloaded {
            return vec![WireMessage::MapRequest];
        }

        if !self.spawned {
            return vec![
                WireMessage::JoinRequest {
                    id: self.local_id.clone(),
                    name: self.local_name.clone(),
                },
                WireMessage::SpawnRequest,
            ];
        }

        Vec::new()
    }

    /// Fast period: move the local avatar and report its pose once it exists
    pub fn on_pose_tick(
        &mut self,
        poses: &mut dyn PoseProvider,
        avatars: &mut dyn AvatarFactory,
    ) -> Option<WireMessage> {
        if !self.spawned {
            return None;
        }

        let pose = poses.sample();
        avatars.move_to(&self.local_id, pose);
        Some(WireMessage::PoseUpdate {
            id: self.local_id.clone(),
            pose,
        })
    }

    /// Changes the local display name; returns the update to send once joined
    pub fn set_local_name(
        &mut self,
        name: &str,
        avatars: &mut dyn AvatarFactory,
    ) -> Option<WireMessage> {
        if !is_valid_name(name) {
            warn!("Display name {:?} must be printable ASCII", name);
            return None;
        }

        self.local_name = name.to_string();
        if !self.spawned {
            return None;
        }

        avatars.rename(&self.local_id, name);
        Some(WireMessage::NameUpdate {
            id: self.local_id.clone(),
            name: name.to_string(),
        })
    }

    /// The message that announces an explicit leave, if we ever joined
    pub fn leave(&self) -> Option<WireMessage> {
        self.spawned.then(|| WireMessage::LeaveNotice {
            id: self.local_id.clone(),
        })
    }

    /// Applies one message from the server
    pub fn handle_message(
        &mut self,
        message: WireMessage,
        avatars: &mut dyn AvatarFactory,
        scene: &mut dyn SceneTransition,
    ) {
        match message {
            WireMessage::Pong => {
                if self.phase == ConnectionPhase::Awaiting {
                    info!("Server connected: pong received");
                    self.phase = ConnectionPhase::Connected;
                } else {
                    debug!("Ignoring pong in phase {:?}", self.phase);
                }
            }

            WireMessage::MapPhase(map) => self.enter_map(map, scene),

            WireMessage::SpawnAck => self.spawn_local(avatars),

            WireMessage::PoseUpdate { id, pose } => {
                if id != self.local_id {
                    self.upsert_remote(id, pose, avatars);
                }
            }

            WireMessage::NameUpdate { id, name } => {
                if id == self.local_id {
                    debug!("Ignoring server echo of local name {}", name);
                } else if let Some(remote) = self.remotes.get_mut(&id) {
                    if remote.name != name {
                        avatars.rename(&id, &name);
                        remote.name = name;
                    }
                } else {
                    self.pending_names.insert(id, name);
                }
            }

            WireMessage::LeaveNotice { id } => {
                if id == self.local_id {
                    if self.spawned {
                        warn!("Server dropped this participant, joining again");
                        avatars.destroy(&id);
                        self.spawned = false;
                    }
                    return;
                }

                self.pending_names.remove(&id);
                if self.remotes.remove(&id).is_some() {
                    info!("Participant {} left", id);
                    avatars.destroy(&id);
                }
            }

            WireMessage::Ping
            | WireMessage::MapRequest
            | WireMessage::JoinRequest { .. }
            | WireMessage::SpawnRequest => {
                warn!("Unexpected {} message from server", message.tag());
            }
        }
    }

    fn enter_map(&mut self, map: MapName, scene: &mut dyn SceneTransition) {
        if self.phase != ConnectionPhase::Connected {
            debug!("Ignoring map {} before connecting", map);
            return;
        }

        let target = MapPhase::from(map);
        if target <= self.map_phase {
            debug!("Already at {:?}, ignoring {}", self.map_phase, map);
            return;
        }

        scene.instantiate(map);
        if self.map_phase == MapPhase::Lobby {
            scene.tear_down(MapName::Lobby);
        }

        info!("Map phase {:?} -> {:?}", self.map_phase, target);
        self.map_phase = target;
    }

    fn spawn_local(&mut self, avatars: &mut dyn AvatarFactory) {
        if self.spawned {
            debug!("Ignoring repeated spawn acknowledgement");
            return;
        }
        if self.map_phase == MapPhase::Unloaded {
            debug!("Ignoring spawn acknowledgement before a map is loaded");
            return;
        }

        avatars.spawn(&self.local_id, &self.local_name, Pose::SPAWN, true);
        self.spawned = true;
    }

    fn upsert_remote(&mut self, id: String, pose: Pose, avatars: &mut dyn AvatarFactory) {
        if let Some(remote) = self.remotes.get_mut(&id) {
            remote.pose = pose;
            avatars.move_to(&id, pose);
            return;
        }

        let name = self.pending_names.remove(&id).unwrap_or_else(|| id.clone());
        avatars.spawn(&id, &name, pose, false);
        self.remotes.insert(id.clone(), RemoteAvatar { id, name, pose });
    }
}

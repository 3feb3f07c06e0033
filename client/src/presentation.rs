//! Collaborators the session drives but does not own
//!
//! Rendering, input and scene loading live outside this crate. The session
//! talks to them only through the traits below. The headless implementations
//! are what the `client` binary and the tests use.

use log::{debug, info};
use shared::{Pose, Vec3};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Samples the pose of the locally controlled body
pub trait PoseProvider {
    fn sample(&mut self) -> Pose;
}

/// Creates and destroys avatar presentation objects
pub trait AvatarFactory {
    fn spawn(&mut self, id: &str, name: &str, pose: Pose, local: bool);
    fn move_to(&mut self, id: &str, pose: Pose);
    fn rename(&mut self, id: &str, name: &str);
    fn destroy(&mut self, id: &str);
}

/// Walks in a straight line from `start` to `target` at a constant speed
///
/// The walk begins at the first sample, which the session takes only once
/// the local avatar has spawned.
pub struct WalkingPose {
    start: Vec3,
    target: Vec3,
    speed: f32,
    started: Option<Instant>,
}

impl WalkingPose {
    pub fn new(start: Vec3, target: Vec3, speed: f32) -> Self {
        Self {
            start,
            target,
            speed,
            started: None,
        }
    }

    /// Stays at `position` forever
    pub fn stationary(position: Vec3) -> Self {
        Self::new(position, position, 0.0)
    }

    pub fn position_at(&self, elapsed: Duration) -> Vec3 {
        let offset = self.target - self.start;
        let distance = offset.length();
        if distance <= f32::EPSILON {
            return self.target;
        }

        let travelled = (self.speed.max(0.0) * elapsed.as_secs_f32()).min(distance);
        self.start + offset * (travelled / distance)
    }
}

impl PoseProvider for WalkingPose {
    fn sample(&mut self) -> Pose {
        let started = *self.started.get_or_insert_with(Instant::now);
        Pose::new(self.position_at(started.elapsed()), Vec3::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessAvatar {
    pub name: String,
    pub pose: Pose,
    pub local: bool,
}

/// Keeps avatars in a map and logs what a renderer would do
#[derive(Debug, Default)]
pub struct HeadlessAvatars {
    avatars: HashMap<String, HeadlessAvatar>,
}

impl HeadlessAvatars {
    pub fn get(&self, id: &str) -> Option<&HeadlessAvatar> {
        self.avatars.get(id)
    }

    pub fn len(&self) -> usize {
        self.avatars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.avatars.is_empty()
    }
}

impl AvatarFactory for HeadlessAvatars {
    fn spawn(&mut self, id: &str, name: &str, pose: Pose, local: bool) {
        info!(
            "Spawning {} avatar {} ({}) at {}",
            if local { "local" } else { "remote" },
            id,
            name,
            pose.position
        );
        self.avatars.insert(
            id.to_string(),
            HeadlessAvatar {
                name: name.to_string(),
                pose,
                local,
            },
        );
    }

    fn move_to(&mut self, id: &str, pose: Pose) {
        if let Some(avatar) = self.avatars.get_mut(id) {
            avatar.pose = pose;
        }
    }

    fn rename(&mut self, id: &str, name: &str) {
        if let Some(avatar) = self.avatars.get_mut(id) {
            debug!("Name tag of {} now reads {}", id, name);
            avatar.name = name.to_string();
        }
    }

    fn destroy(&mut self, id: &str) {
        if self.avatars.remove(id).is_some() {
            info!("Destroyed avatar {}", id);
        }
    }
}

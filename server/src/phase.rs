//! Lobby-to-map transition latch

use crate::roster::Roster;
use log::info;
use shared::{MapName, Vec3};

/// Server-wide stage; only ever advances
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ServerPhase {
    Lobby,
    ActiveMap,
}

impl ServerPhase {
    pub fn map_name(self) -> MapName {
        match self {
            ServerPhase::Lobby => MapName::Lobby,
            ServerPhase::ActiveMap => MapName::FirstMap,
        }
    }
}

/// Fires once, when every participant (at least two) stands inside the
/// trigger zone at the same time
pub struct TransitionController {
    phase: ServerPhase,
    trigger_point: Vec3,
    radius: f32,
}

impl TransitionController {
    pub fn new(trigger_point: Vec3, radius: f32) -> Self {
        Self {
            phase: ServerPhase::Lobby,
            trigger_point,
            radius,
        }
    }

    pub fn phase(&self) -> ServerPhase {
        self.phase
    }

    pub fn participants_in_range(&self, roster: &Roster) -> usize {
        roster
            .iter()
            .filter(|p| p.pose.position.distance(&self.trigger_point) <= self.radius)
            .count()
    }

    /// Returns true on the one call that advances the phase
    pub fn check(&mut self, roster: &Roster) -> bool {
        if self.phase != ServerPhase::Lobby {
            return false;
        }

        let in_range = self.participants_in_range(roster);
        if in_range >= 2 && in_range == roster.len() {
            info!(
                "All {} participants reached the trigger, advancing to {}",
                in_range,
                MapName::FirstMap
            );
            self.phase = ServerPhase::ActiveMap;
            return true;
        }

        false
    }
}

//! Hook for instantiating and tearing down map geography

use crate::codec::MapName;
use log::info;

/// Loads and unloads map worlds
///
/// Called only from the tick, at most once per map per direction.
pub trait SceneTransition {
    fn instantiate(&mut self, map: MapName);
    fn tear_down(&mut self, map: MapName);
}

/// Headless scene that only tracks and logs which maps are loaded
#[derive(Debug, Default)]
pub struct LoggedScene {
    loaded: Vec<MapName>,
}

impl LoggedScene {
    pub fn loaded(&self) -> &[MapName] {
        &self.loaded
    }
}

impl SceneTransition for LoggedScene {
    fn instantiate(&mut self, map: MapName) {
        info!("Instantiating map {}", map);
        if !self.loaded.contains(&map) {
            self.loaded.push(map);
        }
    }

    fn tear_down(&mut self, map: MapName) {
        info!("Tearing down map {}", map);
        self.loaded.retain(|loaded| *loaded != map);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logged_scene_tracks_maps() {
        let mut scene = LoggedScene::default();
        scene.instantiate(MapName::Lobby);
        scene.instantiate(MapName::FirstMap);
        scene.tear_down(MapName::Lobby);

        assert_eq!(scene.loaded(), &[MapName::FirstMap]);
    }
}

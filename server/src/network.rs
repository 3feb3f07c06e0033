//! Server network layer: UDP endpoint, marshaling queue and the tick loop

use crate::config::ServerConfig;
use crate::game::GameState;
use log::{debug, error, info};
use shared::{Endpoint, Inbound, InboundQueue, LoggedScene, SceneTransition, TransportError};
use std::net::SocketAddr;
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::time::{interval, MissedTickBehavior};

/// Authoritative server coordinating the receive thread and the tick
pub struct Server {
    endpoint: Endpoint,
    inbound: InboundQueue<Inbound>,
    game: GameState,
    config: ServerConfig,
    receiver: Option<JoinHandle<()>>,
}

impl Server {
    /// Binds the listening socket; failure here aborts startup
    pub fn bind(config: ServerConfig) -> Result<Self, TransportError> {
        Self::with_scene(config, Box::new(LoggedScene::default()))
    }

    pub fn with_scene(
        config: ServerConfig,
        scene: Box<dyn SceneTransition>,
    ) -> Result<Self, TransportError> {
        let endpoint = Endpoint::bind(&config.bind_addr)?.with_recv_timeout(config.recv_timeout);
        info!("Server listening on {}", endpoint.local_addr());

        Ok(Server {
            endpoint,
            inbound: InboundQueue::new(),
            game: GameState::new(&config, scene),
            config,
            receiver: None,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    /// Spawns the receive thread if it is not running yet
    pub fn start_receiving(&mut self) -> Result<(), TransportError> {
        if self.receiver.is_none() {
            self.receiver = Some(self.endpoint.deliver_to(self.inbound.clone())?);
        }
        Ok(())
    }

    /// Applies every queued inbound message in arrival order
    ///
    /// Returns how many messages were applied.
    pub fn process_inbound(&mut self) -> usize {
        let events = self.inbound.drain();
        let count = events.len();
        let now = Instant::now();

        for Inbound { message, from } in events {
            self.game.handle_message(message, from, now);
        }

        self.flush();
        count
    }

    pub fn replicate(&mut self) {
        self.game.replicate_poses();
        self.flush();
    }

    pub fn refresh(&mut self) {
        self.game.refresh();
        self.flush();
    }

    pub fn sweep(&mut self) {
        self.game
            .sweep_timeouts(Instant::now(), self.config.activity_timeout);
        self.flush();
    }

    pub fn check_transition(&mut self) {
        self.game.check_transition();
        self.flush();
    }

    fn flush(&mut self) {
        self.endpoint.flush(self.game.take_outbox());
    }

    /// Main server loop; returns on Ctrl+C
    ///
    /// Every timer branch first drains the marshaling queue so that replies
    /// and broadcasts always see the latest roster.
    pub async fn run(&mut self) -> Result<(), TransportError> {
        self.start_receiving()?;

        let mut pose_interval = interval(self.config.tick_duration());
        pose_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut refresh_interval = interval(self.config.refresh_interval);
        refresh_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut sweep_interval = interval(self.config.sweep_interval);
        sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut transition_interval = interval(self.config.transition_check_interval);
        transition_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        info!("Server started successfully");

        loop {
            tokio::select! {
                _ = pose_interval.tick() => {
                    self.process_inbound();
                    self.replicate();

                    // Periodic monitoring
                    if self.game.tick % 600 == 0 && !self.game.roster().is_empty() {
                        debug!(
                            "Tick {}: {} participants, phase {:?}",
                            self.game.tick,
                            self.game.roster().len(),
                            self.game.phase()
                        );
                    }
                },

                _ = refresh_interval.tick() => {
                    self.process_inbound();
                    self.refresh();
                },

                _ = sweep_interval.tick() => {
                    self.process_inbound();
                    self.sweep();
                },

                _ = transition_interval.tick() => {
                    self.process_inbound();
                    self.check_transition();
                },

                result = &mut shutdown => {
                    if let Err(e) = result {
                        error!("Failed to listen for shutdown signal: {}", e);
                    }
                    info!("Server shutting down");
                    break;
                },
            }
        }

        self.endpoint.shutdown();
        Ok(())
    }
}

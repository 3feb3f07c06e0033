//! Client network layer: ephemeral endpoint, marshaling queue and the timers

use crate::presentation::{AvatarFactory, PoseProvider};
use crate::session::{ConnectionPhase, Session};
use log::{debug, error, info, warn};
use rand::Rng;
use shared::transport::RECV_TIMEOUT;
use shared::{
    is_valid_id, is_valid_name, Endpoint, Inbound, InboundQueue, SceneTransition,
    TransportError, WireMessage, CONTROL_INTERVAL, DEFAULT_PORT,
};
use std::net::{SocketAddr, ToSocketAddrs};
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("server address cannot change once the handshake has started")]
    HandshakeStarted,
    #[error("invalid server address {0}")]
    InvalidAddress(String),
    #[error("participant id {0:?} must be printable ASCII without ':' or '.'")]
    InvalidId(String),
    #[error("display name {0:?} must be printable ASCII")]
    InvalidName(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_addr: String,
    /// Generated at startup when absent
    pub local_id: Option<String>,
    pub name: String,
    /// Pose reports per second
    pub pose_rate: u32,
    pub control_interval: Duration,
    pub recv_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: format!("127.0.0.1:{}", DEFAULT_PORT),
            local_id: None,
            name: "Player".to_string(),
            pose_rate: 30,
            control_interval: CONTROL_INTERVAL,
            recv_timeout: RECV_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn pose_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.pose_rate.max(1) as f64)
    }
}

/// Random numeric participant id
pub fn generate_id() -> String {
    rand::thread_rng().gen_range(1..=999_999u32).to_string()
}

fn resolve(addr: &str) -> Result<SocketAddr, ClientError> {
    addr.to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| ClientError::InvalidAddress(addr.to_string()))
}

pub struct Client {
    endpoint: Endpoint,
    server_addr: SocketAddr,
    inbound: InboundQueue<Inbound>,
    session: Session,
    poses: Box<dyn PoseProvider>,
    avatars: Box<dyn AvatarFactory>,
    scene: Box<dyn SceneTransition>,
    config: ClientConfig,
    receiver: Option<JoinHandle<()>>,
}

impl Client {
    pub fn new(
        config: ClientConfig,
        poses: Box<dyn PoseProvider>,
        avatars: Box<dyn AvatarFactory>,
        scene: Box<dyn SceneTransition>,
    ) -> Result<Self, ClientError> {
        let server_addr = resolve(&config.server_addr)?;
        let endpoint = Endpoint::unbound()?.with_recv_timeout(config.recv_timeout);

        let local_id = config.local_id.clone().unwrap_or_else(generate_id);
        if !is_valid_id(&local_id) {
            return Err(ClientError::InvalidId(local_id));
        }
        if !is_valid_name(&config.name) {
            return Err(ClientError::InvalidName(config.name));
        }

        info!(
            "Client {} ({}) bound on {}, server {}",
            local_id,
            config.name,
            endpoint.local_addr(),
            server_addr
        );

        Ok(Client {
            endpoint,
            server_addr,
            inbound: InboundQueue::new(),
            session: Session::new(local_id, config.name.clone()),
            poses,
            avatars,
            scene,
            config,
            receiver: None,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Points the client at another server; only allowed before the first ping
    pub fn set_server_addr(&mut self, addr: &str) -> Result<(), ClientError> {
        if self.session.phase() != ConnectionPhase::Disconnected {
            return Err(ClientError::HandshakeStarted);
        }

        self.server_addr = resolve(addr)?;
        info!("Server address set to {}", self.server_addr);
        Ok(())
    }

    pub fn start_receiving(&mut self) -> Result<(), ClientError> {
        if self.receiver.is_none() {
            self.receiver = Some(self.endpoint.deliver_to(self.inbound.clone())?);
        }
        Ok(())
    }

    /// Applies queued server messages in arrival order
    ///
    /// Datagrams from any address other than the server are dropped. Returns
    /// how many messages were applied.
    pub fn process_inbound(&mut self) -> usize {
        let mut applied = 0;

        for Inbound { message, from } in self.inbound.drain() {
            if from != self.server_addr {
                warn!("Ignoring {} from unknown sender {}", message.tag(), from);
                continue;
            }

            self.session
                .handle_message(message, self.avatars.as_mut(), self.scene.as_mut());
            applied += 1;
        }

        applied
    }

    pub fn control_tick(&mut self) {
        for message in self.session.on_control_tick() {
            self.send(&message);
        }
    }

    pub fn pose_tick(&mut self) {
        if let Some(message) = self
            .session
            .on_pose_tick(self.poses.as_mut(), self.avatars.as_mut())
        {
            self.send(&message);
        }
    }

    pub fn rename(&mut self, name: &str) {
        if let Some(message) = self.session.set_local_name(name, self.avatars.as_mut()) {
            self.send(&message);
        }
    }

    /// Announces an explicit leave if this client ever joined
    pub fn leave(&mut self) {
        if let Some(message) = self.session.leave() {
            self.send(&message);
        }
    }

    fn send(&self, message: &WireMessage) {
        self.endpoint.send_message(message, self.server_addr);
    }

    /// Main client loop; returns on Ctrl+C after announcing the leave
    pub async fn run(&mut self) -> Result<(), ClientError> {
        self.start_receiving()?;

        let mut control_interval = interval(self.config.control_interval);
        control_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut pose_interval = interval(self.config.pose_interval());
        pose_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = control_interval.tick() => {
                    self.process_inbound();
                    self.control_tick();
                },

                _ = pose_interval.tick() => {
                    self.process_inbound();
                    self.pose_tick();
                },

                result = &mut shutdown => {
                    if let Err(e) = result {
                        error!("Failed to listen for shutdown signal: {}", e);
                    }
                    info!("Client shutting down");
                    break;
                },
            }
        }

        self.leave();
        self.endpoint.shutdown();
        debug!("Client stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::{HeadlessAvatars, WalkingPose};
    use crate::session::MapPhase;
    use shared::transport::MAX_DATAGRAM_SIZE;
    use shared::{LoggedScene, Vec3};
    use std::net::UdpSocket;
    use std::time::Instant;
    use tokio_test::{assert_err, assert_ok};

    fn client_for(server: &UdpSocket) -> Client {
        let config = ClientConfig {
            server_addr: server.local_addr().unwrap().to_string(),
            local_id: Some("7".to_string()),
            name: "Tester".to_string(),
            recv_timeout: Duration::from_millis(20),
            ..ClientConfig::default()
        };
        Client::new(
            config,
            Box::new(WalkingPose::stationary(Vec3::new(0.0, 1.0, 0.0))),
            Box::new(HeadlessAvatars::default()),
            Box::new(LoggedScene::default()),
        )
        .unwrap()
    }

    fn fake_server() -> UdpSocket {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.set_read_timeout(Some(Duration::from_secs(1))).unwrap();
        socket
    }

    fn recv(socket: &UdpSocket) -> (WireMessage, SocketAddr) {
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let (len, from) = socket.recv_from(&mut buf).unwrap();
        (shared::decode(&buf[..len]).unwrap(), from)
    }

    // The client binds the wildcard address; peers reach it over loopback
    fn loopback(client: &Client) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], client.local_addr().port()))
    }

    fn pump(client: &mut Client, expected: usize) {
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut applied = 0;
        while applied < expected && Instant::now() < deadline {
            applied += client.process_inbound();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(applied, expected, "client did not receive all datagrams");
    }

    #[test]
    fn test_generated_ids_are_numeric() {
        for _ in 0..100 {
            let id = generate_id();
            assert!(!id.is_empty());
            assert!(id.parse::<u32>().is_ok());
        }
    }

    #[test]
    fn test_invalid_server_address() {
        let config = ClientConfig {
            server_addr: "definitely not an address".to_string(),
            ..ClientConfig::default()
        };
        let result = Client::new(
            config,
            Box::new(WalkingPose::stationary(Vec3::ZERO)),
            Box::new(HeadlessAvatars::default()),
            Box::new(LoggedScene::default()),
        );
        assert!(matches!(result, Err(ClientError::InvalidAddress(_))));
    }

    #[test]
    fn test_names_and_ids_must_survive_the_wire() {
        let server = fake_server();
        let build = |id: &str, name: &str| {
            let config = ClientConfig {
                server_addr: server.local_addr().unwrap().to_string(),
                local_id: Some(id.to_string()),
                name: name.to_string(),
                ..ClientConfig::default()
            };
            Client::new(
                config,
                Box::new(WalkingPose::stationary(Vec3::ZERO)),
                Box::new(HeadlessAvatars::default()),
                Box::new(LoggedScene::default()),
            )
        };

        assert!(matches!(build("7", "Zoë"), Err(ClientError::InvalidName(_))));
        assert!(matches!(build("7.1", "Zoe"), Err(ClientError::InvalidId(_))));
        assert!(matches!(build("", "Zoe"), Err(ClientError::InvalidId(_))));
        assert_ok!(build("7", "Zoe: the Quick"));
    }

    #[test]
    fn test_server_address_locked_after_handshake_starts() {
        let server = fake_server();
        let other = fake_server();
        let mut client = client_for(&server);

        assert_ok!(client.set_server_addr(&other.local_addr().unwrap().to_string()));
        assert_eq!(client.server_addr(), other.local_addr().unwrap());

        client.control_tick();
        assert_eq!(client.session().phase(), ConnectionPhase::Awaiting);
        assert_err!(client.set_server_addr(&server.local_addr().unwrap().to_string()));
    }

    #[test]
    fn test_handshake_against_fake_server() {
        let server = fake_server();
        let mut client = client_for(&server);
        client.start_receiving().unwrap();

        client.control_tick();
        let (message, client_addr) = recv(&server);
        assert_eq!(message, WireMessage::Ping);
        assert_eq!(client_addr.port(), client.local_addr().port());

        server.send_to(b"Pong", client_addr).unwrap();
        pump(&mut client, 1);
        assert_eq!(client.session().phase(), ConnectionPhase::Connected);

        client.control_tick();
        assert_eq!(recv(&server).0, WireMessage::MapRequest);
        server.send_to(b"Lobby", client_addr).unwrap();
        pump(&mut client, 1);

        client.control_tick();
        assert_eq!(
            recv(&server).0,
            WireMessage::JoinRequest {
                id: "7".into(),
                name: "Tester".into()
            }
        );
        assert_eq!(recv(&server).0, WireMessage::SpawnRequest);

        server.send_to(b"SpawnReceived", client_addr).unwrap();
        pump(&mut client, 1);
        assert!(client.session().is_spawned());

        client.pose_tick();
        let (pose, _) = recv(&server);
        assert_eq!(shared::encode(&pose), b"ID:7 Position:0.1.0 Rotation:0.0.0".to_vec());
    }

    #[test]
    fn test_datagrams_from_strangers_are_dropped() {
        let server = fake_server();
        let stranger = fake_server();
        let mut client = client_for(&server);
        client.start_receiving().unwrap();
        client.control_tick();

        stranger.send_to(b"Pong", loopback(&client)).unwrap();
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(client.process_inbound(), 0);
        assert_eq!(client.session().phase(), ConnectionPhase::Awaiting);
    }

    #[test]
    fn test_no_leave_before_joining() {
        let server = fake_server();
        let mut client = client_for(&server);
        server
            .set_read_timeout(Some(Duration::from_millis(100)))
            .unwrap();

        client.leave();
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        assert!(server.recv_from(&mut buf).is_err());
        assert_eq!(client.session().map_phase(), MapPhase::Unloaded);
    }
}

use shared::{
    Vec3, ACTIVITY_TIMEOUT, DEFAULT_PORT, REFRESH_INTERVAL, SWEEP_INTERVAL,
    TRANSITION_CHECK_INTERVAL,
};
use std::time::Duration;

/// Runtime settings for the authoritative server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the UDP socket binds to
    pub bind_addr: String,
    /// Pose replication rate in Hz
    pub tick_rate: u32,
    /// Period of the full name and phase refresh
    pub refresh_interval: Duration,
    /// Period of the activity timeout sweep
    pub sweep_interval: Duration,
    /// Period of the lobby trigger check
    pub transition_check_interval: Duration,
    /// Inactivity after which a participant is evicted
    pub activity_timeout: Duration,
    /// Roster capacity
    pub max_participants: usize,
    /// Centre of the lobby trigger zone
    pub trigger_point: Vec3,
    /// Radius of the lobby trigger zone
    pub trigger_radius: f32,
    /// Receive-call timeout of the socket thread
    pub recv_timeout: Duration,
}

impl ServerConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate.max(1)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            tick_rate: 60,
            refresh_interval: REFRESH_INTERVAL,
            sweep_interval: SWEEP_INTERVAL,
            transition_check_interval: TRANSITION_CHECK_INTERVAL,
            activity_timeout: ACTIVITY_TIMEOUT,
            max_participants: 16,
            trigger_point: Vec3::new(0.0, 0.0, 50.0),
            trigger_radius: 5.0,
            recv_timeout: shared::transport::RECV_TIMEOUT,
        }
    }
}

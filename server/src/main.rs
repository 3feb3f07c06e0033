use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::network::Server;
use shared::{Vec3, DEFAULT_PORT};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// IP address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// UDP port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Pose replication rate (updates per second)
    #[arg(short, long, default_value = "60")]
    tick_rate: u32,

    /// Period of the name and phase refresh in milliseconds
    #[arg(long, default_value = "1000")]
    refresh_interval_ms: u64,

    /// Seconds of silence before a participant is evicted
    #[arg(long, default_value = "5")]
    timeout_secs: u64,

    /// Maximum number of concurrent participants
    #[arg(short, long, default_value = "16")]
    max_participants: usize,

    /// Centre of the lobby trigger zone as x,y,z
    #[arg(long, default_value = "0,0,50", allow_hyphen_values = true)]
    trigger: Vec3,

    /// Radius of the lobby trigger zone
    #[arg(long, default_value = "5")]
    trigger_radius: f32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = ServerConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        tick_rate: args.tick_rate,
        refresh_interval: Duration::from_millis(args.refresh_interval_ms),
        activity_timeout: Duration::from_secs(args.timeout_secs),
        max_participants: args.max_participants,
        trigger_point: args.trigger,
        trigger_radius: args.trigger_radius,
        ..ServerConfig::default()
    };

    info!("Starting server...");
    info!(
        "Tick rate {}Hz, timeout {:?}, trigger {} (radius {})",
        config.tick_rate, config.activity_timeout, config.trigger_point, config.trigger_radius
    );

    let mut server = match Server::bind(config) {
        Ok(server) => server,
        Err(e) => {
            error!("Cannot start server: {}", e);
            return Err(e.into());
        }
    };

    server.run().await?;

    Ok(())
}

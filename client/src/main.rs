use clap::Parser;
use client::network::{Client, ClientConfig};
use client::presentation::{HeadlessAvatars, WalkingPose};
use log::{error, info};
use shared::{LoggedScene, Pose, Vec3, DEFAULT_PORT};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value_t = format!("127.0.0.1:{}", DEFAULT_PORT))]
    server: String,

    /// Display name shown to other participants
    #[arg(short = 'n', long, default_value = "Player")]
    name: String,

    /// Participant id (random when omitted)
    #[arg(long)]
    id: Option<String>,

    /// Pose reports per second
    #[arg(short = 'r', long, default_value = "30")]
    pose_rate: u32,

    /// Walk from the spawn point towards x,y,z
    #[arg(long, allow_hyphen_values = true)]
    walk_to: Option<Vec3>,

    /// Walking speed in units per second
    #[arg(long, default_value = "5")]
    walk_speed: f32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let start = Pose::SPAWN.position;
    let poses = match args.walk_to {
        Some(target) => {
            info!("Walking to {} at {} units/s", target, args.walk_speed);
            WalkingPose::new(start, target, args.walk_speed)
        }
        None => WalkingPose::stationary(start),
    };

    let config = ClientConfig {
        server_addr: args.server,
        local_id: args.id,
        name: args.name,
        pose_rate: args.pose_rate,
        ..ClientConfig::default()
    };

    info!("Starting client...");
    info!("Connecting to: {}", config.server_addr);

    let mut client = match Client::new(
        config,
        Box::new(poses),
        Box::new(HeadlessAvatars::default()),
        Box::new(LoggedScene::default()),
    ) {
        Ok(client) => client,
        Err(e) => {
            error!("Cannot start client: {}", e);
            return Err(e.into());
        }
    };

    client.run().await?;

    Ok(())
}

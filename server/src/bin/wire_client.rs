//! Speaks the wire protocol by hand against a running server and prints every
//! reply. Useful for checking a deployment without starting a full client.

use clap::Parser;
use shared::{decode, encode, WireMessage, DEFAULT_PORT};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout_at, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address
    #[arg(short, long, default_value_t = SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)))]
    server: SocketAddr,

    /// Participant id to join with
    #[arg(long, default_value = "wire-client")]
    id: String,

    /// Display name to join with
    #[arg(long, default_value = "Wire Client")]
    name: String,
}

async fn exchange(
    socket: &UdpSocket,
    server: SocketAddr,
    message: WireMessage,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("-> {}", message);
    socket.send_to(&encode(&message), server).await?;

    let mut buf = [0u8; 2048];
    // Print whatever arrives in the next half second
    let deadline = Instant::now() + Duration::from_millis(500);
    while let Ok(result) = timeout_at(deadline, socket.recv_from(&mut buf)).await {
        let (len, addr) = result?;
        match decode(&buf[..len]) {
            Ok(reply) => println!("<- {} (from {})", reply, addr),
            Err(e) => println!("<- malformed datagram from {}: {}", addr, e),
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    println!("Wire client socket bound to {}", socket.local_addr()?);

    exchange(&socket, args.server, WireMessage::Ping).await?;
    exchange(&socket, args.server, WireMessage::MapRequest).await?;
    exchange(
        &socket,
        args.server,
        WireMessage::JoinRequest {
            id: args.id.clone(),
            name: args.name,
        },
    )
    .await?;
    exchange(&socket, args.server, WireMessage::SpawnRequest).await?;

    sleep(Duration::from_secs(1)).await;

    exchange(&socket, args.server, WireMessage::LeaveNotice { id: args.id }).await?;
    println!("Wire client finished");

    Ok(())
}

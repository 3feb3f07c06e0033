//! # Replication Client Library
//!
//! The client half of the multiplayer race. It finds the server, learns which
//! map the session is on, spawns the local avatar and then streams its pose
//! while mirroring everybody else.
//!
//! ## Session Lifecycle
//!
//! Connectivity moves from `Disconnected` to `Awaiting` on the first ping and
//! to `Connected` on the matching pong. From there the client asks for the map
//! phase, then repeats its join and spawn requests until the server
//! acknowledges the spawn. Both connectivity and map phase only ever move
//! forward. If the server evicts the local participant, the client simply
//! joins again.
//!
//! ## Module Organization
//!
//! ### Session Module (`session`)
//! Pure state machine with no I/O:
//! - Control and pose tick outputs
//! - Remote avatar mirror, including names that arrive before poses
//! - Map transitions forwarded to the scene hook
//!
//! ### Presentation Module (`presentation`)
//! Traits for the pose source and avatar factory, plus headless
//! implementations that log instead of drawing.
//!
//! ### Network Module (`network`)
//! Ephemeral UDP endpoint, receive thread and the two client timers.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{Client, ClientConfig};
//! use client::presentation::{HeadlessAvatars, WalkingPose};
//! use shared::{LoggedScene, Vec3};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::new(
//!         ClientConfig::default(),
//!         Box::new(WalkingPose::stationary(Vec3::new(0.0, 1.0, 0.0))),
//!         Box::new(HeadlessAvatars::default()),
//!         Box::new(LoggedScene::default()),
//!     )?;
//!
//!     // Runs until Ctrl+C, then announces the leave
//!     client.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod network;
pub mod presentation;
pub mod session;

//! # Replication Server Library
//!
//! This library provides the authoritative server for the multiplayer race. It
//! tracks who is connected and where they stand, and keeps every client's view
//! of the other participants up to date over UDP.
//!
//! ## Core Responsibilities
//!
//! ### Roster Authority
//! The server owns the only writable copy of the participant table:
//! - Joining, with duplicate joins treated as harmless retransmissions
//! - Pose and display-name updates, last writer wins
//! - Explicit leaves and activity-timeout eviction, both announced to the
//!   remaining participants
//!
//! ### Replication
//! At a fixed rate every participant's pose is unicast to every participant,
//! including the sender itself. Names and the current map phase are re-sent on
//! a slower period so late joiners and lossy links converge.
//!
//! ### Map Transition
//! While in the lobby the server watches a trigger zone. Once every
//! participant (at least two of them) stands inside it at the same time, the
//! server switches to the first map, tells everyone, and never looks back.
//!
//! ## Architecture Design
//!
//! ### Receive Thread and Tick
//! A dedicated thread blocks on the UDP socket and decodes datagrams. It only
//! pushes them onto the marshaling queue. All roster and phase changes happen
//! on the single tick, which drains the queue at the start of every timer
//! branch and applies events in arrival order.
//!
//! ### Outbox
//! Handlers never write to the socket themselves. They queue addressed
//! messages that the network layer flushes after each step, which keeps the
//! game logic free of I/O and easy to test.
//!
//! ## Module Organization
//!
//! - `config`: runtime settings and their defaults
//! - `roster`: participant table, timeouts and fan-out
//! - `phase`: the one-shot lobby trigger
//! - `game`: message handling and periodic actions owned by the tick
//! - `network`: endpoint, marshaling queue and the timer loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::bind(ServerConfig::default())?;
//!
//!     // Replicates poses at the configured tick rate until Ctrl+C
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod game;
pub mod network;
pub mod phase;
pub mod roster;

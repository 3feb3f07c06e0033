//! # Shared Protocol Library
//!
//! Everything the client and the server must agree on lives here: the text
//! wire format, the UDP endpoint with its background receive thread, the
//! queue that carries received messages over to the tick, and the protocol
//! timings.
//!
//! ## Threading model
//!
//! Each [`transport::Endpoint`] runs one blocking receive loop on its own
//! thread. That thread decodes datagrams and pushes them onto an
//! [`queue::InboundQueue`]; it never touches roster or session state. The
//! owning tick drains the queue once per frame and applies events in arrival
//! order, then sends its replies through the same endpoint.

pub mod codec;
pub mod pose;
pub mod queue;
pub mod scene;
pub mod transport;

use std::time::Duration;

pub use codec::{
    decode, encode, is_valid_id, is_valid_name, DecodeError, MapName, WireMessage,
};
pub use pose::{Pose, Vec3};
pub use queue::InboundQueue;
pub use scene::{LoggedScene, SceneTransition};
pub use transport::{Endpoint, Inbound, Outbound, TransportError};

/// Well-known server port
pub const DEFAULT_PORT: u16 = 9050;

/// Client period for pings, map requests and spawn requests
pub const CONTROL_INTERVAL: Duration = Duration::from_secs(1);

/// Inactivity after which the server evicts a participant
pub const ACTIVITY_TIMEOUT: Duration = Duration::from_secs(5);

/// Server period for the timeout sweep
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Server period for the full name and phase refresh
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Server period for the lobby trigger check
pub const TRANSITION_CHECK_INTERVAL: Duration = Duration::from_millis(500);

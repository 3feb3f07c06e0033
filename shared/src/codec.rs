//! Text wire format shared by client and server
//!
//! Every datagram carries exactly one ASCII line. Bare tags (`Ping`, `Pong`,
//! `MapRequest`, `Spawn`, `SpawnReceived`, and the map names `Lobby` /
//! `FirstMap`) have no fields. Tagged messages separate the tag from their
//! fields with `:`:
//!
//! - `PlayerInfo:<id>:<name>`
//! - `PlayerNameUpdate:<id>:<name>`
//! - `PlayerRemoved:<id>`
//! - `ID:<id> Position:<x>.<y>.<z> Rotation:<rx>.<ry>.<rz>`
//!
//! Vector components are separated by `.`, so the fractional mark inside a
//! component is written as `,` (`1.5` travels as `1,5`). Delimiters are never
//! escaped: ids must not contain `:`, `.` or spaces. Names may contain `:`
//! because they are always the last field. Both must be printable ASCII;
//! senders check with [`is_valid_id`] and [`is_valid_name`] before encoding.
//!
//! Decoding never panics. Anything that does not match the catalogue above
//! comes back as a [`DecodeError`] and the caller drops the datagram.

use crate::pose::{Pose, Vec3};
use std::fmt;
use thiserror::Error;

const TAG_PING: &str = "Ping";
const TAG_PONG: &str = "Pong";
const TAG_MAP_REQUEST: &str = "MapRequest";
const TAG_SPAWN: &str = "Spawn";
const TAG_SPAWN_RECEIVED: &str = "SpawnReceived";
const TAG_PLAYER_INFO: &str = "PlayerInfo";
const TAG_NAME_UPDATE: &str = "PlayerNameUpdate";
const TAG_PLAYER_REMOVED: &str = "PlayerRemoved";
const TAG_POSE: &str = "ID";
const FIELD_POSITION: &str = "Position";
const FIELD_ROTATION: &str = "Rotation";

/// Coarse map stage shared by every participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapName {
    Lobby,
    FirstMap,
}

impl MapName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MapName::Lobby => "Lobby",
            MapName::FirstMap => "FirstMap",
        }
    }
}

impl fmt::Display for MapName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded datagram
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    // Connectivity
    Ping,
    Pong,

    // Map phase download
    MapRequest,
    MapPhase(MapName),

    // Roster
    JoinRequest { id: String, name: String },
    PoseUpdate { id: String, pose: Pose },
    NameUpdate { id: String, name: String },
    LeaveNotice { id: String },

    // Spawn handshake
    SpawnRequest,
    SpawnAck,
}

impl WireMessage {
    /// Short tag used in log lines
    pub fn tag(&self) -> &'static str {
        match self {
            WireMessage::Ping => TAG_PING,
            WireMessage::Pong => TAG_PONG,
            WireMessage::MapRequest => TAG_MAP_REQUEST,
            WireMessage::MapPhase(map) => map.as_str(),
            WireMessage::JoinRequest { .. } => TAG_PLAYER_INFO,
            WireMessage::PoseUpdate { .. } => TAG_POSE,
            WireMessage::NameUpdate { .. } => TAG_NAME_UPDATE,
            WireMessage::LeaveNotice { .. } => TAG_PLAYER_REMOVED,
            WireMessage::SpawnRequest => TAG_SPAWN,
            WireMessage::SpawnAck => TAG_SPAWN_RECEIVED,
        }
    }
}

impl fmt::Display for WireMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireMessage::JoinRequest { id, name } => write!(f, "{TAG_PLAYER_INFO}:{id}:{name}"),
            WireMessage::NameUpdate { id, name } => write!(f, "{TAG_NAME_UPDATE}:{id}:{name}"),
            WireMessage::LeaveNotice { id } => write!(f, "{TAG_PLAYER_REMOVED}:{id}"),
            WireMessage::PoseUpdate { id, pose } => {
                write!(f, "{TAG_POSE}:{id} {FIELD_POSITION}:")?;
                write_triple(f, &pose.position)?;
                write!(f, " {FIELD_ROTATION}:")?;
                write_triple(f, &pose.rotation)
            }
            other => f.write_str(other.tag()),
        }
    }
}

fn write_triple(f: &mut fmt::Formatter<'_>, v: &Vec3) -> fmt::Result {
    write!(
        f,
        "{}.{}.{}",
        component_text(v.x),
        component_text(v.y),
        component_text(v.z)
    )
}

fn component_text(value: f32) -> String {
    value.to_string().replace('.', ",")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("empty datagram")]
    Empty,
    #[error("datagram is not ASCII text")]
    NotAscii,
    #[error("unknown message tag {0:?}")]
    UnknownTag(String),
    #[error("missing field {0}")]
    MissingField(&'static str),
    #[error("unexpected field {0:?}")]
    UnexpectedField(String),
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
    #[error("number out of range {0:?}")]
    NonFiniteNumber(String),
    #[error("expected {expected} vector components, found {found}")]
    WrongComponentCount { expected: usize, found: usize },
    #[error("empty participant id")]
    EmptyIdentifier,
}

/// Encodes a message as one line without a trailing newline
///
/// The result only decodes if its ids and names passed the validity checks.
pub fn encode(message: &WireMessage) -> Vec<u8> {
    message.to_string().into_bytes()
}

/// Whether `id` can be carried in a message field
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_graphic() && b != b':' && b != b'.')
}

/// Whether `name` survives encoding and decoding unchanged
pub fn is_valid_name(name: &str) -> bool {
    name.bytes().all(|b| b == b' ' || b.is_ascii_graphic())
}

/// Decodes one datagram
pub fn decode(bytes: &[u8]) -> Result<WireMessage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    if !bytes.is_ascii() {
        return Err(DecodeError::NotAscii);
    }
    let text = std::str::from_utf8(bytes)
        .map_err(|_| DecodeError::NotAscii)?
        .trim_end_matches(['\r', '\n']);
    if text.is_empty() {
        return Err(DecodeError::Empty);
    }

    match text {
        TAG_PING => return Ok(WireMessage::Ping),
        TAG_PONG => return Ok(WireMessage::Pong),
        TAG_MAP_REQUEST => return Ok(WireMessage::MapRequest),
        TAG_SPAWN => return Ok(WireMessage::SpawnRequest),
        TAG_SPAWN_RECEIVED => return Ok(WireMessage::SpawnAck),
        "Lobby" => return Ok(WireMessage::MapPhase(MapName::Lobby)),
        "FirstMap" => return Ok(WireMessage::MapPhase(MapName::FirstMap)),
        _ => {}
    }

    let (tag, rest) = text
        .split_once(':')
        .ok_or_else(|| DecodeError::UnknownTag(text.to_string()))?;

    match tag {
        TAG_PLAYER_INFO => {
            let (id, name) = decode_id_and_name(rest)?;
            Ok(WireMessage::JoinRequest { id, name })
        }
        TAG_NAME_UPDATE => {
            let (id, name) = decode_id_and_name(rest)?;
            Ok(WireMessage::NameUpdate { id, name })
        }
        TAG_PLAYER_REMOVED => {
            if rest.contains(':') {
                return Err(DecodeError::UnexpectedField(rest.to_string()));
            }
            Ok(WireMessage::LeaveNotice {
                id: decode_id(rest)?,
            })
        }
        TAG_POSE => decode_pose_update(rest),
        _ => Err(DecodeError::UnknownTag(tag.to_string())),
    }
}

fn decode_id(text: &str) -> Result<String, DecodeError> {
    if text.is_empty() {
        Err(DecodeError::EmptyIdentifier)
    } else {
        Ok(text.to_string())
    }
}

fn decode_id_and_name(rest: &str) -> Result<(String, String), DecodeError> {
    let (id, name) = rest
        .split_once(':')
        .ok_or(DecodeError::MissingField("name"))?;
    Ok((decode_id(id)?, name.to_string()))
}

fn decode_pose_update(rest: &str) -> Result<WireMessage, DecodeError> {
    let mut fields = rest.split(' ');
    let id = decode_id(fields.next().unwrap_or_default())?;
    let position = decode_vector_field(fields.next(), FIELD_POSITION)?;
    let rotation = decode_vector_field(fields.next(), FIELD_ROTATION)?;

    if let Some(extra) = fields.next() {
        return Err(DecodeError::UnexpectedField(extra.to_string()));
    }

    Ok(WireMessage::PoseUpdate {
        id,
        pose: Pose::new(position, rotation),
    })
}

fn decode_vector_field(field: Option<&str>, name: &'static str) -> Result<Vec3, DecodeError> {
    let field = field.ok_or(DecodeError::MissingField(name))?;
    let value = field
        .strip_prefix(name)
        .and_then(|rest| rest.strip_prefix(':'))
        .ok_or_else(|| DecodeError::UnexpectedField(field.to_string()))?;

    let parts: Vec<&str> = value.split('.').collect();
    match parts.as_slice() {
        [x, y, z] => Ok(Vec3::new(
            decode_component(x)?,
            decode_component(y)?,
            decode_component(z)?,
        )),
        _ => Err(DecodeError::WrongComponentCount {
            expected: 3,
            found: parts.len(),
        }),
    }
}

fn decode_component(text: &str) -> Result<f32, DecodeError> {
    let value = text
        .replace(',', ".")
        .parse::<f32>()
        .map_err(|_| DecodeError::InvalidNumber(text.to_string()))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DecodeError::NonFiniteNumber(text.to_string()))
    }
}

//! Wire protocol shared by clients and the relay server.
//!
//! Every frame carries one JSON envelope:
//! ```json
//! { "type": "stroke:add", "payload": { "stroke": { "id": "...", "points": [{ "x": 0, "y": 0 }] } } }
//! ```
//! The relay only inspects `type` and, for persisted messages, the shape of the
//! payload. Payload structs here are what clients produce and consume.

use crate::shapes::{Color, ShapeStyle, Stroke};
use kurbo::Point;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Message type tags.
pub mod message_type {
    pub const ROOM_JOIN: &str = "room:join";
    pub const STROKE_START: &str = "stroke:start";
    pub const STROKE_POINT: &str = "stroke:point";
    pub const STROKE_FINISH: &str = "stroke:finish";
    pub const STROKE_ADD: &str = "stroke:add";
    pub const STROKE_ERASE: &str = "stroke:erase";
    pub const CHAT_MESSAGE: &str = "chat:message";
    pub const CHAT_TYPING: &str = "chat:typing";
    pub const USER_JOIN: &str = "user:join";
    pub const BOARD_SYNC: &str = "board:sync";
    pub const CHAT_SYNC: &str = "chat:sync";
}

/// Protocol errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Invalid payload for {kind}: {reason}")]
    InvalidPayload { kind: String, reason: String },
}

/// The `{type, payload}` wrapper around every message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Build an envelope from a typed payload.
    pub fn with_payload<P: Serialize>(kind: &str, payload: &P) -> Result<Self, ProtocolError> {
        Ok(Self::new(kind, serde_json::to_value(payload)?))
    }

    /// Parse one frame. Invalid JSON or a missing `type` is malformed.
    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode the payload into a typed struct.
    pub fn payload_as<P: DeserializeOwned>(&self) -> Result<P, ProtocolError> {
        P::deserialize(&self.payload).map_err(|e| ProtocolError::InvalidPayload {
            kind: self.kind.clone(),
            reason: e.to_string(),
        })
    }
}

/// Serialize a `{type, payload}` frame without building an intermediate [`Value`].
pub fn encode<P: Serialize>(kind: &str, payload: &P) -> Result<String, ProtocolError> {
    #[derive(Serialize)]
    struct Outbound<'a, P> {
        #[serde(rename = "type")]
        kind: &'a str,
        payload: &'a P,
    }

    Ok(serde_json::to_string(&Outbound { kind, payload })?)
}

/// A committed stroke as carried by `stroke:add` and `board:sync`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeRecord {
    /// Producer-chosen id. UUIDs are kept as is; other strings map to a
    /// name-based UUID so repeated deliveries resolve to the same stroke.
    #[serde(default)]
    pub id: String,
    pub color: Color,
    pub thickness: f32,
    pub points: Vec<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, rename = "isEraser", skip_serializing_if = "std::ops::Not::not")]
    pub is_eraser: bool,
}

impl StrokeRecord {
    pub fn from_stroke(stroke: &Stroke, user_id: Option<String>, timestamp: Option<f64>) -> Self {
        Self {
            id: stroke.id.to_string(),
            color: stroke.style.color,
            thickness: stroke.style.thickness,
            points: stroke.points.clone(),
            timestamp,
            user_id,
            is_eraser: stroke.is_eraser,
        }
    }

    /// Local id for this record. Missing ids get a fresh random UUID.
    pub fn shape_id(&self) -> Uuid {
        if self.id.is_empty() {
            return Uuid::new_v4();
        }
        Uuid::parse_str(&self.id)
            .unwrap_or_else(|_| Uuid::new_v5(&Uuid::NAMESPACE_OID, self.id.as_bytes()))
    }

    /// Convert into a local stroke.
    pub fn to_stroke(&self) -> Stroke {
        Stroke::reconstruct(
            self.shape_id(),
            self.points.clone(),
            ShapeStyle::new(self.color, self.thickness),
            self.is_eraser,
        )
    }
}

/// Payload of `stroke:add`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeAdd {
    pub stroke: StrokeRecord,
}

/// Payload of `stroke:erase`. The index is a rank among strokes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeErase {
    #[serde(default)]
    pub user_id: Option<String>,
    pub stroke_index: i64,
}

/// Payload of `chat:message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub user: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Payload of `room:join`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomJoin {
    pub room_id: String,
    pub username: String,
    pub user_key: String,
}

/// Payload of `board:sync`. The relay stores strokes opaquely, so it sends
/// `BoardSync<Value>`; clients decode `BoardSync<StrokeRecord>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSync<S = StrokeRecord> {
    pub strokes: Vec<S>,
    #[serde(default)]
    pub users: Vec<Value>,
}

/// Payload of `chat:sync`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSync<C = ChatEntry> {
    #[serde(rename = "chatHistory")]
    pub chat_history: Vec<C>,
}

/// Messages a drawing engine reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    BoardSync(BoardSync),
    StrokeAdd(StrokeRecord),
    StrokeErase(StrokeErase),
    /// Anything the engine has no use for (chat, cursors, live stroke previews).
    Ignored,
}

impl RemoteEvent {
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, ProtocolError> {
        Ok(match envelope.kind.as_str() {
            message_type::BOARD_SYNC => {
                // Records are decoded one by one so a single bad stroke on
                // the board cannot block the whole sync.
                let sync: BoardSync<Value> = envelope.payload_as()?;
                let total = sync.strokes.len();
                let strokes: Vec<StrokeRecord> = sync
                    .strokes
                    .into_iter()
                    .enumerate()
                    .filter_map(|(i, raw)| match serde_json::from_value(raw) {
                        Ok(record) => Some(record),
                        Err(e) => {
                            log::warn!("skipping board sync stroke {i}: {e}");
                            None
                        }
                    })
                    .collect();
                if strokes.len() < total {
                    log::warn!("board sync kept {} of {total} strokes", strokes.len());
                }
                RemoteEvent::BoardSync(BoardSync {
                    strokes,
                    users: sync.users,
                })
            }
            message_type::STROKE_ADD => {
                RemoteEvent::StrokeAdd(envelope.payload_as::<StrokeAdd>()?.stroke)
            }
            message_type::STROKE_ERASE => RemoteEvent::StrokeErase(envelope.payload_as()?),
            _ => RemoteEvent::Ignored,
        })
    }
}

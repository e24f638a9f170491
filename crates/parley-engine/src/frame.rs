//! Text frame codec for the live channel.
//!
//! The backend speaks Socket.IO v4 over a plain websocket. Only the subset
//! of the framing needed for one namespace and JSON events is handled:
//!
//! | Frame            | Meaning                              |
//! |------------------|--------------------------------------|
//! | `0{..}`          | engine open (handshake)              |
//! | `1`              | engine close                         |
//! | `2` / `3`        | engine ping / pong                   |
//! | `40` / `40{..}`  | namespace connect / connect ack      |
//! | `41`             | namespace disconnect                 |
//! | `42["ev",data]`  | event                                |
//! | `44{..}`         | namespace connect error              |

use crate::message::Message;
use serde::Serialize;
use serde_json::Value;

/// Outbound event name for joining a conversation room.
pub const JOIN_ROOM: &str = "joinRoom";
/// Outbound event name for sending a message.
pub const SEND_MESSAGE: &str = "sendMessage";
/// Inbound event name for a delivered message.
pub const NEW_MESSAGE: &str = "newMessage";

/// Payload of an outbound `sendMessage` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendPayload {
    #[serde(rename = "connectionRequest")]
    pub conversation_id: String,
    pub sender: String,
    #[serde(rename = "message")]
    pub body: String,
}

/// Events the client emits on the live channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    /// Join the room for a conversation.
    JoinRoom(String),
    /// Send a message into the current conversation.
    SendMessage(SendPayload),
}

impl OutboundEvent {
    /// Event name on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom(_) => JOIN_ROOM,
            Self::SendMessage(_) => SEND_MESSAGE,
        }
    }

    /// Encode as a text frame.
    pub fn encode(&self) -> Result<String, FrameError> {
        let body = match self {
            Self::JoinRoom(id) => serde_json::to_string(&(self.name(), id)),
            Self::SendMessage(p) => serde_json::to_string(&(self.name(), p)),
        }
        .map_err(FrameError::Json)?;
        Ok(format!("42{body}"))
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Engine handshake; the client must answer with a namespace connect.
    Open,
    /// Engine-level close.
    Close,
    /// Server heartbeat; answer with [`Frame::PONG`].
    Ping,
    /// Heartbeat reply (ignored when received).
    Pong,
    /// Namespace connect acknowledgment.
    ConnectAck,
    /// Namespace disconnect.
    Disconnect,
    /// Namespace connect refused.
    ConnectError(String),
    /// Inbound `newMessage` event.
    NewMessage(Message),
    /// Any other event, kept by name only.
    Event(String),
}

impl Frame {
    /// Namespace connect request.
    pub const CONNECT: &'static str = "40";
    /// Heartbeat reply.
    pub const PONG: &'static str = "3";

    /// Decode a text frame.
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        let mut chars = text.chars();
        let engine = chars.next().ok_or(FrameError::Empty)?;
        let rest = chars.as_str();

        match engine {
            '0' => Ok(Self::Open),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping),
            '3' => Ok(Self::Pong),
            '4' => Self::decode_packet(rest),
            other => Err(FrameError::UnknownType(other)),
        }
    }

    fn decode_packet(packet: &str) -> Result<Self, FrameError> {
        let mut chars = packet.chars();
        let kind = chars.next().ok_or(FrameError::Empty)?;
        let data = chars.as_str();

        match kind {
            '0' => Ok(Self::ConnectAck),
            '1' => Ok(Self::Disconnect),
            '2' => Self::decode_event(data),
            '4' => Ok(Self::ConnectError(data.to_string())),
            other => Err(FrameError::UnknownType(other)),
        }
    }

    fn decode_event(data: &str) -> Result<Self, FrameError> {
        // Namespace and ack id are not used by this client; skip to the array.
        let start = data.find('[').ok_or(FrameError::Malformed)?;
        let value: Value = serde_json::from_str(&data[start..]).map_err(FrameError::Json)?;
        let Value::Array(mut items) = value else {
            return Err(FrameError::Malformed);
        };
        if items.is_empty() {
            return Err(FrameError::Malformed);
        }
        let name = match items.remove(0) {
            Value::String(name) => name,
            _ => return Err(FrameError::Malformed),
        };

        if name == NEW_MESSAGE {
            let payload = items.into_iter().next().ok_or(FrameError::Malformed)?;
            let message = serde_json::from_value(payload).map_err(FrameError::Json)?;
            Ok(Self::NewMessage(message))
        } else {
            Ok(Self::Event(name))
        }
    }
}

/// Errors decoding or encoding frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Zero-length frame.
    #[error("empty frame")]
    Empty,

    /// Unsupported packet type.
    #[error("unknown packet type: {0}")]
    UnknownType(char),

    /// Event packet without a `["name", ...]` array.
    #[error("malformed event packet")]
    Malformed,

    /// JSON payload error.
    #[error("JSON error: {0}")]
    Json(#[source] serde_json::Error),
}

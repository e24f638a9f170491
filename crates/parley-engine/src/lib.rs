//! parley-engine: Headless engine for the parley chat client
//!
//! This crate provides the non-UI half of a single-conversation chat view:
//! - Message and roster types matching the backend's JSON records
//! - Configuration for the backend endpoints and reconnection policy
//! - History loading over HTTP
//! - The live channel (websocket transport and frame codec)
//! - The chat session: binding lifecycle, inbound filtering, optimistic send

pub mod channel;
pub mod config;
pub mod frame;
pub mod history;
pub mod message;
pub mod session;

// Re-export commonly used types
pub use channel::{
    ChannelError, ChannelEvent, ChannelLink, Connector, Emitter, LiveConnector, ReconnectPolicy,
};
pub use config::{Config, ConfigError};
pub use frame::{Frame, FrameError, OutboundEvent, SendPayload};
pub use history::{fetch_ticket, HistoryError, HistoryResult, HistorySource, HistoryTicket, HttpHistory};
pub use message::{Message, Roster, RosterEntry};
pub use session::{BindState, ChatSession, Participants, SendOutcome};

/// Returns the engine version.
pub fn engine_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

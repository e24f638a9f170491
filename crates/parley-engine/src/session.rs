//! Chat session for a single conversation.
//!
//! [`ChatSession`] owns the displayed message list and the live channel
//! binding for the current conversation. It is driven from the outside:
//!
//! - [`ChatSession::bind`] / [`ChatSession::switch_conversation`] open a
//!   binding and hand back a [`HistoryTicket`] for the caller to fetch;
//! - [`ChatSession::apply_history`] installs a fetched history if the ticket
//!   is still current;
//! - [`ChatSession::poll_channel`] drains pending channel events without
//!   blocking;
//! - [`ChatSession::send`] performs an optimistic send.

use crate::channel::{ChannelError, ChannelEvent, ChannelLink, Connector, Emitter};
use crate::frame::{OutboundEvent, SendPayload};
use crate::history::{HistoryError, HistoryTicket};
use crate::message::{Message, Roster};
use std::collections::HashSet;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, info, warn};

/// Live channel binding state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindState {
    /// No connection.
    #[default]
    Unconnected,
    /// Connection opened (or reconnecting), waiting for acknowledgment.
    Connecting,
    /// Room joined; inbound messages are being accepted.
    Joined,
}

impl std::fmt::Display for BindState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unconnected => write!(f, "offline"),
            Self::Connecting => write!(f, "connecting"),
            Self::Joined => write!(f, "joined"),
        }
    }
}

/// Who is talking, as supplied by the host application.
#[derive(Debug, Clone, Default)]
pub struct Participants {
    /// Identifier of the local user.
    pub current_user: String,
    /// Identifier of the other party.
    pub counterpart: String,
    /// Users known for display-name resolution.
    pub roster: Roster,
}

/// Outcome of [`ChatSession::send`].
#[derive(Debug)]
pub enum SendOutcome {
    /// Text was empty after trimming; nothing happened.
    Ignored,
    /// Optimistic message appended and event emitted.
    Sent { local_id: String },
    /// Emission failed; the optimistic message was removed again.
    RolledBack { local_id: String, error: ChannelError },
}

/// The active binding. Dropping it releases the connection.
struct Binding {
    emitter: Box<dyn Emitter>,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
}

/// State for one chat view.
pub struct ChatSession {
    connector: Box<dyn Connector>,
    participants: Participants,
    conversation_id: String,
    messages: Vec<Message>,
    state: BindState,
    generation: u64,
    binding: Option<Binding>,
}

impl ChatSession {
    /// Create an unbound session for a conversation.
    pub fn new(
        connector: Box<dyn Connector>,
        participants: Participants,
        conversation_id: impl Into<String>,
    ) -> Self {
        Self {
            connector,
            participants,
            conversation_id: conversation_id.into(),
            messages: Vec::new(),
            state: BindState::Unconnected,
            generation: 0,
            binding: None,
        }
    }

    /// Current conversation identifier.
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Displayed messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Binding state.
    pub fn state(&self) -> BindState {
        self.state
    }

    /// Binding generation; bumped on every bind.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Host-supplied participants.
    pub fn participants(&self) -> &Participants {
        &self.participants
    }

    /// Whether a message was sent by the local user.
    pub fn is_own(&self, message: &Message) -> bool {
        message.sender == self.participants.current_user
    }

    /// Display name for a message's sender.
    pub fn sender_name<'a>(&'a self, message: &'a Message) -> &'a str {
        self.participants.roster.display_name(&message.sender)
    }

    /// Display name of the other party.
    pub fn counterpart_name(&self) -> &str {
        self.participants
            .roster
            .display_name(&self.participants.counterpart)
    }

    /// Bind to the current conversation, replacing any existing binding.
    ///
    /// Returns the ticket for the history fetch the caller should issue.
    pub fn bind(&mut self) -> HistoryTicket {
        self.unbind();
        self.generation += 1;

        match self.connector.connect(&self.conversation_id) {
            Ok(ChannelLink { emitter, events }) => {
                self.binding = Some(Binding { emitter, events });
                self.state = BindState::Connecting;
                debug!(conversation = %self.conversation_id, generation = self.generation, "bound");
            }
            Err(e) => {
                warn!(conversation = %self.conversation_id, error = %e, "failed to open live channel");
            }
        }

        HistoryTicket {
            generation: self.generation,
            conversation_id: self.conversation_id.clone(),
        }
    }

    /// Move to another conversation.
    ///
    /// Returns `None` when the identifier is unchanged and a binding already
    /// exists.
    pub fn switch_conversation(&mut self, conversation_id: impl Into<String>) -> Option<HistoryTicket> {
        let conversation_id = conversation_id.into();
        if conversation_id == self.conversation_id && self.binding.is_some() {
            return None;
        }
        info!(from = %self.conversation_id, to = %conversation_id, "switching conversation");
        self.conversation_id = conversation_id;
        Some(self.bind())
    }

    /// Tear down the live channel binding.
    pub fn unbind(&mut self) {
        if self.binding.take().is_some() {
            debug!(conversation = %self.conversation_id, "unbound");
        }
        self.state = BindState::Unconnected;
    }

    /// Install a fetched history.
    ///
    /// Returns `true` if the list was replaced. Failures are logged and leave
    /// the list untouched; results for a superseded binding are dropped.
    pub fn apply_history(
        &mut self,
        ticket: &HistoryTicket,
        result: Result<Vec<Message>, HistoryError>,
    ) -> bool {
        if ticket.generation != self.generation {
            debug!(
                conversation = %ticket.conversation_id,
                generation = ticket.generation,
                current = self.generation,
                "discarding stale history"
            );
            return false;
        }

        match result {
            Ok(mut messages) => {
                // Ids stay unique; the first occurrence wins
                let mut seen = HashSet::new();
                let received = messages.len();
                messages.retain(|m| seen.insert(m.id.clone()));
                if messages.len() < received {
                    warn!(
                        conversation = %ticket.conversation_id,
                        dropped = received - messages.len(),
                        "history contained duplicate ids"
                    );
                }
                debug!(count = messages.len(), "history loaded");
                self.messages = messages;
                true
            }
            Err(e) => {
                warn!(conversation = %ticket.conversation_id, error = %e, "error fetching chat messages");
                false
            }
        }
    }

    /// Handle all pending channel events without blocking.
    ///
    /// Returns the number of events handled.
    pub fn poll_channel(&mut self) -> usize {
        // Collect events first to avoid borrow issues
        let (events, closed) = {
            let Some(binding) = &mut self.binding else {
                return 0;
            };
            let mut events = Vec::new();
            let closed = loop {
                match binding.events.try_recv() {
                    Ok(event) => events.push(event),
                    Err(TryRecvError::Empty) => break false,
                    Err(TryRecvError::Disconnected) => break true,
                }
            };
            (events, closed)
        };

        let count = events.len();
        for event in events {
            self.handle_event(event);
        }

        if closed && self.binding.is_some() {
            warn!(conversation = %self.conversation_id, "live channel ended");
            self.unbind();
        }

        count
    }

    fn handle_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Connected => self.join(),
            ChannelEvent::Message(message) => self.receive(message),
            ChannelEvent::Disconnected { reason } => {
                if self.binding.is_some() {
                    debug!(%reason, "reconnecting");
                    self.state = BindState::Connecting;
                }
            }
            ChannelEvent::GaveUp { attempts } => {
                warn!(attempts, "live channel gave up");
                self.unbind();
            }
        }
    }

    fn join(&mut self) {
        let Some(binding) = &self.binding else {
            return;
        };
        match binding
            .emitter
            .emit(OutboundEvent::JoinRoom(self.conversation_id.clone()))
        {
            Ok(()) => {
                info!(conversation = %self.conversation_id, "joined room");
                self.state = BindState::Joined;
            }
            Err(e) => warn!(error = %e, "failed to join room"),
        }
    }

    fn receive(&mut self, message: Message) {
        if message.conversation_id != self.conversation_id {
            debug!(
                conversation = %message.conversation_id,
                bound = %self.conversation_id,
                "discarding message for another conversation"
            );
            return;
        }
        if self.messages.iter().any(|m| m.id == message.id) {
            debug!(id = %message.id, "discarding duplicate message");
            return;
        }
        self.messages.push(message);
    }

    /// Send a message optimistically.
    ///
    /// Whitespace-only text is ignored. Otherwise a local message is
    /// appended first, then `sendMessage` is emitted; if emission fails the
    /// local message is removed again.
    pub fn send(&mut self, text: &str) -> SendOutcome {
        if text.trim().is_empty() {
            return SendOutcome::Ignored;
        }

        let local = Message::local(
            self.conversation_id.clone(),
            self.participants.current_user.clone(),
            text,
        );
        let local_id = local.id.clone();
        self.messages.push(local);

        let event = OutboundEvent::SendMessage(SendPayload {
            conversation_id: self.conversation_id.clone(),
            sender: self.participants.current_user.clone(),
            body: text.to_string(),
        });
        let emitted = match &self.binding {
            Some(binding) => binding.emitter.emit(event),
            None => Err(ChannelError::NotConnected),
        };

        match emitted {
            Ok(()) => SendOutcome::Sent { local_id },
            Err(error) => {
                warn!(error = %error, "error sending chat message");
                self.messages.retain(|m| m.id != local_id);
                SendOutcome::RolledBack { local_id, error }
            }
        }
    }
}

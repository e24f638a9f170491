//! Live channel transport.
//!
//! A [`Connector`] opens one duplex connection per conversation binding and
//! hands back a [`ChannelLink`]: an [`Emitter`] for outbound events plus a
//! receiver of [`ChannelEvent`]s. [`LiveConnector`] is the websocket
//! implementation; each link owns a background task that is aborted when
//! the link's emitter is dropped.

use crate::config::{Config, ConfigError};
use crate::frame::{Frame, OutboundEvent};
use crate::message::Message;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn, Instrument};
use url::Url;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Events delivered from the live channel to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Connection acknowledged by the server (also sent after a reconnect).
    Connected,
    /// Inbound `newMessage` event.
    Message(Message),
    /// Transport lost; the channel will retry if attempts remain.
    Disconnected { reason: String },
    /// Reconnection attempts exhausted; no further events follow.
    GaveUp { attempts: u32 },
}

/// Outbound half of a live channel.
pub trait Emitter {
    /// Queue an event for sending. Never blocks; an error means the event
    /// was not accepted.
    fn emit(&self, event: OutboundEvent) -> Result<(), ChannelError>;
}

/// An open channel binding.
pub struct ChannelLink {
    /// Outbound half.
    pub emitter: Box<dyn Emitter>,
    /// Inbound events, in arrival order.
    pub events: mpsc::UnboundedReceiver<ChannelEvent>,
}

/// Opens live channel bindings.
pub trait Connector {
    /// Open a connection for a conversation.
    fn connect(&self, conversation_id: &str) -> Result<ChannelLink, ChannelError>;
}

/// Bounded fixed-delay reconnection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Attempts after a transport loss before giving up.
    pub attempts: u32,
    /// Delay before each attempt.
    pub delay: Duration,
}

impl ReconnectPolicy {
    /// Policy taken from config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            attempts: config.reconnect_attempts,
            delay: config.reconnect_delay(),
        }
    }
}

/// Websocket connector for the chat backend.
#[derive(Debug, Clone)]
pub struct LiveConnector {
    config: Config,
}

impl LiveConnector {
    /// Create a connector for the configured backend.
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl Connector for LiveConnector {
    /// Must be called from within a tokio runtime.
    fn connect(&self, conversation_id: &str) -> Result<ChannelLink, ChannelError> {
        let url = self.config.socket_url()?;
        let policy = ReconnectPolicy::from_config(&self.config);

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let span = tracing::info_span!("live_channel", conversation = %conversation_id);
        let task = tokio::spawn(run_connection(url, policy, outbound_rx, events_tx).instrument(span));

        Ok(ChannelLink {
            emitter: Box::new(LiveChannel {
                outbound: outbound_tx,
                task,
            }),
            events: events_rx,
        })
    }
}

/// Emitter side of a websocket binding. Dropping it closes the connection.
pub struct LiveChannel {
    outbound: mpsc::UnboundedSender<OutboundEvent>,
    task: JoinHandle<()>,
}

impl Emitter for LiveChannel {
    fn emit(&self, event: OutboundEvent) -> Result<(), ChannelError> {
        self.outbound.send(event).map_err(|_| ChannelError::Closed)
    }
}

impl Drop for LiveChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// How a single connection ended.
enum Ended {
    /// Owner went away; stop for good.
    Shutdown,
    /// Transport lost; `joined` records whether the server acknowledged first.
    Lost { reason: String, joined: bool },
}

async fn run_connection(
    url: Url,
    policy: ReconnectPolicy,
    mut outbound: mpsc::UnboundedReceiver<OutboundEvent>,
    events: mpsc::UnboundedSender<ChannelEvent>,
) {
    let mut attempts = 0;

    loop {
        debug!(%url, attempts, "connecting");
        let reason = match connect_async(url.as_str()).await {
            Ok((socket, _)) => match drive(socket, &mut outbound, &events).await {
                Ended::Shutdown => return,
                Ended::Lost { reason, joined } => {
                    if joined {
                        attempts = 0;
                    }
                    reason
                }
            },
            Err(e) => e.to_string(),
        };

        warn!(%reason, attempts, "live channel lost");
        if events.send(ChannelEvent::Disconnected { reason }).is_err() {
            return;
        }

        if attempts >= policy.attempts {
            warn!(attempts, "giving up on live channel");
            let _ = events.send(ChannelEvent::GaveUp { attempts });
            return;
        }
        attempts += 1;
        tokio::time::sleep(policy.delay).await;
    }
}

/// Pump one websocket connection until it ends.
async fn drive(
    socket: Socket,
    outbound: &mut mpsc::UnboundedReceiver<OutboundEvent>,
    events: &mpsc::UnboundedSender<ChannelEvent>,
) -> Ended {
    let (mut sink, mut stream) = socket.split();
    let mut joined = false;

    let lost = |reason: String, joined: bool| Ended::Lost { reason, joined };

    loop {
        tokio::select! {
            incoming = stream.next() => {
                let text = match incoming {
                    None => return lost("stream ended".into(), joined),
                    Some(Err(e)) => return lost(e.to_string(), joined),
                    Some(Ok(WsMessage::Text(text))) => text,
                    Some(Ok(WsMessage::Close(_))) => return lost("closed by server".into(), joined),
                    Some(Ok(_)) => continue,
                };

                let reply = match Frame::decode(&text) {
                    Ok(Frame::Open) => Some(Frame::CONNECT),
                    Ok(Frame::Ping) => Some(Frame::PONG),
                    Ok(Frame::ConnectAck) => {
                        info!("live channel connected");
                        joined = true;
                        if events.send(ChannelEvent::Connected).is_err() {
                            return Ended::Shutdown;
                        }
                        None
                    }
                    Ok(Frame::NewMessage(message)) => {
                        if events.send(ChannelEvent::Message(message)).is_err() {
                            return Ended::Shutdown;
                        }
                        None
                    }
                    Ok(Frame::Close | Frame::Disconnect) => {
                        return lost("server closed the connection".into(), joined);
                    }
                    Ok(Frame::ConnectError(data)) => {
                        return lost(format!("connect refused: {data}"), joined);
                    }
                    Ok(Frame::Event(name)) => {
                        debug!(%name, "ignoring event");
                        None
                    }
                    Ok(Frame::Pong) => None,
                    Err(e) => {
                        warn!(error = %e, "dropping undecodable frame");
                        None
                    }
                };

                if let Some(reply) = reply {
                    if let Err(e) = sink.send(WsMessage::Text(reply.to_string())).await {
                        return lost(e.to_string(), joined);
                    }
                }
            }
            command = outbound.recv(), if joined => {
                let Some(command) = command else {
                    let _ = sink.close().await;
                    return Ended::Shutdown;
                };
                match command.encode() {
                    Ok(text) => {
                        if let Err(e) = sink.send(WsMessage::Text(text)).await {
                            return lost(e.to_string(), joined);
                        }
                    }
                    Err(e) => warn!(event = command.name(), error = %e, "dropping unencodable event"),
                }
            }
        }
    }
}

/// Errors from the live channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Socket endpoint could not be derived from config.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Connection task is gone.
    #[error("live channel is closed")]
    Closed,

    /// No binding is active.
    #[error("live channel is not connected")]
    NotConnected,
}

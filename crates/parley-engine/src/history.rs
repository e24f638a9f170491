//! Message history loading.
//!
//! History is read once per conversation binding. Each request is tagged
//! with a [`HistoryTicket`] so a response that arrives after the session has
//! moved to another conversation can be recognised and dropped.

use crate::config::{Config, ConfigError};
use crate::message::Message;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Source of past messages for a conversation.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Fetch the full history of a conversation, oldest first.
    async fn fetch(&self, conversation_id: &str) -> Result<Vec<Message>, HistoryError>;
}

/// Identifies one history request against the binding that issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTicket {
    /// Binding generation at the time the request was issued.
    pub generation: u64,
    /// Conversation the request is for.
    pub conversation_id: String,
}

/// Result of a ticketed history request.
pub type HistoryResult = (HistoryTicket, Result<Vec<Message>, HistoryError>);

/// Run a ticketed fetch against a source.
pub async fn fetch_ticket(source: Arc<dyn HistorySource>, ticket: HistoryTicket) -> HistoryResult {
    let result = source.fetch(&ticket.conversation_id).await;
    (ticket, result)
}

/// History loaded from the backend's REST endpoint.
#[derive(Debug, Clone)]
pub struct HttpHistory {
    client: reqwest::Client,
    config: Config,
}

impl HttpHistory {
    /// Create a history client for the configured backend.
    pub fn new(config: Config) -> Result<Self, HistoryError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(HistoryError::Request)?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl HistorySource for HttpHistory {
    async fn fetch(&self, conversation_id: &str) -> Result<Vec<Message>, HistoryError> {
        let url = self.config.history_url(conversation_id)?;
        debug!(%url, "fetching history");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(HistoryError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(HistoryError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(HistoryError::Request)?;
        serde_json::from_slice(&bytes).map_err(HistoryError::Decode)
    }
}

/// Errors that can occur while loading history.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// Endpoint could not be derived from config.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Transport failure or timeout.
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("server returned status {0}")]
    Status(u16),

    /// Body was not a JSON array of messages.
    #[error("invalid history body: {0}")]
    Decode(#[source] serde_json::Error),
}

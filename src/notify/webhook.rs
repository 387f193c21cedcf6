//! Webhook delivery of status cards.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::Client;
use thiserror::Error;

use super::card::StatusCard;

/// Request timeout; also the worst case one delivery can add to a tick.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Header carrying the optional device token.
const TOKEN_HEADER: &str = "Device-Token";

/// Errors from a single delivery attempt.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Connection could not be established.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Delivery exceeded the fixed timeout.
    #[error("Request timed out")]
    Timeout,
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NotifyError::Timeout
        } else if err.is_connect() {
            NotifyError::Connection(err.to_string())
        } else {
            NotifyError::Http(err.to_string())
        }
    }
}

/// Sends cards to a single webhook endpoint.
///
/// The agent loop is synchronous; the notifier owns a current-thread
/// runtime and blocks on each POST, so delivery stays serial with the rest
/// of the tick and is bounded by [`DELIVERY_TIMEOUT`].
#[derive(Debug)]
pub struct WebhookNotifier {
    client: Client,
    runtime: tokio::runtime::Runtime,
    url: String,
    token: Option<String>,
}

impl WebhookNotifier {
    /// Create a notifier for `url`. An empty token means no token header is
    /// sent.
    pub fn new(url: impl Into<String>, token: Option<String>) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(DELIVERY_TIMEOUT).build()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            client,
            runtime,
            url: url.into(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// One delivery attempt. Returns the response status code; never
    /// retries.
    pub fn send(&self, card: &StatusCard) -> Result<u16, NotifyError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let payload = card.to_payload(timestamp);

        self.runtime.block_on(async {
            let mut request = self.client.post(&self.url).json(&payload);
            if let Some(token) = &self.token {
                request = request.header(TOKEN_HEADER, token);
            }
            let response = request.send().await?;
            Ok(response.status().as_u16())
        })
    }
}

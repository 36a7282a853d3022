//! Webhook notification dispatcher.
//!
//! One outbound POST per call, no retries: retry policy belongs to whatever
//! triggers the next evaluation. Every failure class — transport error,
//! non-success status, serialization error — is reported as `false` and
//! never propagates.

use reqwest::Client;
use serde::Serialize;

use crate::error::Result;
use crate::models::HttpConfig;
use crate::utils::http::create_async_client;

/// Dispatcher for outbound webhook notifications.
#[derive(Debug, Clone)]
pub struct WebhookDispatcher {
    client: Client,
}

impl WebhookDispatcher {
    /// Create a dispatcher with a client configured from `config`.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
        })
    }

    /// POST `payload` as JSON to `url`.
    ///
    /// Returns `true` only for a completed request with a success-range
    /// status code.
    pub async fn dispatch<T: Serialize + Sync>(&self, url: &str, payload: &T) -> bool {
        if url.trim().is_empty() {
            log::warn!("No webhook URL configured; dropping notification");
            return false;
        }

        match self.client.post(url).json(payload).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                log::warn!("Webhook {} answered status {}", url, response.status());
                false
            }
            Err(e) => {
                log::warn!("Webhook request to {} failed: {}", url, e);
                false
            }
        }
    }
}

// crates/plan-review-providers/src/webhook.rs
// ============================================================================
// Module: Webhook Notifier
// Description: Notifier posting `{"text": ...}` to a chat webhook.
// Purpose: Deliver rendered review messages.
// Dependencies: plan-review-core, reqwest, serde
// ============================================================================

//! ## Overview
//! The webhook URL is a credential: it is never logged and is stripped from
//! transport errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use plan_review_core::Notifier;
use plan_review_core::NotifierError;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde::Serialize;
use tracing::debug;

// ============================================================================
// SECTION: Notifier
// ============================================================================

/// Request body accepted by incoming-webhook endpoints.
#[derive(Serialize)]
struct WebhookPayload<'a> {
    /// Message text.
    text: &'a str,
}

/// Webhook-backed [`Notifier`].
pub struct WebhookNotifier {
    /// Webhook endpoint.
    url: Url,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl WebhookNotifier {
    /// Creates a notifier for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifierError::NotConfigured`] when the URL is invalid or the
    /// HTTP client cannot be created.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, NotifierError> {
        let url = Url::parse(url)
            .map_err(|_| NotifierError::NotConfigured("invalid webhook url".to_string()))?;
        if !matches!(url.scheme(), "https" | "http") {
            return Err(NotifierError::NotConfigured("unsupported webhook url scheme".to_string()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|_| NotifierError::NotConfigured("http client build failed".to_string()))?;
        Ok(Self {
            url,
            client,
        })
    }
}

impl Notifier for WebhookNotifier {
    fn deliver(&self, text: &str) -> Result<(), NotifierError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&WebhookPayload {
                text,
            })
            .send()
            .map_err(|err| {
                if err.is_timeout() {
                    NotifierError::DeliveryFailed("request timed out".to_string())
                } else {
                    NotifierError::DeliveryFailed(err.without_url().to_string())
                }
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifierError::DeliveryFailed(format!("http status {}", status.as_u16())));
        }
        debug!(bytes = text.len(), "webhook accepted message");
        Ok(())
    }
}

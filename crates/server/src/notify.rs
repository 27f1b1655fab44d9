use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use teetime_core::notify::{Notifier, NotifyError};
use teetime_core::OwnerId;
use tracing::info;

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    to: &'a str,
    body: &'a str,
}

/// Posts notification text to an outbound messaging gateway.
pub struct WebhookNotifier {
    client: Client,
    url: String,
    token: Option<SecretString>,
}

impl WebhookNotifier {
    pub fn new(
        url: impl Into<String>,
        token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url: url.into(), token })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn deliver(&self, to: &OwnerId, body: &str) -> Result<(), NotifyError> {
        let mut request = self.client.post(&self.url).json(&WebhookPayload { to: &to.0, body });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|error| NotifyError::Delivery(format!("webhook request failed: {error}")))?;
        if !response.status().is_success() {
            return Err(NotifyError::Delivery(format!(
                "webhook endpoint returned {}",
                response.status()
            )));
        }

        info!(event_name = "notify.delivered", to = %to, "notification delivered via webhook");
        Ok(())
    }
}

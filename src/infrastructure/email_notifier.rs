//! Restock notifications through a transactional email HTTP API
//!
//! The provider is expected to accept `POST {api_url}` with a bearer token
//! and a JSON body `{from, to, subject, html, text}` (Resend/Postmark style).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::errors::{DeliveryError, UserLookupError};
use crate::domain::notification::RestockEmail;
use crate::domain::repositories::UserDirectory;
use crate::domain::services::Notifier;
use crate::infrastructure::config::NotifierConfig;

/// Provider error bodies are truncated to this many chars in logs and errors
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

pub struct EmailNotifier {
    client: Client,
    config: NotifierConfig,
    users: Arc<dyn UserDirectory>,
}

impl EmailNotifier {
    pub fn new(config: NotifierConfig, users: Arc<dyn UserDirectory>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create email HTTP client")?;

        Ok(Self { client, config, users })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn resolve_email(&self, user_id: &str) -> Result<String, UserLookupError> {
        self.users
            .find_email(user_id)
            .await?
            .ok_or_else(|| UserLookupError::NoEmail {
                user_id: user_id.to_string(),
            })
    }

    async fn send_restock_email(
        &self,
        email: &str,
        product_name: &str,
        product_url: &str,
    ) -> Result<(), DeliveryError> {
        let message = RestockEmail::render(product_name, product_url);
        let body = SendEmailRequest {
            from: &self.config.from_address,
            to: [email],
            subject: &message.subject,
            html: &message.html,
            text: &message.text,
        };

        debug!("Sending restock email for {} to {}", product_name, email);
        let mut request = self.client.post(&self.config.api_url).json(&body);
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DeliveryError::Timeout
            } else {
                DeliveryError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(MAX_ERROR_BODY_CHARS)
                .collect();
            warn!("📧 Email provider rejected message ({}): {}", status, body);
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!("📧 Restock email sent to {} for {}", email, product_name);
        Ok(())
    }
}

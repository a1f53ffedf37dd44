use async_trait::async_trait;
use crate::config::WhatsAppConfig;
use crate::error::{NotifyError, Result};
use crate::providers::trait_impl::Notifier;
use olivefly_core::ServiceConfig;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

const MAX_ERROR_BODY_CHARS: usize = 500;

pub struct WhatsAppNotifier {
    config: WhatsAppConfig,
    client: Client,
}

impl WhatsAppNotifier {
    pub fn new(config: WhatsAppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn from_service(config: &ServiceConfig) -> Result<Self> {
        Self::new(WhatsAppConfig::from_service(config))
    }

    pub fn config(&self) -> &WhatsAppConfig {
        &self.config
    }

    /// Keep only the digits of a phone number, e.g. `+39 333-111` becomes `39333111`.
    pub fn clean_recipient(to: &str) -> Result<String> {
        let digits: String = to.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Err(NotifyError::InvalidRecipient(to.to_string()));
        }
        Ok(digits)
    }

    pub fn message_body(to: &str, text: &str) -> Value {
        json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": { "body": text },
        })
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

#[async_trait]
impl Notifier for WhatsAppNotifier {
    fn name(&self) -> &'static str {
        "whatsapp"
    }

    fn is_configured(&self) -> bool {
        self.config.has_credentials()
    }

    async fn send(&self, to: &str, text: &str) -> Result<()> {
        if !self.is_configured() {
            return Err(NotifyError::MissingCredentials);
        }
        let recipient = Self::clean_recipient(to)?;

        // never log the full token
        let token_prefix = if self.config.token.len() > 8 {
            self.config.token.get(..8).unwrap_or("***")
        } else {
            "***"
        };
        debug!("Sending WhatsApp message with token {}...", token_prefix);

        let response = self
            .client
            .post(self.config.messages_url())
            .bearer_auth(&self.config.token)
            .json(&Self::message_body(&recipient, text))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body: truncate_chars(&text, MAX_ERROR_BODY_CHARS),
            });
        }

        info!("WhatsApp message sent ({} digits recipient)", recipient.len());
        Ok(())
    }
}

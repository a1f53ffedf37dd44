use olivefly_core::ServiceConfig;
use serde::{Deserialize, Serialize};

/// WhatsApp Cloud API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    pub token: String,
    pub phone_number_id: String,
    pub api_version: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            phone_number_id: String::new(),
            api_version: "v17.0".to_string(),
            base_url: "https://graph.facebook.com".to_string(),
            timeout_secs: 15,
        }
    }
}

impl WhatsAppConfig {
    pub fn from_service(config: &ServiceConfig) -> Self {
        Self {
            token: config.whatsapp_token.clone(),
            phone_number_id: config.whatsapp_phone_number_id.clone(),
            api_version: config.whatsapp_api_version.clone(),
            base_url: config.whatsapp_base_url.clone(),
            timeout_secs: config.notify_timeout_secs,
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.token.is_empty() && !self.phone_number_id.is_empty()
    }

    /// `{base}/{version}/{phone_number_id}/messages`
    pub fn messages_url(&self) -> String {
        format!(
            "{}/{}/{}/messages",
            self.base_url.trim_end_matches('/'),
            self.api_version,
            self.phone_number_id
        )
    }
}

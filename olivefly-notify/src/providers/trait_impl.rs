use async_trait::async_trait;
use crate::error::Result;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Get the channel name
    fn name(&self) -> &'static str;

    /// Check if credentials are set
    fn is_configured(&self) -> bool;

    /// Deliver a text message to `to`
    async fn send(&self, to: &str, text: &str) -> Result<()>;
}

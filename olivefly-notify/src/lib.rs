//! olivefly-notify: outbound notifications for detection results

pub mod config;
pub mod error;
pub mod providers;


pub use config::WhatsAppConfig;
pub use error::{NotifyError, Result};
pub use providers::{Notifier, WhatsAppNotifier};

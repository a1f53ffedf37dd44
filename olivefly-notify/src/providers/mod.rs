pub mod trait_impl;
pub mod whatsapp;

pub use trait_impl::Notifier;
pub use whatsapp::WhatsAppNotifier;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("WhatsApp credentials missing")]
    MissingCredentials,

    #[error("Invalid recipient: {0:?}")]
    InvalidRecipient(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WhatsApp send failed: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

pub type Result<T> = std::result::Result<T, NotifyError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Malformed candidate at index {index}: {reason}")]
    MalformedCandidate { index: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

//! Top-level error types for Zalobot.

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error enum wrapping domain-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Attachment(#[from] AttachmentError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Generation API and model selection errors.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("unknown model key: {0}")]
    UnknownModel(String),

    #[error("upstream generation failed with status {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("upstream request failed: {0}")]
    Transport(String),

    #[error("upstream returned no content")]
    EmptyResponse,
}

/// Attachment download and content errors.
#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("failed to download attachment: {0}")]
    Download(String),

    #[error("attachment too large: {size} bytes (limit {limit})")]
    TooLarge { size: usize, limit: usize },

    #[error("unsupported attachment content: {0}")]
    Unsupported(String),
}

/// Bot API delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("bot API request failed: {0}")]
    Request(String),

    #[error("bot API rejected the call with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

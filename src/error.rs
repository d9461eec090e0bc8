use thiserror::Error;

/// Startup configuration problems. Raised before any browser activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(String),

    #[error("invalid place URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("star filter value {0} is outside 1-5")]
    StarOutOfRange(i64),

    #[error("output path must not be empty")]
    EmptyOutputPath,
}

/// A single payload could not be turned into a tree. The caller skips it.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("payload body is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("output I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize review: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("browser error: {0}")]
    Browser(#[from] anyhow::Error),

    #[error("could not open the reviews panel, no locator matched")]
    ReviewsPanelNotFound,

    #[error(transparent)]
    Sink(#[from] SinkError),
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;

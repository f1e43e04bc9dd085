use thiserror::Error;

/// Error type for fetching, decoding and rendering call-center statistics.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Data source responded with status {0}")]
    Status(u16),
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Plotting error: {0}")]
    Plot(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StatsError>;

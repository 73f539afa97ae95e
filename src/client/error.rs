use thiserror::Error;

/// Failures seen by the uploading side of the protocol
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Non-2xx answer from the asset API, with its `{error, errors}` payload
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        errors: Vec<String>,
    },

    /// A single transfer attempt to object storage failed
    #[error("Transfer failed: {0}")]
    Transfer(String),

    /// Compensating delete after a failed upload did not go through
    #[error("Cleanup failed for '{key}': {reason}")]
    Cleanup { key: String, reason: String },

    #[error("Server returned no upload URL for '{0}'")]
    MissingUploadUrl(String),

    #[error("Invalid checksum: {0}")]
    Checksum(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

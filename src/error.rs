use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the LinkHut client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("no API token configured")]
    MissingToken,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("{resource} not found")]
    NotFound { resource: String },
    #[error("bookmark already exists: {url}")]
    AlreadyExists { url: String },
    #[error("API error {status}: {message}")]
    Api { status: StatusCode, message: String },
}

impl Error {
    /// Maps a non-2xx response onto the taxonomy: 404 is surfaced as
    /// `NotFound`, everything else keeps its status and server message.
    pub fn from_status(status: StatusCode, resource: &str, body: String) -> Self {
        if status == StatusCode::NOT_FOUND {
            return Error::NotFound {
                resource: resource.to_string(),
            };
        }
        let message = if body.trim().is_empty() {
            "unknown API error".to_string()
        } else {
            body
        };
        Error::Api { status, message }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Error::NotFound {
            resource: resource.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

use thiserror::Error;

/// Errors raised while talking to the CLC API
#[derive(Error, Debug)]
pub enum ClcError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CLC API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Failed to parse CLC response: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid API url: {0}")]
    Url(#[from] url::ParseError),

    #[error("{0}")]
    Credentials(String),

    #[error("Asynchronous request {id} failed")]
    RequestFailed { id: String },

    #[error("Timed out after {seconds}s waiting for {what}")]
    WaitTimeout { what: String, seconds: u64 },

    #[error("Unexpected CLC response: {0}")]
    UnexpectedResponse(String),
}

impl ClcError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClcError::NotFound(_))
    }
}

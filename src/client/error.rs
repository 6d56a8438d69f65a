use thiserror::Error;

pub const EMPTY_INPUT_MESSAGE: &str = "Please enter a repository URL";
pub const REQUEST_FALLBACK_MESSAGE: &str = "Failed to analyze repository";

/// The two ways an analysis attempt can end without a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The URL was blank; no request was made.
    #[error("{}", EMPTY_INPUT_MESSAGE)]
    EmptyInput,
    /// Non-success status, transport failure, or a body that does not match
    /// the expected shape.
    #[error("{0}")]
    Request(String),
}

impl ClientError {
    pub fn request(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            ClientError::Request(REQUEST_FALLBACK_MESSAGE.to_string())
        } else {
            ClientError::Request(message)
        }
    }

    pub fn http_status(code: u16) -> Self {
        ClientError::Request(format!("HTTP error! status: {code}"))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::request(err.to_string())
    }
}

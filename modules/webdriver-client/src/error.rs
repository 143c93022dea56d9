use thiserror::Error;

pub type Result<T> = std::result::Result<T, WebDriverError>;

#[derive(Debug, Error)]
pub enum WebDriverError {
    #[error("Network error: {0}")]
    Network(String),

    /// Error payload returned by the driver (`{"value": {"error": ..., "message": ...}}`).
    #[error("WebDriver error (status {status}, {error}): {message}")]
    Api {
        status: u16,
        error: String,
        message: String,
    },

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl WebDriverError {
    /// True when the driver reports the element reference no longer exists in the DOM.
    pub fn is_stale_element(&self) -> bool {
        matches!(self, WebDriverError::Api { error, .. } if error == "stale element reference")
    }
}

impl From<reqwest::Error> for WebDriverError {
    fn from(err: reqwest::Error) -> Self {
        WebDriverError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for WebDriverError {
    fn from(err: serde_json::Error) -> Self {
        WebDriverError::Protocol(err.to_string())
    }
}

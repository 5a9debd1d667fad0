use std::io;
use thiserror::Error;

/// Shown in place of an AI reply whose exchange failed.
pub const CHAT_FAILURE_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";

/// Shown when an image batch could not be produced.
pub const IMAGE_FAILURE_MESSAGE: &str =
    "Failed to generate images. Please check the logs for details.";

/// Fallback for errors whose text is not meant for end users.
pub const UNKNOWN_FAILURE_MESSAGE: &str = "An unknown error occurred.";

/// Unified error type for the studio application
#[derive(Error, Debug)]
pub enum StudioError {
    /// Missing or invalid startup configuration (credentials, config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A provider call could not be started or completed.
    /// The payload is already fit for display.
    #[error("{0}")]
    Transport(String),

    /// The provider answered with an error
    #[error("API error: {0}")]
    Api(String),

    /// Connection-level failures
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// User input errors
    #[error("Input error: {0}")]
    Input(String),

    /// IO-related errors
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl StudioError {
    /// Text that may be shown to the user for this error.
    ///
    /// Only transport and input errors carry presentable text; anything else
    /// collapses to a generic message so provider details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            StudioError::Transport(message) => message.clone(),
            StudioError::Input(message) => message.clone(),
            _ => UNKNOWN_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl From<reqwest::Error> for StudioError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StudioError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            StudioError::Network(format!("Connection failed: {}", err))
        } else if err.is_status() {
            StudioError::Api(format!("API returned error status: {}", err))
        } else if err.is_decode() {
            StudioError::Serialization(format!("Failed to decode response: {}", err))
        } else {
            StudioError::Network(format!("Request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for StudioError {
    fn from(err: serde_json::Error) -> Self {
        StudioError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<serde_yml::Error> for StudioError {
    fn from(err: serde_yml::Error) -> Self {
        StudioError::Serialization(format!("YAML error: {}", err))
    }
}

impl From<base64::DecodeError> for StudioError {
    fn from(err: base64::DecodeError) -> Self {
        StudioError::Serialization(format!("Base64 error: {}", err))
    }
}

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChatError>;

/// Errors raised by the chat core.
///
/// Cloneable so a single debounced call can hand its outcome to every
/// caller it coalesced.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ChatError {
    /// Non-2xx status or a transport failure talking to the service.
    #[error("{}", remote_message(.status, .message))]
    Remote {
        status: Option<u16>,
        message: String,
    },

    /// The response body did not match the service contract.
    #[error("unexpected response from service: {0}")]
    Decode(String),

    /// A conversation operation was called in a state that forbids it.
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("io error: {0}")]
    Io(String),
}

fn remote_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("service returned {code}: {message}"),
        None => format!("request failed: {message}"),
    }
}

impl ChatError {
    pub fn remote_status(status: reqwest::StatusCode, body: impl Into<String>) -> Self {
        ChatError::Remote {
            status: Some(status.as_u16()),
            message: body.into(),
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ChatError::Decode(err.to_string());
        }
        ChatError::Remote {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for ChatError {
    fn from(err: std::io::Error) -> Self {
        ChatError::Io(err.to_string())
    }
}

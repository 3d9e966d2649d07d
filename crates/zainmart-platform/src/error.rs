use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("platform returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(String),
}

impl PlatformError {
    /// The message the platform itself attached to a failed call.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            PlatformError::Api { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            PlatformError::Api { status, .. } => Some(*status),
            PlatformError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

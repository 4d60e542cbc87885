use reqwest::Method;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the credential. The gateway has already torn the
    /// session down by the time the caller sees this.
    #[error("Unauthorized: {path}")]
    Unauthorized { path: String },

    #[error("{method} {path} failed with status {status}{}", message_suffix(.message))]
    Api {
        method: Method,
        path: String,
        status: u16,
        message: Option<String>,
    },

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Invalid seller package: {0}")]
    InvalidPackage(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid timestamp: {0}")]
    Timestamp(#[from] time::error::Parse),

    #[error("Timestamp formatting failed: {0}")]
    Format(#[from] time::error::Format),
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

impl Error {
    /// Whether the backend answered with `401 Unauthorized`.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// HTTP status of a backend rejection, if there was one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Message suitable for a toast: the backend's own `message` when it sent
    /// one, otherwise `fallback`.
    #[must_use]
    pub fn user_message<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self {
            Self::Api {
                message: Some(message),
                ..
            } => message,
            _ => fallback,
        }
    }
}

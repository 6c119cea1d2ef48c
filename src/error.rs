use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaseDeskError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Session expired, please log in again")]
    SessionExpired,

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Response stream unavailable")]
    StreamUnavailable,

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

impl CaseDeskError {
    /// Message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            CaseDeskError::Http(_) => {
                "Network error. Please check your connection and try again.".to_string()
            }
            CaseDeskError::Api { message, .. } => message.clone(),
            CaseDeskError::Validation(messages) => messages.join("\n"),
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            CaseDeskError::SessionExpired => Some(401),
            CaseDeskError::Api { status, .. } => Some(*status),
            CaseDeskError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl serde::Serialize for CaseDeskError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<anyhow::Error> for CaseDeskError {
    fn from(err: anyhow::Error) -> Self {
        CaseDeskError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CaseDeskError>;

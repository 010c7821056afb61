use serde::Serialize;
use thiserror::Error;

/// Which batch operation a [`AppError::PartialBatch`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchOperation {
    Move,
    Copy,
}

impl BatchOperation {
    pub fn verb(&self) -> &'static str {
        match self {
            BatchOperation::Move => "move",
            BatchOperation::Copy => "copy",
        }
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            BatchOperation::Move => "moved",
            BatchOperation::Copy => "copied",
        }
    }
}

#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum AppError {
    #[error("Video account access expired, please reconnect")]
    CredentialExpired,

    #[error("Video account is not connected")]
    NotConnected,

    #[error("Remote API error: {0}")]
    RemoteApi(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Failed to {} video {failed} after {} succeeded: {reason}", .operation.verb(), .succeeded.len())]
    PartialBatch {
        operation: BatchOperation,
        succeeded: Vec<String>,
        failed: String,
        reason: String,
    },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Another action is still in progress")]
    Busy,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// The inline message shown to the user when an action fails.
    pub fn user_message(&self) -> String {
        match self {
            AppError::CredentialExpired => {
                "Video account access expired. Please reconnect.".to_string()
            }
            AppError::NotConnected => "Connect your video account first.".to_string(),
            AppError::RemoteApi(msg) => format!("Video service error: {}", msg),
            AppError::Validation(msg) | AppError::Parse(msg) => msg.clone(),
            AppError::PartialBatch { operation, .. } => format!(
                "Failed to {} videos. Some videos may have been {}. Please try again.",
                operation.verb(),
                operation.past_tense()
            ),
            AppError::Store(_) | AppError::Config(_) => {
                "Something went wrong. Please try again.".to_string()
            }
            AppError::NotFound(what) => format!("{} no longer exists.", what),
            AppError::Busy => "Please wait for the current action to finish.".to_string(),
        }
    }

    /// Whether the failure means the remote credential must be re-acquired.
    pub fn requires_reconnect(&self) -> bool {
        matches!(self, AppError::CredentialExpired | AppError::NotConnected)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Store(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::RemoteApi(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Store(format!("Serialization error: {}", e))
    }
}

/// Core error type for the confession bot.
///
/// Adapter crates should map their specific errors into this type so the core
/// can decide consistently between a user-facing refusal and a retryable failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("external surface error: {0}")]
    ExternalSurface(String),

    #[error("timed out after {0:?}: {1}")]
    Timeout(std::time::Duration, String),

    #[error("store corruption: {0}")]
    StoreCorruption(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Platform hiccups the initiating actor may simply retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ExternalSurface(_) | Error::Timeout(..))
    }

    /// Short, non-technical text for the initiating actor.
    ///
    /// Full detail belongs in the operational log, never in this string.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::Forbidden(_) => "🚫 You are not allowed to do that.",
            Error::NotFound(_) => "❓ That confession does not exist (anymore).",
            Error::InvalidState(_) => "ℹ️ That confession has already been handled.",
            Error::InvalidInput(_) => "✏️ Your message is empty.",
            Error::ExternalSurface(_) | Error::Timeout(..) => {
                "⏳ Something went wrong on our side. Please try again."
            }
            Error::StoreCorruption(_) | Error::Config(_) | Error::Io(_) | Error::Json(_) => {
                "❌ An error occurred."
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

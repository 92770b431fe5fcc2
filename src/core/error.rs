use thiserror::Error;

/// Centralized error types for the application
///
/// All errors in the application are converted to this enum for consistent error handling.
/// Uses `thiserror` for automatic error conversion and display formatting.
#[derive(Error, Debug)]
pub enum AppError {
    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// HTTP/Fetch errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP status code errors
    #[error("HTTP request failed with status: {0}")]
    HttpStatus(reqwest::StatusCode),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Search engine errors (Meilisearch request/response failures)
    #[error("Search error: {0}")]
    Search(String),

    /// Management service (index storage) errors
    #[error("Management service error: {0}")]
    Management(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration errors (missing or malformed environment variables)
    #[error("Config error: {0}")]
    Config(String),

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

/// Type alias for backward compatibility
pub type BotError = AppError;

/// Helper function to convert String to AppError::Search
impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Search(err)
    }
}

/// Helper function to convert &str to AppError::Search
impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::Search(err.to_string())
    }
}

use thiserror::Error;

use crate::download::error::FetchError;

/// Centralized error types for the application
///
/// Errors raised anywhere in the engine are converted to this enum before they reach
/// the job boundary, where they are turned into log events.
///
/// # Example
///
/// ```no_run
/// use tubeforge::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Fetch stage errors (yt-dlp)
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Transcoder errors (ffmpeg)
    #[error("Transcode error: {0}")]
    Transcode(String),

    /// External process exceeded its wall-clock ceiling
    #[error("Process timed out after {0}s")]
    Timeout(u64),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file errors
    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::error::FetchErrorKind;

    #[test]
    fn test_fetch_error_converts() {
        let err: AppError = FetchError::new(FetchErrorKind::Network, "connection reset").into();
        assert!(matches!(err, AppError::Fetch(_)));
        assert_eq!(err.to_string(), "Fetch error: connection reset");
    }

    #[test]
    fn test_timeout_display() {
        assert_eq!(AppError::Timeout(30).to_string(), "Process timed out after 30s");
    }
}

use thiserror::Error;

/// Centralized error types for the application
///
/// Errors from the lower layers (intake, processors, sources) are converted into this
/// enum at the composition root and surfaces.
///
/// # Example
///
/// ```no_run
/// use retouchcore::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Work submission rejected at intake
    #[error("Submission rejected: {0}")]
    Submit(#[from] crate::enhance::SubmitError),

    /// Image processing errors
    #[error("Processing error: {0}")]
    Processing(#[from] crate::processing::ProcessError),

    /// Source resolution errors
    #[error("Source error: {0}")]
    Source(#[from] crate::enhance::SourceError),

    /// HTTP/Fetch errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration values
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

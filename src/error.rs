// Error handling module
// Defines the sync error taxonomy and process exit codes

use thiserror::Error;

/// Errors that can occur while syncing project progress into the README
#[derive(Error, Debug)]
pub enum SyncError {
    /// Missing or invalid configuration, detected before any network call
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token exchange, refresh or validation rejected
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Non-retryable error response from the intra API
    #[error("Intra API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Retryable failure that persisted through every attempt
    #[error("Transient network error after {attempts} attempts: {message}")]
    Transient { attempts: u32, message: String },

    /// The API returned no project records at all
    #[error("Intra API returned no project records")]
    EmptyResult,

    /// START/END marker pair for a section is incomplete
    #[error("Markers for section {tag} not found")]
    MarkerNotFound { tag: String },

    /// Internal error (I/O, parsing)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl SyncError {
    /// Process exit status for a fatal error
    pub fn exit_code(&self) -> i32 {
        match self {
            SyncError::Config(_) => 2,
            SyncError::Auth(_) => 3,
            SyncError::Api { .. } | SyncError::Transient { .. } => 4,
            SyncError::EmptyResult => 5,
            SyncError::MarkerNotFound { .. } | SyncError::Internal(_) => 1,
        }
    }

    /// Whether the error is an HTTP 401 from the API
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SyncError::Api { status: 401, .. })
    }
}

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

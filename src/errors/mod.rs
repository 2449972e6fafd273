//! Error types for the upload widget.

use thiserror::Error;

/// Result type for upload widget operations.
pub type UploadWidgetResult<T> = Result<T, UploadWidgetError>;

/// Top-level error type for the upload widget.
#[derive(Debug, Error)]
pub enum UploadWidgetError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Selection error.
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    /// Transport error.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Upload error.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),
}

impl UploadWidgetError {
    /// Creates a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        UploadWidgetError::Configuration(ConfigurationError::InvalidConfiguration(msg.into()))
    }

    /// Creates a file access error.
    pub fn file_unreadable(msg: impl Into<String>) -> Self {
        UploadWidgetError::Selection(SelectionError::FileUnreadable(msg.into()))
    }

    /// Creates a network error.
    pub fn network(msg: impl Into<String>) -> Self {
        UploadWidgetError::Transport(TransportError::Network(msg.into()))
    }

    /// Creates an upload rejection error for a non-success HTTP status.
    pub fn rejected(status: u16) -> Self {
        UploadWidgetError::Upload(UploadError::Rejected { status })
    }

    /// Returns the HTTP status the failure should be reported with.
    ///
    /// Failures that never reached the server report `0`, the status a
    /// browser exposes for network errors.
    pub fn status_code(&self) -> u16 {
        match self {
            UploadWidgetError::Upload(UploadError::Rejected { status }) => *status,
            _ => 0,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid form field name.
    #[error("Invalid field name: {0}")]
    InvalidFieldName(String),
}

/// Selection errors.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// A staged file could not be read.
    #[error("File unreadable: {0}")]
    FileUnreadable(String),

    /// A staged file changed size after it was selected.
    #[error("File size changed: {name} (expected {expected} bytes, found {actual})")]
    SizeChanged {
        /// File name.
        name: String,
        /// Size recorded at selection time.
        expected: u64,
        /// Size found at upload time.
        actual: u64,
    },
}

/// Upload errors.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The server answered outside the 200–399 range.
    #[error("Upload rejected with status {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
    },

    /// The event stream ended without a completion.
    #[error("Upload interrupted: {0}")]
    Interrupted(String),
}

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network error.
    #[error("Network error: {0}")]
    Network(String),

    /// Timeout error.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// HTTP error.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request body could not be produced.
    #[error("Body error: {0}")]
    Body(String),
}

#[cfg(not(target_arch = "wasm32"))]
impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Network(err.to_string())
        } else if err.is_body() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Http(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code() {
        let error = UploadWidgetError::rejected(500);
        assert_eq!(error.status_code(), 500);

        let error = UploadWidgetError::network("connection refused");
        assert_eq!(error.status_code(), 0);

        let error = UploadWidgetError::file_unreadable("photo.png");
        assert_eq!(error.status_code(), 0);
    }

    #[test]
    fn test_display() {
        let error = UploadWidgetError::rejected(413);
        assert_eq!(error.to_string(), "Upload error: Upload rejected with status 413");

        let error = UploadWidgetError::Selection(SelectionError::SizeChanged {
            name: "a.png".to_string(),
            expected: 10,
            actual: 12,
        });
        assert!(error.to_string().contains("a.png"));
    }
}

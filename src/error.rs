use thiserror::Error;

use crate::stager::MAX_FILE_SIZE;

/// Errors that can occur during the sell flow
#[derive(Error, Debug)]
pub enum SellError {
    /// File not found on local filesystem
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Permission denied accessing local file
    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    /// File exceeds the per-image size ceiling
    #[error("File too large: {path} is {size} bytes (max: {max} bytes)")]
    FileTooLarge { path: String, size: u64, max: u64 },

    /// The broker refused or failed the batch sign request
    #[error("Upload-URL request failed with status {status}: {message}")]
    Broker { status: u16, message: String },

    /// Broker returned a different number of targets than files requested
    #[error("Broker returned {returned} upload targets for {requested} files")]
    TargetCountMismatch { requested: usize, returned: usize },

    /// One or more direct uploads failed; the listing was not submitted
    #[error("{failed} of {total} uploads failed; listing not submitted")]
    UploadsIncomplete { failed: usize, total: usize },

    /// The backend rejected the listing record
    #[error("Listing rejected: {message}")]
    ListingRejected { message: String },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error wrapper
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl SellError {
    /// Create an error from an IO error with the offending path
    pub fn from_io_error(error: std::io::Error, path: &str) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::FileNotFound {
                path: path.to_string(),
            },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                path: path.to_string(),
            },
            _ => Self::Io(error),
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::FileNotFound { path } => {
                format!(
                    "File not found: {}\n\nPossible solutions:\n  \
                     1. Check if the file path is correct\n  \
                     2. Verify the file exists: ls -la {}",
                    path, path
                )
            }
            Self::FileTooLarge { path, size, .. } => {
                format!(
                    "Image too large: {} ({} bytes, limit {} bytes)\n\nPossible solutions:\n  \
                     1. Resize or re-encode the image before listing\n  \
                     2. Keep each image under 5 MiB",
                    path, size, MAX_FILE_SIZE
                )
            }
            Self::Broker { status, message } => {
                format!(
                    "The marketplace refused to issue upload URLs (status {}): {}\n\nPossible solutions:\n  \
                     1. Check MARKET_SESSION_TOKEN in .env (log in again if expired)\n  \
                     2. Verify MARKET_API_URL points at the right backend",
                    status, message
                )
            }
            Self::UploadsIncomplete { failed, total } => {
                format!(
                    "{} of {} image uploads failed, so the listing was not submitted.\n\n\
                     Your draft is unchanged; fix the failing files or your connection and retry.",
                    failed, total
                )
            }
            Self::ListingRejected { message } => {
                format!(
                    "The marketplace rejected the listing: {}\n\n\
                     Your draft is unchanged; adjust it and retry.",
                    message
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for sell-flow operations
pub type Result<T> = std::result::Result<T, SellError>;

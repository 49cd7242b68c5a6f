//! Rate Limit Error Types
//!
//! This module provides rate-limit-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use std::io;
use std::path::PathBuf;

use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Rate-limit-specific result type alias
pub type RateLimitResult<T> = Result<T, RateLimitError>;

/// Rate-limit-specific error variants
///
/// Store failures are advisory: callers log them and fall back to allowing
/// the login. Only `Refused` reaches a client, and then with a generic
/// message.
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Lock file could not be opened or locked
    #[error("Failed to lock {}: {source}", .path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Counter file could not be read
    #[error("Failed to load {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Counter file could not be written or replaced
    #[error("Failed to save {}: {source}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Table could not be serialized
    #[error("Failed to encode rate limit table: {0}")]
    Encode(#[from] serde_json::Error),

    /// Expiry marker could not be read or touched
    #[error("Failed to access expiry marker {}: {source}", .path.display())]
    Marker {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Protocol name is unusable as a file name
    #[error("Invalid protocol name: {0:?}")]
    InvalidProtocol(String),

    /// Client reached the hit limit (counts are for logs only)
    #[error("Too many failed logins, please try again later")]
    Refused { hits: u64, max_hits: u64 },
}

impl RateLimitError {
    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            RateLimitError::Lock { .. }
            | RateLimitError::Load { .. }
            | RateLimitError::Save { .. }
            | RateLimitError::Marker { .. } => ErrorKind::TransientStore,
            RateLimitError::Encode(_) => ErrorKind::Internal,
            RateLimitError::InvalidProtocol(_) => ErrorKind::Configuration,
            RateLimitError::Refused { .. } => ErrorKind::Refused,
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        let err = AppError::new(self.kind(), self.to_string());
        match self {
            RateLimitError::Refused { .. } => {
                err.with_action("Wait for the failed attempts to expire")
            }
            _ => err,
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self, proto: &str) {
        match self {
            RateLimitError::Refused { hits, max_hits } => {
                tracing::warn!(proto, hits, max_hits, "Rate limit refused login");
            }
            _ => {
                tracing::error!(proto, error = %self, "Rate limit store failure");
            }
        }
    }
}

impl From<RateLimitError> for AppError {
    fn from(err: RateLimitError) -> Self {
        err.to_app_error().with_source(err)
    }
}

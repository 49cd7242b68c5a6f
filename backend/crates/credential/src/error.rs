//! Credential Error Types
//!
//! This module provides credential-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use std::fmt;

use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::crypto::HexError;
use platform::password::{
    CipherError, LegacyError, PasswordHashError, PolicyParseError, PolicyViolation, StrengthError,
};
use thiserror::Error;

/// Credential-specific result type alias
pub type CredentialResult<T> = Result<T, CredentialError>;

/// Which policy a password was held against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyScope {
    Current,
    Legacy,
}

impl fmt::Display for PolicyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyScope::Current => write!(f, "password policy"),
            PolicyScope::Legacy => write!(f, "password legacy policy"),
        }
    }
}

/// Credential-specific error variants
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Password rejected by the site policy
    #[error("password does not fit {scope}: {violation}")]
    Policy {
        scope: PolicyScope,
        violation: PolicyViolation,
    },

    /// Configured policy string is unusable
    #[error("Invalid password policy: {0}")]
    PolicyParse(#[from] PolicyParseError),

    /// Strength checker configured but unavailable
    #[error("Strength checker: {0}")]
    Strength(#[from] StrengthError),

    /// Encryption misconfigured, unavailable or undecryptable value
    #[error("Password encryption: {0}")]
    Cipher(#[from] CipherError),

    /// Stored PBKDF2 hash is malformed or uses an unknown function
    #[error("Stored password hash: {0}")]
    Hash(#[from] PasswordHashError),

    /// Stored legacy value is malformed
    #[error("Stored legacy password: {0}")]
    Legacy(#[from] LegacyError),

    /// Site salt is not usable hex
    #[error("Site salt: {0}")]
    Salt(#[from] HexError),

    /// Required site salt is not configured
    #[error("No site {0} configured")]
    MissingSalt(&'static str),

    /// Random generation never met the policy
    #[error("Failed to generate a password fitting the site policy in {0} tries")]
    GenerationExhausted(usize),
}

impl CredentialError {
    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CredentialError::Policy { .. } => ErrorKind::PolicyViolation,
            CredentialError::PolicyParse(_)
            | CredentialError::Strength(_)
            | CredentialError::Salt(_)
            | CredentialError::MissingSalt(_) => ErrorKind::Configuration,
            CredentialError::Cipher(err) => match err {
                CipherError::Format(_) | CipherError::Decrypt => ErrorKind::Format,
                CipherError::Unavailable
                | CipherError::MissingSalt
                | CipherError::KeyTooShort(_) => ErrorKind::Configuration,
            },
            CredentialError::Hash(err) => match err {
                PasswordHashError::InvalidFormat(_) => ErrorKind::Format,
                PasswordHashError::UnsupportedHashFunction(_) => ErrorKind::Configuration,
            },
            CredentialError::Legacy(_) => ErrorKind::Format,
            CredentialError::GenerationExhausted(_) => ErrorKind::Internal,
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        let err = AppError::new(self.kind(), self.to_string());
        match self {
            CredentialError::Policy {
                violation: PolicyViolation::TooShort { .. },
                ..
            } => err.with_action("Please choose a longer password"),
            CredentialError::Policy {
                violation: PolicyViolation::TooSimple { .. },
                ..
            } => err.with_action("Mix lowercase, uppercase, digits and other characters"),
            CredentialError::Policy { .. } => err.with_action("Please choose a less guessable password"),
            _ => err,
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self.kind() {
            ErrorKind::PolicyViolation => tracing::warn!(error = %self, "Password policy violation"),
            ErrorKind::Format => tracing::warn!(error = %self, "Malformed stored credential"),
            ErrorKind::Configuration => tracing::error!(error = %self, "Credential configuration error"),
            _ => tracing::error!(error = %self, "Credential error"),
        }
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        err.to_app_error().with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_message_is_actionable() {
        let err = CredentialError::Policy {
            scope: PolicyScope::Current,
            violation: PolicyViolation::TooShort { min_length: 8 },
        };
        assert_eq!(
            err.to_string(),
            "password does not fit password policy: password too short, at least 8 chars required"
        );
        let app = err.to_app_error();
        assert_eq!(app.kind(), ErrorKind::PolicyViolation);
        assert_eq!(app.user_message(), err.to_string());
        assert!(app.action().is_some());
    }

    #[test]
    fn test_legacy_scope_in_message() {
        let err = CredentialError::Policy {
            scope: PolicyScope::Legacy,
            violation: PolicyViolation::TooSimple { min_classes: 2 },
        };
        assert!(err.to_string().starts_with("password does not fit password legacy policy"));
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            CredentialError::from(StrengthError::Unavailable).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            CredentialError::from(CipherError::Decrypt).kind(),
            ErrorKind::Format
        );
        assert_eq!(
            CredentialError::from(CipherError::Unavailable).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            CredentialError::from(PasswordHashError::InvalidFormat("salt")).kind(),
            ErrorKind::Format
        );
        assert_eq!(
            CredentialError::MissingSalt("digest salt").to_app_error().kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            CredentialError::GenerationExhausted(42).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_configuration_details_hidden_from_users() {
        let app: AppError = CredentialError::MissingSalt("digest salt").into();
        assert!(!app.user_message().contains("digest"));
        assert!(std::error::Error::source(&app).is_some());
    }
}

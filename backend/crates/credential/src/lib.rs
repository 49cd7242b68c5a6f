//! Password Credentials
//!
//! Clean Architecture structure:
//! - `domain/` - Stored credential values, verification caches
//! - `application/` - Configuration, policy engine, hashing, checks,
//!   generation and CSRF tokens
//!
//! ## Security Model
//! - New passwords are PBKDF2 hashes; legacy scrambles, digests and
//!   encrypted values keep verifying until they are migrated
//! - Every comparison of secrets runs in constant time
//! - Caches are keyed by fingerprints, never by cleartext
//! - A policy violation, wrong password or malformed stored value is a
//!   plain mismatch; only broken configuration is an error

pub mod application;
pub mod domain;
pub mod error;

// Re-exports for convenience
pub use application::checker::{CheckOptions, CredentialChecker, LoginContext};
pub use application::config::CredentialConfig;
pub use application::generate::{DEFAULT_TRIES, generate_random_password};
pub use application::hashing::PasswordHasher;
pub use application::policy_engine::PolicyEngine;
pub use application::tokens::TokenService;
pub use domain::{Scheme, StoredCredential, VerificationCache};
pub use error::{CredentialError, CredentialResult, PolicyScope};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

pub use platform::password::ClearTextPassword;

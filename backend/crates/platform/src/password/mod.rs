//! Password Hashing, Legacy Encodings and Policy
//!
//! Password handling for the grid portal login services:
//! - PBKDF2 hashing with a stable `PBKDF2$...` wire format
//! - Constant-time verification
//! - Legacy scramble/digest encodings and reversible encryption, kept so
//!   existing user databases keep verifying
//! - Policy rules (length and character classes) and an optional strength
//!   checker
//! - Zeroization of cleartext passwords

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

pub mod cipher;
pub mod generate;
pub mod hash;
pub mod legacy;
pub mod policy;
pub mod strength;

pub use cipher::{CipherError, CipherKey, PasswordCipher, select_cipher};
pub use generate::{policy_charset, random_ascii};
pub use hash::{HashFunction, PasswordHash, PasswordHashError, Pbkdf2Params};
pub use legacy::{
    DIGEST_PREFIX, LegacyError, make_digest, scramble_digest, scramble_password,
    unscramble_digest, unscramble_password,
};
pub use policy::{CharClass, PasswordPolicy, PolicyParseError, PolicyViolation};
pub use strength::{StrengthChecker, StrengthError, select_checker};

// ============================================================================
// Clear Text Password (Zeroized on drop)
// ============================================================================

/// Clear text password with automatic memory zeroization
///
/// ## Security
/// - Implements `Zeroize` and `ZeroizeOnDrop`
/// - Does not implement `Clone` to prevent accidental copies
/// - Debug output is redacted
///
/// No policy is applied here: stored legacy credentials must keep verifying
/// even when they predate the active policy. Policy is checked separately.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Get the password as bytes for hashing
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClearTextPassword {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

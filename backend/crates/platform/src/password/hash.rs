//! PBKDF2 Password Hashes
//!
//! Stored format: `PBKDF2$<hash function>$<iterations>$<base64 salt>$<base64 key>`.
//! This string lives in user databases indefinitely, so parsing must keep
//! accepting every hash function and cost factor ever written.
//!
//! The base64 *text* of the salt is what is fed to PBKDF2, not the decoded
//! bytes. Existing hashes depend on that.

use std::fmt;
use std::str::FromStr;

use pbkdf2::pbkdf2_hmac;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use thiserror::Error;

use super::ClearTextPassword;
use crate::crypto::{constant_time_eq, from_base64, random_bytes, to_base64};

/// Algorithm tag leading every stored hash
pub const HASH_ALGORITHM: &str = "PBKDF2";

/// Random salt length in bytes (before base64)
pub const SALT_LENGTH: usize = 12;

/// Derived key length in bytes for new hashes
pub const KEY_LENGTH: usize = 24;

/// Default iteration count for new hashes
pub const DEFAULT_COST_FACTOR: u32 = 10_000;

/// Highest iteration count accepted from a stored hash
pub const MAX_COST_FACTOR: u32 = 10_000_000;

/// Upper bound on stored key length we are willing to recompute
const MAX_KEY_LENGTH: usize = 1024;

/// Password hash errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordHashError {
    /// Stored value is not a well-formed PBKDF2 string
    #[error("Invalid password hash format: {0}")]
    InvalidFormat(&'static str),

    /// Hash function name is not supported
    #[error("Unsupported hash function: {0}")]
    UnsupportedHashFunction(String),
}

// ============================================================================
// Hash function
// ============================================================================

/// HMAC hash function used inside PBKDF2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashFunction {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl HashFunction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            HashFunction::Sha1 => "sha1",
            HashFunction::Sha224 => "sha224",
            HashFunction::Sha256 => "sha256",
            HashFunction::Sha384 => "sha384",
            HashFunction::Sha512 => "sha512",
        }
    }

    fn derive(self, password: &[u8], salt: &[u8], rounds: u32, out: &mut [u8]) {
        match self {
            HashFunction::Sha1 => pbkdf2_hmac::<Sha1>(password, salt, rounds, out),
            HashFunction::Sha224 => pbkdf2_hmac::<Sha224>(password, salt, rounds, out),
            HashFunction::Sha256 => pbkdf2_hmac::<Sha256>(password, salt, rounds, out),
            HashFunction::Sha384 => pbkdf2_hmac::<Sha384>(password, salt, rounds, out),
            HashFunction::Sha512 => pbkdf2_hmac::<Sha512>(password, salt, rounds, out),
        }
    }
}

impl FromStr for HashFunction {
    type Err = PasswordHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" => Ok(HashFunction::Sha1),
            "sha224" => Ok(HashFunction::Sha224),
            "sha256" => Ok(HashFunction::Sha256),
            "sha384" => Ok(HashFunction::Sha384),
            "sha512" => Ok(HashFunction::Sha512),
            _ => Err(PasswordHashError::UnsupportedHashFunction(s.to_string())),
        }
    }
}

impl fmt::Display for HashFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for new hashes. Only affect newly generated passwords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pbkdf2Params {
    pub hash_function: HashFunction,
    /// Iteration count, linear to the hashing time
    pub cost_factor: u32,
}

impl Default for Pbkdf2Params {
    fn default() -> Self {
        Self {
            hash_function: HashFunction::Sha256,
            cost_factor: DEFAULT_COST_FACTOR,
        }
    }
}

// ============================================================================
// Password hash
// ============================================================================

/// Parsed PBKDF2 password hash
///
/// ## Examples
/// ```rust
/// use platform::password::{ClearTextPassword, PasswordHash, Pbkdf2Params};
///
/// let password = ClearTextPassword::new("Password12");
/// let hashed = PasswordHash::generate(&password, &Pbkdf2Params::default());
///
/// let stored = hashed.to_string();
/// let restored: PasswordHash = stored.parse().unwrap();
/// assert!(restored.verify(&password));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash {
    hash_function: HashFunction,
    cost_factor: u32,
    salt: String,
    key: Vec<u8>,
}

impl PasswordHash {
    /// Hash a password with a fresh random salt
    pub fn generate(password: &ClearTextPassword, params: &Pbkdf2Params) -> Self {
        let salt = to_base64(&random_bytes(SALT_LENGTH));
        let mut key = vec![0u8; KEY_LENGTH];
        params
            .hash_function
            .derive(password.as_bytes(), salt.as_bytes(), params.cost_factor, &mut key);

        Self {
            hash_function: params.hash_function,
            cost_factor: params.cost_factor,
            salt,
            key,
        }
    }

    /// Parse a stored `PBKDF2$...` string
    pub fn parse(encoded: &str) -> Result<Self, PasswordHashError> {
        let parts: Vec<&str> = encoded.split('$').collect();
        let [algorithm, function, cost, salt, key] = parts.as_slice() else {
            return Err(PasswordHashError::InvalidFormat("expected five '$' separated fields"));
        };

        if *algorithm != HASH_ALGORITHM {
            return Err(PasswordHashError::InvalidFormat("missing PBKDF2 tag"));
        }

        let hash_function = function.parse::<HashFunction>()?;

        let cost_factor = cost
            .parse::<u32>()
            .ok()
            .filter(|c| (1..=MAX_COST_FACTOR).contains(c))
            .ok_or(PasswordHashError::InvalidFormat("iteration count"))?;

        if salt.is_empty() {
            return Err(PasswordHashError::InvalidFormat("empty salt"));
        }

        let key = from_base64(key).map_err(|_| PasswordHashError::InvalidFormat("derived key"))?;
        if key.is_empty() || key.len() > MAX_KEY_LENGTH {
            return Err(PasswordHashError::InvalidFormat("derived key length"));
        }

        Ok(Self {
            hash_function,
            cost_factor,
            salt: salt.to_string(),
            key,
        })
    }

    /// Verify a password against this hash
    ///
    /// Recomputes the key with the embedded parameters and compares in
    /// constant time.
    pub fn verify(&self, password: &ClearTextPassword) -> bool {
        let mut candidate = vec![0u8; self.key.len()];
        self.hash_function.derive(
            password.as_bytes(),
            self.salt.as_bytes(),
            self.cost_factor,
            &mut candidate,
        );
        constant_time_eq(&self.key, &candidate)
    }

    /// Check if the hash was made with other parameters than the current ones
    pub fn needs_rehash(&self, current: &Pbkdf2Params) -> bool {
        self.hash_function != current.hash_function || self.cost_factor < current.cost_factor
    }

    pub fn hash_function(&self) -> HashFunction {
        self.hash_function
    }

    pub fn cost_factor(&self) -> u32 {
        self.cost_factor
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }
}

impl FromStr for PasswordHash {
    type Err = PasswordHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}${}${}${}${}",
            HASH_ALGORITHM,
            self.hash_function,
            self.cost_factor,
            self.salt,
            to_base64(&self.key)
        )
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHash")
            .field("hash_function", &self.hash_function)
            .field("cost_factor", &self.cost_factor)
            .field("key", &"[HASH]")
            .finish()
    }
}

//! Password Hashing
//!
//! PBKDF2 hashing with the site parameters.

use platform::password::{ClearTextPassword, PasswordHash, Pbkdf2Params};

use crate::application::config::CredentialConfig;
use crate::domain::stored::StoredCredential;
use crate::error::CredentialError;

#[derive(Debug, Clone, Default)]
pub struct PasswordHasher {
    params: Pbkdf2Params,
}

impl PasswordHasher {
    pub fn new(params: Pbkdf2Params) -> Self {
        Self { params }
    }

    pub fn from_config(config: &CredentialConfig) -> Self {
        Self::new(config.pbkdf2_params())
    }

    pub fn params(&self) -> &Pbkdf2Params {
        &self.params
    }

    /// Hash with a fresh salt
    pub fn hash(&self, password: &ClearTextPassword) -> PasswordHash {
        PasswordHash::generate(password, &self.params)
    }

    /// Verify against a stored `PBKDF2$...` string
    ///
    /// A malformed string is logged and never matches.
    pub fn verify(&self, password: &ClearTextPassword, stored: &str) -> bool {
        match PasswordHash::parse(stored) {
            Ok(hash) => hash.verify(password),
            Err(err) => {
                CredentialError::from(err).log();
                false
            }
        }
    }

    /// Whether a stored credential should be replaced by a fresh hash
    pub fn needs_rehash(&self, stored: &StoredCredential) -> bool {
        match stored {
            StoredCredential::Pbkdf2(hash) => hash.needs_rehash(&self.params),
            _ => true,
        }
    }
}

//! CSRF Token Service
//!
//! Anti-forgery tokens keyed by the site digest salt.

use platform::csrf;

use crate::application::config::CredentialConfig;
use crate::error::{CredentialError, CredentialResult};

/// Query fields never folded into trust tokens
pub const DEFAULT_SKIP_FIELDS: &[&str] = &["_csrf"];

#[derive(Clone)]
pub struct TokenService {
    site_salt: String,
}

impl TokenService {
    pub fn new(site_salt: impl Into<String>) -> Self {
        Self {
            site_salt: site_salt.into(),
        }
    }

    /// Tokens need the site digest salt
    pub fn from_config(config: &CredentialConfig) -> CredentialResult<Self> {
        config
            .digest_salt
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(Self::new)
            .ok_or(CredentialError::MissingSalt("digest salt"))
    }

    /// Token for `method` on `operation` by `identity`
    ///
    /// `limit` (e.g. a time bucket) bounds how long the token stays valid.
    pub fn csrf_token(
        &self,
        method: &str,
        operation: &str,
        identity: &str,
        limit: Option<&str>,
    ) -> CredentialResult<String> {
        Ok(csrf::csrf_token(&self.site_salt, method, operation, identity, limit)?)
    }

    /// Token binding the complete query arguments as well
    pub fn csrf_trust_token<I, K, V, S>(
        &self,
        method: &str,
        operation: &str,
        args: I,
        identity: &str,
        limit: Option<&str>,
        skip_fields: &[&str],
    ) -> CredentialResult<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(csrf::csrf_trust_token(
            &self.site_salt,
            method,
            operation,
            args,
            identity,
            limit,
            skip_fields,
        )?)
    }

    pub fn verify(
        &self,
        token: &str,
        method: &str,
        operation: &str,
        identity: &str,
        limit: Option<&str>,
    ) -> bool {
        let valid =
            csrf::verify_csrf_token(token, &self.site_salt, method, operation, identity, limit);
        if !valid {
            tracing::warn!(method, operation, identity, "CSRF token mismatch");
        }
        valid
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("site_salt", &"[REDACTED]")
            .finish()
    }
}

//! Application Configuration
//!
//! Site settings for password hashing, policies and legacy schemes.

use platform::crypto::random_bytes;
use platform::password::hash::MAX_COST_FACTOR;
use platform::password::{HashFunction, Pbkdf2Params};

pub const DEFAULT_PASSWORD_POLICY: &str = "medium";
pub const DEFAULT_COST_FACTOR: u32 = 10_000;

/// Credential subsystem configuration
#[derive(Clone)]
pub struct CredentialConfig {
    /// Policy for new passwords and logins (`none`, `weak`, `medium`,
    /// `high`, `modern:N`, `custom:N:M`)
    pub password_policy: String,
    /// More permissive policy still accepted at login
    pub legacy_policy: Option<String>,
    /// Hex salt for scrambled passwords and the derived encryption key
    pub password_salt: Option<String>,
    /// Hex salt for digests and CSRF tokens
    pub digest_salt: Option<String>,
    /// Run the strength checker after the policy rules
    pub strength_check: bool,
    /// Support reversible password encryption
    pub encryption: bool,
    /// PBKDF2 hash function for new hashes
    pub hash_function: HashFunction,
    /// PBKDF2 iterations for new hashes
    pub cost_factor: u32,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            password_policy: DEFAULT_PASSWORD_POLICY.to_string(),
            legacy_policy: None,
            password_salt: None,
            digest_salt: None,
            strength_check: false,
            encryption: false,
            hash_function: HashFunction::Sha256,
            cost_factor: DEFAULT_COST_FACTOR,
        }
    }
}

impl CredentialConfig {
    /// Create config with random site salts (for development)
    pub fn with_random_salts() -> Self {
        Self {
            password_salt: Some(hex::encode_upper(random_bytes(32))),
            digest_salt: Some(hex::encode_upper(random_bytes(32))),
            ..Default::default()
        }
    }

    /// Create config for development (random salts, encryption on)
    pub fn development() -> Self {
        Self {
            encryption: cfg!(feature = "encrypt"),
            ..Self::with_random_salts()
        }
    }

    /// Load from `GRIDAUTH_*` environment variables
    ///
    /// Unset values keep their defaults. Values are validated when the
    /// policy engine and checker are built from this config.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            password_policy: env_string("GRIDAUTH_PASSWORD_POLICY")
                .unwrap_or(defaults.password_policy),
            legacy_policy: env_string("GRIDAUTH_PASSWORD_LEGACY_POLICY"),
            password_salt: env_string("GRIDAUTH_PASSWORD_SALT"),
            digest_salt: env_string("GRIDAUTH_DIGEST_SALT"),
            strength_check: env_flag("GRIDAUTH_STRENGTH_CHECK").unwrap_or(defaults.strength_check),
            encryption: env_flag("GRIDAUTH_ENCRYPTION").unwrap_or(defaults.encryption),
            hash_function: env_string("GRIDAUTH_HASH_FUNCTION")
                .and_then(|raw| match raw.parse() {
                    Ok(function) => Some(function),
                    Err(err) => {
                        tracing::warn!(error = %err, "Ignoring GRIDAUTH_HASH_FUNCTION");
                        None
                    }
                })
                .unwrap_or(defaults.hash_function),
            cost_factor: env_string("GRIDAUTH_COST_FACTOR")
                .and_then(|raw| raw.parse::<u32>().ok())
                .filter(|cost| (1..=MAX_COST_FACTOR).contains(cost))
                .unwrap_or(defaults.cost_factor),
        }
    }

    /// PBKDF2 parameters for new hashes
    pub fn pbkdf2_params(&self) -> Pbkdf2Params {
        Pbkdf2Params {
            hash_function: self.hash_function,
            cost_factor: self.cost_factor,
        }
    }
}

impl std::fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |salt: &Option<String>| salt.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("CredentialConfig")
            .field("password_policy", &self.password_policy)
            .field("legacy_policy", &self.legacy_policy)
            .field("password_salt", &redact(&self.password_salt))
            .field("digest_salt", &redact(&self.digest_salt))
            .field("strength_check", &self.strength_check)
            .field("encryption", &self.encryption)
            .field("hash_function", &self.hash_function)
            .field("cost_factor", &self.cost_factor)
            .finish()
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_flag(name: &str) -> Option<bool> {
    let raw = env_string(name)?;
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(variable = name, value = %raw, "Ignoring unparsable flag");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CredentialConfig::default();
        assert_eq!(config.password_policy, "medium");
        assert!(config.legacy_policy.is_none());
        assert_eq!(config.hash_function, HashFunction::Sha256);
        assert_eq!(config.cost_factor, 10_000);
        assert!(!config.strength_check);
    }

    #[test]
    fn test_random_salts_are_hex() {
        let config = CredentialConfig::with_random_salts();
        let salt = config.password_salt.unwrap();
        assert_eq!(salt.len(), 64);
        assert!(salt.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(Some(salt), config.digest_salt);
    }

    #[test]
    fn test_debug_redacts_salts() {
        let config = CredentialConfig::with_random_salts();
        let salt = config.digest_salt.clone().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains(&salt));
    }
}

//! Credential Checker
//!
//! Checks a login password against whatever a user database stores for it
//! and makes new stored values. Every check runs the same steps:
//!
//! 1. verification cache: a password that already matched exactly this
//!    stored value is accepted without further work, policy included
//! 2. site policy (see [`CheckOptions`])
//! 3. the scheme's own verification
//! 4. a match is added to the cache
//!
//! Only configuration problems are errors. Wrong passwords, policy
//! violations and malformed stored values are `Ok(false)`.

use platform::crypto::constant_time_eq;
use platform::password::legacy::{self, LegacyError};
use platform::password::{
    CipherError, CipherKey, ClearTextPassword, PasswordCipher, select_cipher,
};
use zeroize::Zeroizing;

use crate::application::config::CredentialConfig;
use crate::application::hashing::PasswordHasher;
use crate::application::policy_engine::PolicyEngine;
use crate::domain::cache::VerificationCache;
use crate::domain::stored::{Scheme, StoredCredential};
use crate::error::{CredentialError, CredentialResult};

/// Who is logging in, and where
#[derive(Debug, Clone, Copy)]
pub struct LoginContext<'a> {
    /// Protocol or service name, for logs
    pub service: &'a str,
    pub username: &'a str,
    /// Digest realm, only used by digest credentials
    pub realm: &'a str,
}

impl<'a> LoginContext<'a> {
    pub fn new(service: &'a str, username: &'a str) -> Self {
        Self {
            service,
            username,
            realm: "",
        }
    }

    pub fn with_realm(self, realm: &'a str) -> Self {
        Self { realm, ..self }
    }
}

/// How the site policy applies to a check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    /// Reject passwords violating the policy. When off, PBKDF2 checks skip
    /// the policy and legacy checks only log the violation.
    pub strict_policy: bool,
    /// Accept passwords fitting the legacy policy. Only for actual logins.
    pub allow_legacy: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            strict_policy: true,
            allow_legacy: false,
        }
    }
}

impl CheckOptions {
    /// Interactive login with an existing password
    pub fn login() -> Self {
        Self {
            strict_policy: true,
            allow_legacy: true,
        }
    }

    /// Access where the site policy is not guaranteed to apply (share links)
    pub fn relaxed() -> Self {
        Self {
            strict_policy: false,
            allow_legacy: false,
        }
    }
}

pub struct CredentialChecker {
    policy: PolicyEngine,
    hasher: PasswordHasher,
    cipher: Option<Box<dyn PasswordCipher>>,
    password_salt: Option<String>,
    digest_salt: Option<String>,
}

impl CredentialChecker {
    /// Build policy engine, hasher and (when enabled) cipher
    ///
    /// Fails on an unusable policy, a strength checker or cipher that is
    /// not compiled in, or encryption without any site salt.
    pub fn from_config(config: &CredentialConfig) -> CredentialResult<Self> {
        let cipher = if config.encryption {
            Some(select_cipher(CipherKey::SiteSalt {
                password_salt: config.password_salt.clone(),
                digest_salt: config.digest_salt.clone(),
            })?)
        } else {
            None
        };

        Ok(Self {
            policy: PolicyEngine::from_config(config)?,
            hasher: PasswordHasher::from_config(config),
            cipher,
            password_salt: config.password_salt.clone().filter(|s| !s.is_empty()),
            digest_salt: config.digest_salt.clone().filter(|s| !s.is_empty()),
        })
    }

    /// Replace the cipher, e.g. one keyed by an explicit secret
    pub fn with_cipher(self, cipher: Box<dyn PasswordCipher>) -> Self {
        Self {
            cipher: Some(cipher),
            ..self
        }
    }

    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    fn digest_salt(&self) -> CredentialResult<&str> {
        self.digest_salt
            .as_deref()
            .ok_or(CredentialError::MissingSalt("digest salt"))
    }

    fn cipher(&self) -> CredentialResult<&dyn PasswordCipher> {
        self.cipher
            .as_deref()
            .ok_or(CredentialError::Cipher(CipherError::Unavailable))
    }

    // ------------------------------------------------------------------
    // Checks
    // ------------------------------------------------------------------

    /// Check against any stored value, picking the scheme by its tag
    pub fn check(
        &self,
        ctx: &LoginContext<'_>,
        password: &ClearTextPassword,
        stored: &str,
        cache: Option<&mut VerificationCache>,
        options: CheckOptions,
    ) -> CredentialResult<bool> {
        match StoredCredential::parse(stored) {
            Ok(StoredCredential::Pbkdf2(_)) => self.check_hash(ctx, password, stored, cache, options),
            Ok(StoredCredential::Digest(_)) => self.check_digest(ctx, password, stored, cache, options),
            Ok(StoredCredential::Encrypt(_)) => {
                self.check_encrypt(ctx, password, stored, cache, options)
            }
            Ok(StoredCredential::Scramble(_)) => {
                self.check_scramble(ctx, password, stored, cache, options)
            }
            Err(err) => {
                let err = CredentialError::from(err);
                tracing::warn!(service = ctx.service, username = ctx.username, error = %err, "Unusable stored credential");
                Ok(false)
            }
        }
    }

    /// Check against a `PBKDF2$...` hash
    pub fn check_hash(
        &self,
        ctx: &LoginContext<'_>,
        password: &ClearTextPassword,
        hashed: &str,
        cache: Option<&mut VerificationCache>,
        options: CheckOptions,
    ) -> CredentialResult<bool> {
        self.checked(ctx, Scheme::Pbkdf2, password, password.as_str(), hashed, cache, options, || {
            Ok(self.hasher.verify(password, hashed))
        })
    }

    /// Check against a stored digest of `realm:username:password`
    pub fn check_digest(
        &self,
        ctx: &LoginContext<'_>,
        password: &ClearTextPassword,
        digest: &str,
        cache: Option<&mut VerificationCache>,
        options: CheckOptions,
    ) -> CredentialResult<bool> {
        let merged = Zeroizing::new([ctx.realm, ctx.username, password.as_str()].join(":"));
        self.checked(ctx, Scheme::Digest, password, &merged, digest, cache, options, || {
            let computed =
                legacy::make_digest(ctx.realm, ctx.username, password.as_str(), self.digest_salt()?)
                    .map_err(salt_error)?;
            Ok(constant_time_eq(computed.as_bytes(), digest.as_bytes()))
        })
    }

    /// Check against a scrambled password
    pub fn check_scramble(
        &self,
        ctx: &LoginContext<'_>,
        password: &ClearTextPassword,
        scrambled: &str,
        cache: Option<&mut VerificationCache>,
        options: CheckOptions,
    ) -> CredentialResult<bool> {
        self.checked(ctx, Scheme::Scramble, password, password.as_str(), scrambled, cache, options, || {
            // No stored scramble is empty, and a salted one cannot be computed
            if password.as_str().is_empty() {
                return Ok(false);
            }
            let computed = legacy::scramble_password(self.password_salt.as_deref(), password.as_str())
                .map_err(salt_error)?;
            Ok(constant_time_eq(computed.as_bytes(), scrambled.as_bytes()))
        })
    }

    /// Check against an encrypted password
    pub fn check_encrypt(
        &self,
        ctx: &LoginContext<'_>,
        password: &ClearTextPassword,
        encrypted: &str,
        cache: Option<&mut VerificationCache>,
        options: CheckOptions,
    ) -> CredentialResult<bool> {
        self.checked(ctx, Scheme::Encrypt, password, password.as_str(), encrypted, cache, options, || {
            match self.cipher()?.decrypt(encrypted) {
                Ok(decrypted) => Ok(constant_time_eq(decrypted.as_bytes(), password.as_bytes())),
                Err(err) => {
                    CredentialError::from(err).log();
                    Ok(false)
                }
            }
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn checked<F>(
        &self,
        ctx: &LoginContext<'_>,
        scheme: Scheme,
        password: &ClearTextPassword,
        cache_key: &str,
        stored: &str,
        cache: Option<&mut VerificationCache>,
        options: CheckOptions,
        verify: F,
    ) -> CredentialResult<bool>
    where
        F: FnOnce() -> CredentialResult<bool>,
    {
        if cache.as_deref().is_some_and(|c| c.hit(cache_key, stored)) {
            tracing::debug!(service = ctx.service, username = ctx.username, %scheme, "Cached credential match");
            return Ok(true);
        }

        if !self.policy_allows(ctx, scheme, password.as_str(), options) {
            return Ok(false);
        }

        let matched = verify()?;
        if matched {
            if let Some(cache) = cache {
                cache.insert(cache_key, stored);
            }
        }
        tracing::debug!(service = ctx.service, username = ctx.username, %scheme, matched, "Checked credential");
        Ok(matched)
    }

    // Policy runs after the cache lookup: cached passwords already passed it.
    fn policy_allows(
        &self,
        ctx: &LoginContext<'_>,
        scheme: Scheme,
        password: &str,
        options: CheckOptions,
    ) -> bool {
        if scheme == Scheme::Pbkdf2 && !options.strict_policy {
            tracing::debug!(
                service = ctx.service,
                username = ctx.username,
                "Password policy check disabled"
            );
            return true;
        }

        match self.policy.assure_strength(password, options.allow_legacy) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    service = ctx.service,
                    username = ctx.username,
                    error = %err,
                    strict = options.strict_policy,
                    "Password does not fit local policy"
                );
                !options.strict_policy
            }
        }
    }

    // ------------------------------------------------------------------
    // Stored values
    // ------------------------------------------------------------------

    /// New PBKDF2 hash for saving
    pub fn make_hash(&self, password: &ClearTextPassword) -> String {
        self.hasher.hash(password).to_string()
    }

    /// Scrambled password for legacy stores
    pub fn make_scramble(&self, password: &ClearTextPassword) -> CredentialResult<String> {
        legacy::scramble_password(self.password_salt.as_deref(), password.as_str())
            .map_err(salt_error)
    }

    /// Digest for legacy stores
    pub fn make_digest(
        &self,
        realm: &str,
        username: &str,
        password: &ClearTextPassword,
    ) -> CredentialResult<String> {
        legacy::make_digest(realm, username, password.as_str(), self.digest_salt()?)
            .map_err(salt_error)
    }

    /// Encrypted password for stores that need the cleartext back
    pub fn make_encrypt(&self, password: &ClearTextPassword) -> CredentialResult<String> {
        Ok(self.cipher()?.encrypt(password)?)
    }

    /// Cleartext of an encrypted password
    pub fn decrypt_password(&self, encrypted: &str) -> CredentialResult<ClearTextPassword> {
        Ok(self.cipher()?.decrypt(encrypted)?)
    }

    /// Cleartext of a scrambled password
    pub fn unscramble_password(&self, scrambled: &str) -> CredentialResult<ClearTextPassword> {
        let raw = legacy::unscramble_password(self.password_salt.as_deref(), scrambled)?;
        Ok(ClearTextPassword::new(raw))
    }

    /// `realm:username:password` of a stored digest
    pub fn unscramble_digest(&self, digest: &str) -> CredentialResult<ClearTextPassword> {
        let raw = legacy::open_digest(digest, self.digest_salt()?)?;
        Ok(ClearTextPassword::new(raw))
    }
}

impl std::fmt::Debug for CredentialChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialChecker")
            .field("policy", &self.policy)
            .field("hasher", &self.hasher)
            .field("encryption", &self.cipher.is_some())
            .finish_non_exhaustive()
    }
}

// Cleartext always hex encodes, so bad hex when making a value is the salt.
fn salt_error(err: LegacyError) -> CredentialError {
    match err {
        LegacyError::InvalidHex(hex) => CredentialError::Salt(hex),
        other => CredentialError::Legacy(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::password::HashFunction;

    const PASSWORD_SALT: &str = "A1B2C3D4E5F60718293A4B5C6D7E8F90A1B2C3D4E5F60718293A4B5C6D7E8F90";
    const DIGEST_SALT: &str = "0F1E2D3C4B5A69788796A5B4C3D2E1F00F1E2D3C4B5A69788796A5B4C3D2E1F0";

    fn config() -> CredentialConfig {
        CredentialConfig {
            password_salt: Some(PASSWORD_SALT.to_string()),
            digest_salt: Some(DIGEST_SALT.to_string()),
            hash_function: HashFunction::Sha256,
            cost_factor: 100,
            ..Default::default()
        }
    }

    fn checker() -> CredentialChecker {
        CredentialChecker::from_config(&config()).unwrap()
    }

    fn ctx() -> LoginContext<'static> {
        LoginContext::new("sftp", "alice").with_realm("grid")
    }

    #[test]
    fn test_check_hash() {
        let checker = checker();
        let password = ClearTextPassword::from("Password12");
        let stored = checker.make_hash(&password);

        assert!(checker.check_hash(&ctx(), &password, &stored, None, CheckOptions::default()).unwrap());
        let wrong = ClearTextPassword::from("Password13");
        assert!(!checker.check_hash(&ctx(), &wrong, &stored, None, CheckOptions::default()).unwrap());
    }

    #[test]
    fn test_strict_policy_rejects_matching_weak_password() {
        let checker = checker();
        let password = ClearTextPassword::from("password");
        let stored = checker.make_hash(&password);

        assert!(!checker.check_hash(&ctx(), &password, &stored, None, CheckOptions::default()).unwrap());
        assert!(checker.check_hash(&ctx(), &password, &stored, None, CheckOptions::relaxed()).unwrap());
    }

    #[test]
    fn test_cache_bypasses_policy() {
        let checker = checker();
        let password = ClearTextPassword::from("password");
        let stored = checker.make_hash(&password);
        let mut cache = VerificationCache::new();

        // Matches and fills the cache while the policy is not enforced
        assert!(checker
            .check_hash(&ctx(), &password, &stored, Some(&mut cache), CheckOptions::relaxed())
            .unwrap());
        assert_eq!(cache.len(), 1);

        // The strict check now hits the cache before the policy
        assert!(checker
            .check_hash(&ctx(), &password, &stored, Some(&mut cache), CheckOptions::default())
            .unwrap());
    }

    #[test]
    fn test_failed_checks_are_not_cached() {
        let checker = checker();
        let stored = checker.make_hash(&ClearTextPassword::from("Password12"));
        let mut cache = VerificationCache::new();

        let wrong = ClearTextPassword::from("Password13");
        assert!(!checker
            .check_hash(&ctx(), &wrong, &stored, Some(&mut cache), CheckOptions::default())
            .unwrap());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_check_digest() {
        let checker = checker();
        let password = ClearTextPassword::from("Password12");
        let digest = checker.make_digest("grid", "alice", &password).unwrap();
        assert!(digest.starts_with("DIGEST$custom$CONFSALT$"));

        let mut cache = VerificationCache::new();
        assert!(checker
            .check_digest(&ctx(), &password, &digest, Some(&mut cache), CheckOptions::default())
            .unwrap());
        // Digest cache keys cover realm and username too
        assert!(!cache.hit("Password12", &digest));

        let other_user = LoginContext::new("sftp", "bob").with_realm("grid");
        assert!(!checker
            .check_digest(&other_user, &password, &digest, None, CheckOptions::default())
            .unwrap());
        assert_eq!(
            checker.unscramble_digest(&digest).unwrap().as_str(),
            "grid:alice:Password12"
        );
    }

    #[test]
    fn test_legacy_policy_violation_only_rejects_when_strict() {
        let checker = checker();
        let password = ClearTextPassword::from("password");
        let scrambled = checker.make_scramble(&password).unwrap();

        assert!(!checker
            .check_scramble(&ctx(), &password, &scrambled, None, CheckOptions::default())
            .unwrap());
        assert!(checker
            .check_scramble(&ctx(), &password, &scrambled, None, CheckOptions::relaxed())
            .unwrap());
    }

    #[test]
    fn test_check_scramble_and_unscramble() {
        let checker = checker();
        let password = ClearTextPassword::from("Password12");
        let scrambled = checker.make_scramble(&password).unwrap();

        assert!(checker
            .check_scramble(&ctx(), &password, &scrambled, None, CheckOptions::default())
            .unwrap());
        assert_eq!(checker.unscramble_password(&scrambled).unwrap().as_str(), "Password12");
    }

    #[test]
    fn test_empty_password_never_matches_scramble() {
        let checker = checker();
        let empty = ClearTextPassword::from("");
        for options in [CheckOptions::default(), CheckOptions::relaxed()] {
            assert!(!checker.check_scramble(&ctx(), &empty, "ABCD", None, options).unwrap());
            assert!(!checker.check(&ctx(), &empty, "ABCD", None, options).unwrap());
        }
        assert!(matches!(
            checker.make_scramble(&empty),
            Err(CredentialError::Legacy(LegacyError::EmptyPassword))
        ));
    }

    #[test]
    fn test_missing_digest_salt_is_configuration_error() {
        let checker = CredentialChecker::from_config(&CredentialConfig {
            digest_salt: None,
            ..config()
        })
        .unwrap();
        let password = ClearTextPassword::from("Password12");
        let err = checker
            .check_digest(&ctx(), &password, "DIGEST$custom$CONFSALT$00", None, CheckOptions::default())
            .unwrap_err();
        assert!(matches!(err, CredentialError::MissingSalt(_)));
        assert_eq!(err.to_app_error().kind(), kernel::error::kind::ErrorKind::Configuration);
    }

    #[test]
    fn test_dispatch_by_stored_tag() {
        let checker = checker();
        let password = ClearTextPassword::from("Password12");
        let options = CheckOptions::login();

        let hashed = checker.make_hash(&password);
        let digest = checker.make_digest("grid", "alice", &password).unwrap();
        let scrambled = checker.make_scramble(&password).unwrap();
        for stored in [&hashed, &digest, &scrambled] {
            assert!(checker.check(&ctx(), &password, stored, None, options).unwrap());
        }
        assert!(!checker.check(&ctx(), &password, "PBKDF2$sha256$1$", None, options).unwrap());
    }

    #[cfg(feature = "encrypt")]
    #[test]
    fn test_check_encrypt() {
        let checker = CredentialChecker::from_config(&CredentialConfig {
            encryption: true,
            ..config()
        })
        .unwrap();
        let password = ClearTextPassword::from("Password12");
        let encrypted = checker.make_encrypt(&password).unwrap();

        assert!(checker
            .check(&ctx(), &password, &encrypted, None, CheckOptions::default())
            .unwrap());
        let wrong = ClearTextPassword::from("Password13");
        assert!(!checker
            .check_encrypt(&ctx(), &wrong, &encrypted, None, CheckOptions::default())
            .unwrap());
        assert!(!checker
            .check_encrypt(&ctx(), &password, "ENCRYPT$fernet$gAAAAAAA", None, CheckOptions::default())
            .unwrap());
        assert_eq!(checker.decrypt_password(&encrypted).unwrap().as_str(), "Password12");
    }

    #[test]
    fn test_encrypt_without_cipher_is_configuration_error() {
        let checker = checker();
        let err = checker
            .make_encrypt(&ClearTextPassword::from("Password12"))
            .unwrap_err();
        assert_eq!(err.kind(), kernel::error::kind::ErrorKind::Configuration);
    }
}

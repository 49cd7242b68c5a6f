//! Password Policy Engine
//!
//! Site policy, optional legacy policy and optional strength checker,
//! resolved once from configuration.
//!
//! The legacy policy only ever applies to logins with an existing
//! password, never when a new password is saved.

use std::fmt;

use platform::password::{
    PasswordPolicy, PolicyViolation, StrengthChecker, select_checker,
};

use crate::application::config::CredentialConfig;
use crate::error::{CredentialError, CredentialResult, PolicyScope};

pub struct PolicyEngine {
    current: PasswordPolicy,
    legacy: Option<PasswordPolicy>,
    checker: Option<Box<dyn StrengthChecker>>,
}

impl PolicyEngine {
    pub fn new(
        current: PasswordPolicy,
        legacy: Option<PasswordPolicy>,
        checker: Option<Box<dyn StrengthChecker>>,
    ) -> Self {
        Self {
            current,
            legacy,
            checker,
        }
    }

    /// Resolve policies and checker from configuration
    ///
    /// Unparsable policies and a checker that is not compiled in are
    /// configuration errors.
    pub fn from_config(config: &CredentialConfig) -> CredentialResult<Self> {
        let current = PasswordPolicy::parse(&config.password_policy)?;
        let legacy = config
            .legacy_policy
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(PasswordPolicy::parse)
            .transpose()?;
        let checker = select_checker(config.strength_check)?;

        tracing::debug!(
            policy = %current,
            legacy_policy = ?legacy.map(|p| p.to_string()),
            strength_check = checker.is_some(),
            "Password policy engine ready"
        );
        Ok(Self::new(current, legacy, checker))
    }

    pub fn current(&self) -> PasswordPolicy {
        self.current
    }

    pub fn legacy(&self) -> Option<PasswordPolicy> {
        self.legacy
    }

    pub fn checker(&self) -> Option<&dyn StrengthChecker> {
        self.checker.as_deref()
    }

    /// Check against the current policy only, without logging
    pub fn fits_current(&self, password: &str) -> Result<(), PolicyViolation> {
        self.current.enforce(password, self.checker())
    }

    /// Make sure `password` fits the site policy
    ///
    /// With `allow_legacy` a password refused by the current policy gets a
    /// second chance against the legacy policy, if one is configured.
    pub fn assure_strength(&self, password: &str, allow_legacy: bool) -> CredentialResult<()> {
        let violation = match self.fits_current(password) {
            Ok(()) => {
                tracing::debug!(policy = %self.current, "Password fits password policy");
                return Ok(());
            }
            Err(violation) => violation,
        };

        let legacy = match self.legacy {
            Some(legacy) if allow_legacy => legacy,
            _ => {
                tracing::warn!(policy = %self.current, reason = %violation, "Password refused by policy");
                return Err(CredentialError::Policy {
                    scope: PolicyScope::Current,
                    violation,
                });
            }
        };

        tracing::info!(
            policy = %self.current,
            reason = %violation,
            "Password does not fit policy, trying legacy policy"
        );
        match legacy.enforce(password, self.checker()) {
            Ok(()) => {
                tracing::debug!(legacy_policy = %legacy, "Password fits legacy policy");
                Ok(())
            }
            Err(violation) => {
                tracing::warn!(legacy_policy = %legacy, reason = %violation, "Password refused by legacy policy");
                Err(CredentialError::Policy {
                    scope: PolicyScope::Legacy,
                    violation,
                })
            }
        }
    }

    /// Whether a login password is acceptable, legacy policy included
    pub fn valid_login_password(&self, password: &str) -> bool {
        self.assure_strength(password, true).is_ok()
    }
}

impl fmt::Debug for PolicyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyEngine")
            .field("current", &self.current)
            .field("legacy", &self.legacy)
            .field("strength_check", &self.checker.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(policy: &str, legacy: Option<&str>) -> PolicyEngine {
        let config = CredentialConfig {
            password_policy: policy.to_string(),
            legacy_policy: legacy.map(str::to_string),
            ..Default::default()
        };
        PolicyEngine::from_config(&config).unwrap()
    }

    #[test]
    fn test_medium_policy() {
        let engine = engine("medium", None);
        assert!(engine.assure_strength("Password12", false).is_ok());
        assert!(matches!(
            engine.assure_strength("password", false),
            Err(CredentialError::Policy {
                scope: PolicyScope::Current,
                violation: PolicyViolation::TooSimple { min_classes: 3 },
            })
        ));
        assert!(matches!(
            engine.assure_strength("Pw1", false),
            Err(CredentialError::Policy {
                violation: PolicyViolation::TooShort { min_length: 8 },
                ..
            })
        ));
    }

    #[test]
    fn test_legacy_fallback_only_when_allowed() {
        let engine = engine("high", Some("weak"));
        assert!(engine.assure_strength("abcdEF", true).is_ok());
        assert!(matches!(
            engine.assure_strength("abcdEF", false),
            Err(CredentialError::Policy {
                scope: PolicyScope::Current,
                ..
            })
        ));
        assert!(engine.valid_login_password("abcdEF"));
    }

    #[test]
    fn test_legacy_violation_reports_legacy_scope() {
        let engine = engine("high", Some("weak"));
        assert!(matches!(
            engine.assure_strength("abc", true),
            Err(CredentialError::Policy {
                scope: PolicyScope::Legacy,
                violation: PolicyViolation::TooShort { min_length: 6 },
            })
        ));
        assert!(!engine.valid_login_password("abc"));
    }

    #[test]
    fn test_without_legacy_policy_login_uses_current() {
        let engine = engine("medium", Some("  "));
        assert!(engine.legacy().is_none());
        assert!(!engine.valid_login_password("abcdEF"));
    }

    #[test]
    fn test_bad_policy_is_configuration_error() {
        let config = CredentialConfig {
            password_policy: "bogus".to_string(),
            ..Default::default()
        };
        let err = PolicyEngine::from_config(&config).unwrap_err();
        assert!(matches!(err, CredentialError::PolicyParse(_)));
        assert_eq!(err.kind(), kernel::error::kind::ErrorKind::Configuration);
    }

    #[cfg(feature = "strength-check")]
    #[test]
    fn test_strength_checker_applies_to_both_policies() {
        let config = CredentialConfig {
            password_policy: "medium".to_string(),
            legacy_policy: Some("weak".to_string()),
            strength_check: true,
            ..Default::default()
        };
        let engine = PolicyEngine::from_config(&config).unwrap();
        assert!(engine.checker().is_some());
        assert!(!engine.valid_login_password("Qwerty123"));
        assert!(engine.valid_login_password("Vk7#mPq2xZ"));
    }

    #[cfg(not(feature = "strength-check"))]
    #[test]
    fn test_missing_strength_checker_is_configuration_error() {
        let config = CredentialConfig {
            strength_check: true,
            ..Default::default()
        };
        assert!(matches!(
            PolicyEngine::from_config(&config),
            Err(CredentialError::Strength(_))
        ));
    }
}

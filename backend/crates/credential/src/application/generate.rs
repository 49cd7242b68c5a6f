//! Random Password Generation
//!
//! Passwords of exactly the policy minimum length, drawn from an alphabet
//! with as many character classes as the policy demands.

use platform::password::{ClearTextPassword, policy_charset, random_ascii};

use crate::application::policy_engine::PolicyEngine;
use crate::error::{CredentialError, CredentialResult};

/// Attempts before giving up on the current policy
pub const DEFAULT_TRIES: usize = 42;

/// Generate a password that fits the current policy
///
/// Random draws may miss a class (or trip the strength checker), so up to
/// `tries` candidates are made.
pub fn generate_random_password(
    engine: &PolicyEngine,
    tries: usize,
) -> CredentialResult<ClearTextPassword> {
    let policy = engine.current();
    let charset = policy_charset(policy.min_classes);

    for attempt in 1..=tries {
        let candidate = ClearTextPassword::new(random_ascii(policy.min_length, &charset));
        match engine.fits_current(candidate.as_str()) {
            Ok(()) => return Ok(candidate),
            Err(violation) => {
                tracing::debug!(attempt, reason = %violation, "Generated password did not fit policy, retrying");
            }
        }
    }

    tracing::error!(tries, policy = %policy, "Failed to generate password to fit site policy");
    Err(CredentialError::GenerationExhausted(tries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::CredentialConfig;

    fn engine(policy: &str) -> PolicyEngine {
        PolicyEngine::from_config(&CredentialConfig {
            password_policy: policy.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_generated_passwords_fit_policy() {
        for policy in ["weak", "medium", "high", "modern:12", "custom:12:4"] {
            let engine = engine(policy);
            for _ in 0..10 {
                let password = generate_random_password(&engine, DEFAULT_TRIES).unwrap();
                assert_eq!(password.as_str().chars().count(), engine.current().min_length);
                assert!(engine.assure_strength(password.as_str(), false).is_ok());
            }
        }
    }

    #[test]
    fn test_zero_tries_is_exhausted() {
        let engine = engine("medium");
        assert!(matches!(
            generate_random_password(&engine, 0),
            Err(CredentialError::GenerationExhausted(0))
        ));
    }

    #[test]
    fn test_impossible_policy_exhausts() {
        // One character can never carry three classes
        let engine = engine("custom:1:3");
        assert!(matches!(
            generate_random_password(&engine, 5),
            Err(CredentialError::GenerationExhausted(5))
        ));
    }
}

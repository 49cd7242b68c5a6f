//! Password Strength Checking
//!
//! Optional second opinion after the length and class rules: rejects
//! guessable passwords (common passwords, keyboard walks, digit runs,
//! repeated characters).

use thiserror::Error;

/// Strength checker errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrengthError {
    /// Checker requested by configuration but not compiled in
    #[error("Password strength checker requested but not available")]
    Unavailable,

    /// Password refused, with the reason
    #[error("{0}")]
    Rejected(String),
}

/// Rejects weak passwords beyond the policy rules
pub trait StrengthChecker: Send + Sync {
    /// Check `password`
    ///
    /// `min_length` is a hint; each distinct character class present counts
    /// as one extra character towards it.
    fn check(&self, password: &str, min_length: usize) -> Result<(), StrengthError>;
}

/// Resolve the configured checker
///
/// `enabled = false` yields `Ok(None)`. Asking for a checker in a build
/// without the `strength-check` feature is a configuration error.
pub fn select_checker(enabled: bool) -> Result<Option<Box<dyn StrengthChecker>>, StrengthError> {
    if !enabled {
        return Ok(None);
    }
    #[cfg(feature = "strength-check")]
    {
        Ok(Some(Box::new(CommonPatternChecker)))
    }
    #[cfg(not(feature = "strength-check"))]
    {
        Err(StrengthError::Unavailable)
    }
}

#[cfg(feature = "strength-check")]
pub use patterns::CommonPatternChecker;

#[cfg(feature = "strength-check")]
mod patterns {
    use std::collections::HashSet;

    use super::{StrengthChecker, StrengthError};
    use crate::password::policy::CharClass;

    /// Fewest distinct characters a password may have
    const MIN_DIFFERENT: usize = 5;

    const KEYBOARD_PATTERNS: &[&str] = &[
        "qwerty",
        "qwertyuiop",
        "asdfgh",
        "asdfghjkl",
        "zxcvbn",
        "qazwsx",
        "1qaz2wsx",
    ];

    const COMMON_PASSWORDS: &[&str] = &[
        "password",
        "password1",
        "password123",
        "12345678",
        "123456789",
        "1234567890",
        "abcdefgh",
        "letmein",
        "welcome",
        "admin123",
        "iloveyou",
        "sunshine",
        "princess",
        "football",
        "monkey",
        "shadow",
        "master",
        "dragon",
        "baseball",
        "trustno1",
        "changeme",
        "secret",
    ];

    /// Built-in checker
    #[derive(Debug, Clone, Copy, Default)]
    pub struct CommonPatternChecker;

    impl StrengthChecker for CommonPatternChecker {
        fn check(&self, password: &str, min_length: usize) -> Result<(), StrengthError> {
            let lower = password.to_lowercase();
            let chars: Vec<char> = lower.chars().collect();

            let credited = password.chars().count() + CharClass::count_in(password);
            if credited < min_length {
                return Err(rejected("it is too short"));
            }
            if COMMON_PASSWORDS.contains(&lower.as_str()) {
                return Err(rejected("it is a commonly used password"));
            }
            if KEYBOARD_PATTERNS.iter().any(|p| lower.contains(p)) {
                return Err(rejected("it contains a keyboard pattern"));
            }
            if is_sequential_numbers(&lower) {
                return Err(rejected("it is a run of sequential digits"));
            }
            if chars.len() >= 3 && chars.iter().all(|&c| c == chars[0]) {
                return Err(rejected("it is a single repeated character"));
            }
            if chars.len() >= MIN_DIFFERENT {
                let distinct: HashSet<char> = chars.iter().copied().collect();
                if distinct.len() < MIN_DIFFERENT {
                    return Err(rejected("it does not contain enough different characters"));
                }
            }
            Ok(())
        }
    }

    fn rejected(reason: &str) -> StrengthError {
        StrengthError::Rejected(reason.to_string())
    }

    /// Only digits, strictly ascending or descending (wrapping 9/0)
    fn is_sequential_numbers(s: &str) -> bool {
        if !s.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        let digits: Vec<u32> = s.chars().filter_map(|c| c.to_digit(10)).collect();
        if digits.len() < 4 {
            return false;
        }

        let ascending = digits
            .windows(2)
            .all(|w| w[1] == (w[0] + 1) % 10);
        let descending = digits
            .windows(2)
            .all(|w| w[0] == (w[1] + 1) % 10);

        ascending || descending
    }

}

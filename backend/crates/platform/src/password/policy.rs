//! Password Policy Rules
//!
//! A policy is a minimum length plus a minimum number of distinct character
//! classes, configured by keyword:
//!
//! | Keyword      | Length | Classes |
//! |--------------|--------|---------|
//! | `none`       | 0      | 0       |
//! | `weak`       | 6      | 2       |
//! | `medium`     | 8      | 3       |
//! | `high`       | 10     | 4       |
//! | `modern:N`   | N      | 1       |
//! | `custom:N:M` | N      | M       |

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::strength::{StrengthChecker, StrengthError};

/// Number of character classes a password can draw from
pub const CHAR_CLASS_COUNT: usize = 4;

/// Character class used for complexity scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CharClass {
    Lower,
    Upper,
    Digit,
    Other,
}

impl CharClass {
    /// Classify a single character (non-ASCII counts as `Other`)
    pub fn of(c: char) -> Self {
        if c.is_ascii_lowercase() {
            CharClass::Lower
        } else if c.is_ascii_uppercase() {
            CharClass::Upper
        } else if c.is_ascii_digit() {
            CharClass::Digit
        } else {
            CharClass::Other
        }
    }

    fn bit(self) -> u8 {
        match self {
            CharClass::Lower => 0b0001,
            CharClass::Upper => 0b0010,
            CharClass::Digit => 0b0100,
            CharClass::Other => 0b1000,
        }
    }

    /// Count distinct classes present in `password`
    pub fn count_in(password: &str) -> usize {
        let mask = password.chars().fold(0u8, |acc, c| acc | CharClass::of(c).bit());
        mask.count_ones() as usize
    }
}

/// Policy string could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyParseError {
    #[error("Unknown password policy keyword: {0}")]
    UnknownKeyword(String),

    #[error("Password policy {policy} on invalid format: {reason}")]
    InvalidFormat { policy: String, reason: String },

    #[error("Password policy {0} requires more than {CHAR_CLASS_COUNT} character classes")]
    TooManyClasses(String),
}

/// Password rejected by a policy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    #[error("password too short, at least {min_length} chars required")]
    TooShort { min_length: usize },

    #[error("password too simple, >= {min_classes} char classes required")]
    TooSimple { min_classes: usize },

    #[error("strength checker refused password: {0}")]
    Rejected(String),
}

/// Length and character class requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub min_classes: usize,
}

impl PasswordPolicy {
    pub const NONE: Self = Self::new(0, 0);
    pub const WEAK: Self = Self::new(6, 2);
    pub const MEDIUM: Self = Self::new(8, 3);
    pub const HIGH: Self = Self::new(10, 4);

    pub const fn new(min_length: usize, min_classes: usize) -> Self {
        Self {
            min_length,
            min_classes,
        }
    }

    /// Parse a policy keyword
    ///
    /// ## Examples
    /// ```rust
    /// use platform::password::PasswordPolicy;
    ///
    /// assert_eq!(PasswordPolicy::parse("weak").unwrap(), PasswordPolicy::new(6, 2));
    /// assert_eq!(PasswordPolicy::parse("custom:10:3").unwrap(), PasswordPolicy::new(10, 3));
    /// assert!(PasswordPolicy::parse("bogus").is_err());
    /// ```
    pub fn parse(policy: &str) -> Result<Self, PolicyParseError> {
        let trimmed = policy.trim();
        let (keyword, args) = match trimmed.split_once(':') {
            Some((keyword, args)) => (keyword, Some(args)),
            None => (trimmed, None),
        };

        let invalid = |reason: &str| PolicyParseError::InvalidFormat {
            policy: policy.to_string(),
            reason: reason.to_string(),
        };
        let number = |s: &str| {
            s.trim()
                .parse::<usize>()
                .map_err(|e| invalid(&e.to_string()))
        };

        let parsed = match (keyword.to_ascii_lowercase().as_str(), args) {
            ("none", None) => Self::NONE,
            ("weak", None) => Self::WEAK,
            ("medium", None) => Self::MEDIUM,
            ("high", None) => Self::HIGH,
            ("modern", Some(length)) => Self::new(number(length)?, 1),
            ("modern", None) => return Err(invalid("expected modern:<length>")),
            ("custom", Some(args)) => {
                let (length, classes) = args
                    .split_once(':')
                    .ok_or_else(|| invalid("expected custom:<length>:<classes>"))?;
                Self::new(number(length)?, number(classes)?)
            }
            ("custom", None) => return Err(invalid("expected custom:<length>:<classes>")),
            _ => return Err(PolicyParseError::UnknownKeyword(policy.to_string())),
        };

        if parsed.min_classes > CHAR_CLASS_COUNT {
            return Err(PolicyParseError::TooManyClasses(policy.to_string()));
        }
        Ok(parsed)
    }

    /// Check length (in characters) then character classes
    pub fn evaluate(&self, password: &str) -> Result<(), PolicyViolation> {
        if password.chars().count() < self.min_length {
            return Err(PolicyViolation::TooShort {
                min_length: self.min_length,
            });
        }
        if CharClass::count_in(password) < self.min_classes {
            return Err(PolicyViolation::TooSimple {
                min_classes: self.min_classes,
            });
        }
        Ok(())
    }

    /// Evaluate, then run the optional strength checker
    pub fn enforce(
        &self,
        password: &str,
        checker: Option<&dyn StrengthChecker>,
    ) -> Result<(), PolicyViolation> {
        self.evaluate(password)?;
        if let Some(checker) = checker {
            checker
                .check(password, self.strength_hint())
                .map_err(|err| match err {
                    StrengthError::Rejected(reason) => PolicyViolation::Rejected(reason),
                    other => PolicyViolation::Rejected(other.to_string()),
                })?;
        }
        Ok(())
    }

    /// Minimum length handed to the strength checker
    ///
    /// Keeps the checker from demanding more than the policy itself.
    pub fn strength_hint(&self) -> usize {
        self.min_length + self.min_classes
    }
}

impl FromStr for PasswordPolicy {
    type Err = PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PasswordPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::NONE => write!(f, "none"),
            Self::WEAK => write!(f, "weak"),
            Self::MEDIUM => write!(f, "medium"),
            Self::HIGH => write!(f, "high"),
            Self {
                min_length,
                min_classes: 1,
            } => write!(f, "modern:{}", min_length),
            Self {
                min_length,
                min_classes,
            } => write!(f, "custom:{}:{}", min_length, min_classes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RejectAll;

    impl StrengthChecker for RejectAll {
        fn check(&self, _password: &str, min_length: usize) -> Result<(), StrengthError> {
            Err(StrengthError::Rejected(format!("hint {}", min_length)))
        }
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(PasswordPolicy::parse("none").unwrap(), PasswordPolicy::new(0, 0));
        assert_eq!(PasswordPolicy::parse("weak").unwrap(), PasswordPolicy::new(6, 2));
        assert_eq!(PasswordPolicy::parse("MEDIUM").unwrap(), PasswordPolicy::new(8, 3));
        assert_eq!(PasswordPolicy::parse("high").unwrap(), PasswordPolicy::new(10, 4));
        assert_eq!(PasswordPolicy::parse("modern:12").unwrap(), PasswordPolicy::new(12, 1));
        assert_eq!(PasswordPolicy::parse("custom:10:3").unwrap(), PasswordPolicy::new(10, 3));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            PasswordPolicy::parse("bogus"),
            Err(PolicyParseError::UnknownKeyword(_))
        ));
        assert!(matches!(
            PasswordPolicy::parse("modern"),
            Err(PolicyParseError::InvalidFormat { .. })
        ));
        assert!(matches!(
            PasswordPolicy::parse("modern:x"),
            Err(PolicyParseError::InvalidFormat { .. })
        ));
        assert!(matches!(
            PasswordPolicy::parse("custom:10"),
            Err(PolicyParseError::InvalidFormat { .. })
        ));
        assert!(matches!(
            PasswordPolicy::parse("custom:10:-1"),
            Err(PolicyParseError::InvalidFormat { .. })
        ));
        assert!(matches!(
            PasswordPolicy::parse("custom:10:5"),
            Err(PolicyParseError::TooManyClasses(_))
        ));
        assert!(matches!(
            PasswordPolicy::parse("weak:1"),
            Err(PolicyParseError::UnknownKeyword(_))
        ));
    }

    #[test]
    fn test_display_round_trips() {
        for policy in ["none", "weak", "medium", "high", "modern:12", "custom:9:2"] {
            assert_eq!(PasswordPolicy::parse(policy).unwrap().to_string(), policy);
        }
    }

    #[test]
    fn test_char_classes() {
        assert_eq!(CharClass::of('a'), CharClass::Lower);
        assert_eq!(CharClass::of('Z'), CharClass::Upper);
        assert_eq!(CharClass::of('7'), CharClass::Digit);
        assert_eq!(CharClass::of('#'), CharClass::Other);
        assert_eq!(CharClass::of('ä'), CharClass::Other);

        assert_eq!(CharClass::count_in(""), 0);
        assert_eq!(CharClass::count_in("password"), 1);
        assert_eq!(CharClass::count_in("Password12"), 3);
        assert_eq!(CharClass::count_in("Pass word12"), 4);
    }

    #[test]
    fn test_evaluate_medium() {
        let medium = PasswordPolicy::MEDIUM;
        assert!(medium.evaluate("Password12").is_ok());
        assert_eq!(
            medium.evaluate("password"),
            Err(PolicyViolation::TooSimple { min_classes: 3 })
        );
        assert_eq!(
            medium.evaluate("Pw1"),
            Err(PolicyViolation::TooShort { min_length: 8 })
        );
    }

    #[test]
    fn test_length_counts_characters() {
        // 6 characters, 12 bytes
        assert!(PasswordPolicy::new(6, 0).evaluate("ääääää").is_ok());
        assert!(PasswordPolicy::new(7, 0).evaluate("ääääää").is_err());
    }

    #[test]
    fn test_none_accepts_anything() {
        assert!(PasswordPolicy::NONE.evaluate("").is_ok());
    }

    #[test]
    fn test_enforce_runs_checker_with_hint() {
        let medium = PasswordPolicy::MEDIUM;
        assert!(medium.enforce("Password12", None).is_ok());
        assert_eq!(
            medium.enforce("Password12", Some(&RejectAll)),
            Err(PolicyViolation::Rejected("hint 11".to_string()))
        );
        // Policy rules come first
        assert_eq!(
            medium.enforce("password", Some(&RejectAll)),
            Err(PolicyViolation::TooSimple { min_classes: 3 })
        );
    }
}

//! Stored Credential Value Object
//!
//! A password value as found in a user database. The scheme is picked from
//! the leading tag:
//!
//! | Tag        | Scheme                                   |
//! |------------|------------------------------------------|
//! | `PBKDF2$`  | salted PBKDF2 hash                       |
//! | `DIGEST$`  | scrambled `realm:username:password`      |
//! | `ENCRYPT$` | reversible Fernet encryption (tagged)    |
//! | `gAAAAA`   | reversible Fernet encryption (bare)      |
//! | (none)     | scrambled password, the oldest format    |
//!
//! Only `Pbkdf2` parses eagerly; legacy bodies are validated when checked.

use std::fmt;

use platform::password::cipher::is_encrypted;
use platform::password::hash::HASH_ALGORITHM;
use platform::password::{DIGEST_PREFIX, PasswordHash, PasswordHashError};

/// Scheme of a stored credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Pbkdf2,
    Digest,
    Encrypt,
    Scramble,
}

impl Scheme {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Scheme::Pbkdf2 => "pbkdf2",
            Scheme::Digest => "digest",
            Scheme::Encrypt => "encrypt",
            Scheme::Scramble => "scramble",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Password value from a user database
#[derive(Clone, PartialEq, Eq)]
pub enum StoredCredential {
    Pbkdf2(PasswordHash),
    Digest(String),
    Encrypt(String),
    Scramble(String),
}

impl StoredCredential {
    /// Pick the scheme by tag
    ///
    /// Fails only for a `PBKDF2$` value that does not parse; every other
    /// string is some legacy scheme.
    pub fn parse(stored: &str) -> Result<Self, PasswordHashError> {
        if stored.starts_with(&format!("{}$", HASH_ALGORITHM)) {
            PasswordHash::parse(stored).map(StoredCredential::Pbkdf2)
        } else if stored.starts_with(DIGEST_PREFIX) {
            Ok(StoredCredential::Digest(stored.to_string()))
        } else if is_encrypted(stored) {
            Ok(StoredCredential::Encrypt(stored.to_string()))
        } else {
            Ok(StoredCredential::Scramble(stored.to_string()))
        }
    }

    pub fn scheme(&self) -> Scheme {
        match self {
            StoredCredential::Pbkdf2(_) => Scheme::Pbkdf2,
            StoredCredential::Digest(_) => Scheme::Digest,
            StoredCredential::Encrypt(_) => Scheme::Encrypt,
            StoredCredential::Scramble(_) => Scheme::Scramble,
        }
    }

    /// Anything but PBKDF2 should be migrated on the next successful login
    pub fn is_legacy(&self) -> bool {
        !matches!(self, StoredCredential::Pbkdf2(_))
    }

    /// The value as it would be stored again
    pub fn encoded(&self) -> String {
        match self {
            StoredCredential::Pbkdf2(hash) => hash.to_string(),
            StoredCredential::Digest(raw)
            | StoredCredential::Encrypt(raw)
            | StoredCredential::Scramble(raw) => raw.clone(),
        }
    }
}

impl From<PasswordHash> for StoredCredential {
    fn from(hash: PasswordHash) -> Self {
        StoredCredential::Pbkdf2(hash)
    }
}

impl fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoredCredential::Pbkdf2(hash) => f.debug_tuple("Pbkdf2").field(hash).finish(),
            other => f
                .debug_tuple("StoredCredential")
                .field(&other.scheme())
                .field(&"[REDACTED]")
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::password::{ClearTextPassword, Pbkdf2Params};

    #[test]
    fn test_dispatch_by_tag() {
        let hash = PasswordHash::generate(&ClearTextPassword::from("Password12"), &Pbkdf2Params::default());
        let parsed = StoredCredential::parse(&hash.to_string()).unwrap();
        assert_eq!(parsed.scheme(), Scheme::Pbkdf2);
        assert!(!parsed.is_legacy());
        assert_eq!(parsed.encoded(), hash.to_string());

        let digest = StoredCredential::parse("DIGEST$custom$CONFSALT$0A1B").unwrap();
        assert_eq!(digest.scheme(), Scheme::Digest);

        let encrypted = StoredCredential::parse("ENCRYPT$fernet$gAAAAAAA").unwrap();
        assert_eq!(encrypted.scheme(), Scheme::Encrypt);
        let bare = StoredCredential::parse("gAAAAABq1mvE68YqMOkaWVSg-_Q==").unwrap();
        assert_eq!(bare.scheme(), Scheme::Encrypt);
        assert!(bare.is_legacy());

        let scrambled = StoredCredential::parse("c2VjcmV0").unwrap();
        assert_eq!(scrambled.scheme(), Scheme::Scramble);
        assert!(scrambled.is_legacy());
    }

    #[test]
    fn test_broken_pbkdf2_is_an_error() {
        assert!(StoredCredential::parse("PBKDF2$sha256$10000$salt").is_err());
        assert!(StoredCredential::parse("PBKDF2$md5$10000$salt$AAAA").is_err());
    }

    #[test]
    fn test_debug_hides_legacy_values() {
        let scrambled = StoredCredential::parse("c2VjcmV0").unwrap();
        let debug = format!("{:?}", scrambled);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("c2VjcmV0"));
    }
}

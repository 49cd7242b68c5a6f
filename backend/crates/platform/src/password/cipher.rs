//! Reversible Password Encryption
//!
//! Some protocol relays need the cleartext password back, so those stores
//! keep an authenticated encryption of it instead of a one-way hash.
//!
//! Values are Fernet tokens (AES-128-CBC with HMAC-SHA256, url-safe
//! base64), stored bare as `gAAAAA...`. The tagged form
//! `ENCRYPT$fernet$<token>` is accepted when reading.

use thiserror::Error;
use zeroize::Zeroizing;

use super::ClearTextPassword;
use super::legacy::scramble_password;
use crate::crypto::{sha256_hex, to_base64_url};

/// Tag leading every encrypted password
pub const ENCRYPT_PREFIX: &str = "ENCRYPT$";

/// Cipher name in the tagged form
pub const CIPHER_NAME: &str = "fernet";

// Version byte 0x80 and the high timestamp bytes of every Fernet token
const FERNET_MARKER: &str = "gAAAAA";

/// Key length in bytes
pub const KEY_LENGTH: usize = 32;

// Fixed entropy mixed with the site salt hash; changing it breaks every
// stored encrypted password.
const KEY_ENTROPY: &str = "HyrqUFwxagFNcHANnDzVO-kMoU0ebo03pNaKHXce6xw=";

/// Cipher errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    #[error("Password encryption requested but not compiled in")]
    Unavailable,

    #[error("Cannot derive encryption key without a site password or digest salt")]
    MissingSalt,

    #[error("Encryption secret must be at least {KEY_LENGTH} bytes, got {0}")]
    KeyTooShort(usize),

    #[error("Invalid encrypted password format: {0}")]
    Format(&'static str),

    #[error("Failed to decrypt password")]
    Decrypt,
}

/// Source of the symmetric key
#[derive(Clone)]
pub enum CipherKey {
    /// Derived from the site salts (password salt preferred)
    SiteSalt {
        password_salt: Option<String>,
        digest_salt: Option<String>,
    },
    /// Explicit secret; the first 32 bytes are used
    Secret(Zeroizing<Vec<u8>>),
}

/// Whether `value` is an encrypted password, bare or tagged
///
/// Scrambled passwords are uppercase hex or base64 of text, so neither can
/// start with the Fernet marker.
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(ENCRYPT_PREFIX)
        || (value.starts_with(FERNET_MARKER)
            && value
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'=')))
}

/// Fernet token inside a bare or tagged value
pub fn token_body(value: &str) -> Result<&str, CipherError> {
    match value.strip_prefix(ENCRYPT_PREFIX) {
        Some(body) => match body.split_once('$') {
            Some((CIPHER_NAME, token)) if !token.is_empty() => Ok(token),
            Some((CIPHER_NAME, _)) => Err(CipherError::Format("empty token")),
            Some(_) => Err(CipherError::Format("unsupported cipher")),
            None => Err(CipherError::Format("missing cipher name")),
        },
        None if is_encrypted(value) => Ok(value),
        None => Err(CipherError::Format("not a Fernet token")),
    }
}

impl CipherKey {
    /// Resolve to the raw 32-byte key material
    pub fn derive(&self) -> Result<Zeroizing<[u8; KEY_LENGTH]>, CipherError> {
        let material: Zeroizing<Vec<u8>> = match self {
            CipherKey::SiteSalt {
                password_salt,
                digest_salt,
            } => {
                let salt = password_salt
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .or_else(|| digest_salt.as_deref().filter(|s| !s.is_empty()))
                    .ok_or(CipherError::MissingSalt)?;
                let salt_hash = sha256_hex(salt.as_bytes());
                let scrambled = scramble_password(Some(&salt_hash), KEY_ENTROPY)
                    .map_err(|_| CipherError::Format("site salt hash"))?;
                Zeroizing::new(scrambled.into_bytes())
            }
            CipherKey::Secret(secret) => secret.clone(),
        };

        if material.len() < KEY_LENGTH {
            return Err(CipherError::KeyTooShort(material.len()));
        }

        let mut key = Zeroizing::new([0u8; KEY_LENGTH]);
        key.copy_from_slice(&material[..KEY_LENGTH]);
        Ok(key)
    }

    /// Fernet key: url-safe base64 of the key material
    pub fn fernet_key(&self) -> Result<Zeroizing<String>, CipherError> {
        Ok(Zeroizing::new(to_base64_url(self.derive()?.as_slice())))
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CipherKey::SiteSalt { .. } => f.write_str("CipherKey::SiteSalt([REDACTED])"),
            CipherKey::Secret(_) => f.write_str("CipherKey::Secret([REDACTED])"),
        }
    }
}

/// Reversible password encryption
pub trait PasswordCipher: Send + Sync {
    /// Encrypt into a bare Fernet token
    fn encrypt(&self, password: &ClearTextPassword) -> Result<String, CipherError>;

    /// Decrypt a bare or tagged token
    fn decrypt(&self, encrypted: &str) -> Result<ClearTextPassword, CipherError>;
}

/// Build the cipher for `key`
///
/// Fails with [`CipherError::Unavailable`] when the `encrypt` feature is
/// compiled out, so a site asking for encryption without support stops at
/// startup instead of at the first login.
pub fn select_cipher(key: CipherKey) -> Result<Box<dyn PasswordCipher>, CipherError> {
    #[cfg(feature = "encrypt")]
    {
        Ok(Box::new(fernet_cipher::FernetCipher::new(&key)?))
    }
    #[cfg(not(feature = "encrypt"))]
    {
        let _ = key;
        Err(CipherError::Unavailable)
    }
}

#[cfg(feature = "encrypt")]
mod fernet_cipher {
    use fernet::Fernet;

    use super::{CipherError, CipherKey, PasswordCipher, token_body};
    use crate::password::ClearTextPassword;

    pub struct FernetCipher {
        fernet: Fernet,
    }

    impl FernetCipher {
        pub fn new(key: &CipherKey) -> Result<Self, CipherError> {
            let key = key.fernet_key()?;
            let fernet = Fernet::new(key.as_str()).ok_or(CipherError::Format("Fernet key"))?;
            Ok(Self { fernet })
        }
    }

    impl PasswordCipher for FernetCipher {
        fn encrypt(&self, password: &ClearTextPassword) -> Result<String, CipherError> {
            Ok(self.fernet.encrypt(password.as_bytes()))
        }

        fn decrypt(&self, encrypted: &str) -> Result<ClearTextPassword, CipherError> {
            let token = token_body(encrypted)?;
            let plaintext = self
                .fernet
                .decrypt(token)
                .map_err(|_| CipherError::Decrypt)?;
            let password = String::from_utf8(plaintext).map_err(|_| CipherError::Decrypt)?;
            Ok(ClearTextPassword::new(password))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: &str = "0123456789abcdef";

    // Made by the Python portal for "Password12" under the SALT site key
    const PORTAL_TOKEN: &str = "gAAAAABq1mvEbXsMoKe6FQqGfl3-gscbREtwpJDKVY6dyAuANfPjOt6fp1_CJ3BDkOeznwYSn1HkR2Ivg62QElYvR29M0zj2xg==";

    // Same password under the explicit secret "x" * 32
    const SECRET_TOKEN: &str = "gAAAAABq1mvEUN0jK6ll4Rg3KULbKryPhVVlf4pGdr0cYZW-zmimMpDodhJT0gLRYMBYVBDDJ30DQMzQ02E6puFEbUIbT1sKJw==";

    fn site_key(salt: &str) -> CipherKey {
        CipherKey::SiteSalt {
            password_salt: Some(salt.to_string()),
            digest_salt: None,
        }
    }

    #[test]
    fn test_site_key_matches_portal() {
        assert_eq!(
            site_key(SALT).fernet_key().unwrap().as_str(),
            "NDg3OTcyNzE1NTQ2Nzc3ODYxNjc0NjRFRkNENzEwNUY="
        );
        let other = site_key("fedcba9876543210").derive().unwrap();
        assert_ne!(*site_key(SALT).derive().unwrap(), *other);
    }

    #[test]
    fn test_digest_salt_fallback() {
        let key = CipherKey::SiteSalt {
            password_salt: None,
            digest_salt: Some(SALT.to_string()),
        };
        assert_eq!(*key.derive().unwrap(), *site_key(SALT).derive().unwrap());
    }

    #[test]
    fn test_missing_salt() {
        let key = CipherKey::SiteSalt {
            password_salt: Some(String::new()),
            digest_salt: None,
        };
        assert_eq!(key.derive().unwrap_err(), CipherError::MissingSalt);
    }

    #[test]
    fn test_short_secret() {
        let key = CipherKey::Secret(Zeroizing::new(b"too short".to_vec()));
        assert_eq!(key.derive().unwrap_err(), CipherError::KeyTooShort(9));
    }

    #[test]
    fn test_debug_redaction() {
        let key = CipherKey::Secret(Zeroizing::new(vec![7u8; 32]));
        assert!(format!("{:?}", key).contains("REDACTED"));
    }

    #[test]
    fn test_recognizes_tokens() {
        assert!(is_encrypted(PORTAL_TOKEN));
        assert!(is_encrypted("ENCRYPT$fernet$gAAAAA"));
        assert!(!is_encrypted("5D41402ABC"));
        assert!(!is_encrypted("c2VjcmV0"));
        assert!(!is_encrypted("gAAAAA not base64"));

        assert_eq!(token_body(PORTAL_TOKEN).unwrap(), PORTAL_TOKEN);
        assert_eq!(token_body("ENCRYPT$fernet$gAAAAAxy").unwrap(), "gAAAAAxy");
        assert!(matches!(token_body("ENCRYPT$aes$gAAAAA"), Err(CipherError::Format(_))));
        assert!(matches!(token_body("ENCRYPT$fernet$"), Err(CipherError::Format(_))));
        assert!(matches!(token_body("Password12"), Err(CipherError::Format(_))));
    }

    #[cfg(feature = "encrypt")]
    #[test]
    fn test_decrypts_portal_tokens() {
        let cipher = select_cipher(site_key(SALT)).unwrap();
        assert_eq!(cipher.decrypt(PORTAL_TOKEN).unwrap().as_str(), "Password12");
        let tagged = format!("{}{}${}", ENCRYPT_PREFIX, CIPHER_NAME, PORTAL_TOKEN);
        assert_eq!(cipher.decrypt(&tagged).unwrap().as_str(), "Password12");

        let secret = select_cipher(CipherKey::Secret(Zeroizing::new(vec![b'x'; 40]))).unwrap();
        assert_eq!(secret.decrypt(SECRET_TOKEN).unwrap().as_str(), "Password12");
    }

    #[cfg(feature = "encrypt")]
    #[test]
    fn test_encrypt_decrypt() {
        let cipher = select_cipher(site_key(SALT)).unwrap();
        let encrypted = cipher.encrypt(&ClearTextPassword::from("Password12")).unwrap();
        assert!(is_encrypted(&encrypted));
        assert!(!encrypted.starts_with(ENCRYPT_PREFIX));

        // Fresh IV every time
        let again = cipher.encrypt(&ClearTextPassword::from("Password12")).unwrap();
        assert_ne!(encrypted, again);

        assert_eq!(cipher.decrypt(&encrypted).unwrap().as_str(), "Password12");
        assert_eq!(cipher.decrypt(&again).unwrap().as_str(), "Password12");
    }

    #[cfg(feature = "encrypt")]
    #[test]
    fn test_decrypt_with_other_key_fails() {
        let theirs = select_cipher(CipherKey::Secret(Zeroizing::new(vec![42u8; 32]))).unwrap();
        assert_eq!(theirs.decrypt(PORTAL_TOKEN).unwrap_err(), CipherError::Decrypt);
    }

    #[cfg(feature = "encrypt")]
    #[test]
    fn test_decrypt_rejects_malformed() {
        let cipher = select_cipher(site_key(SALT)).unwrap();
        assert!(matches!(cipher.decrypt("Password12"), Err(CipherError::Format(_))));
        assert!(matches!(
            cipher.decrypt("ENCRYPT$aes256gcm$AAAA"),
            Err(CipherError::Format(_))
        ));
        assert_eq!(cipher.decrypt("gAAAAAAA").unwrap_err(), CipherError::Decrypt);
    }

    #[cfg(not(feature = "encrypt"))]
    #[test]
    fn test_unavailable_without_feature() {
        assert!(matches!(
            select_cipher(site_key(SALT)),
            Err(CipherError::Unavailable)
        ));
    }
}

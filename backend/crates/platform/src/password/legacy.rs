//! Legacy Password Encodings
//!
//! Scrambled passwords and custom digests found in older user databases.
//! These are kept for verification of existing credentials (and for the
//! relays that need them) and must never be used to protect new secrets.

use thiserror::Error;

use crate::crypto::{HexError, from_base64, hex_xor, to_base64};

/// Tag leading every stored legacy digest
pub const DIGEST_PREFIX: &str = "DIGEST$custom$CONFSALT$";

/// Legacy encoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LegacyError {
    /// Salt or stored value is not valid hex
    #[error("Invalid hex in scrambled value: {0}")]
    InvalidHex(#[from] HexError),

    /// Stored base64 value is malformed
    #[error("Invalid base64 in scrambled value")]
    InvalidBase64,

    /// Unscrambled bytes are not UTF-8
    #[error("Unscrambled value is not valid UTF-8")]
    InvalidUtf8,

    /// Salted scrambling has nothing to XOR
    #[error("Cannot scramble an empty password with a salt")]
    EmptyPassword,

    /// Digest does not carry the expected tag
    #[error("Digest is missing the {DIGEST_PREFIX} tag")]
    MissingDigestTag,
}

/// Scramble a password for saving
///
/// XORs the hex encoding of the password against the hex salt. Falls back
/// to plain base64 when no salt is provided.
pub fn scramble_password(salt: Option<&str>, password: &str) -> Result<String, LegacyError> {
    match salt.filter(|s| !s.is_empty()) {
        None => Ok(to_base64(password.as_bytes())),
        Some(_) if password.is_empty() => Err(LegacyError::EmptyPassword),
        Some(salt) => Ok(hex_xor(salt, &hex::encode_upper(password))?),
    }
}

/// Reverse [`scramble_password`]
pub fn unscramble_password(salt: Option<&str>, scrambled: &str) -> Result<String, LegacyError> {
    match salt.filter(|s| !s.is_empty()) {
        None => {
            let raw = from_base64(scrambled).map_err(|_| LegacyError::InvalidBase64)?;
            String::from_utf8(raw).map_err(|_| LegacyError::InvalidUtf8)
        }
        Some(salt) => decode_hex_text(&hex_xor(salt, scrambled)?),
    }
}

/// Scramble a digest for saving (salt is mandatory here)
pub fn scramble_digest(salt: &str, digest: &str) -> Result<String, LegacyError> {
    Ok(hex_xor(salt, &hex::encode_upper(digest))?)
}

/// Reverse [`scramble_digest`]
pub fn unscramble_digest(salt: &str, scrambled: &str) -> Result<String, LegacyError> {
    decode_hex_text(&hex_xor(salt, scrambled)?)
}

/// Make the stored digest for a set of credentials
///
/// `DIGEST$custom$CONFSALT$<scramble(salt, "realm:username:password")>`
pub fn make_digest(
    realm: &str,
    username: &str,
    password: &str,
    salt: &str,
) -> Result<String, LegacyError> {
    let merged = [realm, username, password].join(":");
    Ok(format!("{}{}", DIGEST_PREFIX, scramble_digest(salt, &merged)?))
}

/// Recover `realm:username:password` from a stored digest
pub fn open_digest(digest: &str, salt: &str) -> Result<String, LegacyError> {
    let scrambled = digest
        .strip_prefix(DIGEST_PREFIX)
        .ok_or(LegacyError::MissingDigestTag)?;
    unscramble_digest(salt, scrambled)
}

// XOR output drops leading zeros, so an odd digit count means one was lost.
fn decode_hex_text(hex_digits: &str) -> Result<String, LegacyError> {
    let padded = if hex_digits.len() % 2 == 1 {
        format!("0{}", hex_digits)
    } else {
        hex_digits.to_string()
    };
    let raw = hex::decode(padded)
        .map_err(|e| LegacyError::InvalidHex(HexError::InvalidOperand(e.to_string())))?;
    String::from_utf8(raw).map_err(|_| LegacyError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: &str = "A1B2C3D4E5F60718293A4B5C6D7E8F90A1B2C3D4E5F60718293A4B5C6D7E8F90";

    #[test]
    fn test_scramble_without_salt_is_base64() {
        assert_eq!(scramble_password(None, "secret").unwrap(), "c2VjcmV0");
        assert_eq!(scramble_password(Some(""), "secret").unwrap(), "c2VjcmV0");
        assert_eq!(unscramble_password(None, "c2VjcmV0").unwrap(), "secret");
    }

    #[test]
    fn test_scramble_with_salt() {
        // "A" = 0x41, XOR 0x01 = 0x40
        assert_eq!(scramble_password(Some("01"), "A").unwrap(), "40");
        let scrambled = scramble_password(Some(SALT), "Password12").unwrap();
        assert!(scrambled.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(scrambled, scrambled.to_ascii_uppercase());
        assert_eq!(unscramble_password(Some(SALT), &scrambled).unwrap(), "Password12");
    }

    #[test]
    fn test_unscramble_recovers_dropped_leading_zero() {
        // "\n" = 0x0A, salt longer than the value
        let scrambled = scramble_password(Some("0000"), "\nA").unwrap();
        assert_eq!(scrambled, "A41");
        assert_eq!(unscramble_password(Some("0000"), &scrambled).unwrap(), "\nA");
    }

    #[test]
    fn test_unscramble_rejects_garbage() {
        assert_eq!(
            unscramble_password(None, "***"),
            Err(LegacyError::InvalidBase64)
        );
        assert!(unscramble_password(Some(SALT), "not hex").is_err());
        assert!(scramble_password(Some("zz"), "secret").is_err());
    }

    #[test]
    fn test_salted_scramble_of_empty_password() {
        assert_eq!(scramble_password(Some(SALT), ""), Err(LegacyError::EmptyPassword));
        assert_eq!(scramble_password(None, "").unwrap(), "");
    }

    #[test]
    fn test_make_digest() {
        let digest = make_digest("grid", "alice", "Password12", SALT).unwrap();
        assert!(digest.starts_with(DIGEST_PREFIX));
        assert_eq!(open_digest(&digest, SALT).unwrap(), "grid:alice:Password12");

        let other = make_digest("grid", "alice", "Password13", SALT).unwrap();
        assert_ne!(digest, other);
    }

    #[test]
    fn test_open_digest_requires_tag() {
        assert_eq!(
            open_digest("DIGEST$md5$ABC", SALT),
            Err(LegacyError::MissingDigestTag)
        );
    }
}

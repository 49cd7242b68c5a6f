//! Cryptographic Utilities

use base64::{Engine, engine::general_purpose};
use num_bigint::BigUint;
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Error for operations on hex-encoded big integers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexError {
    /// Operand contains a non-hex character or is empty
    #[error("Invalid hex operand: {0:?}")]
    InvalidOperand(String),
}

/// Generate cryptographically secure random bytes
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute SHA-256 hash as lowercase hex
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Fast fingerprint of a value, used as cache key and rate limit secret
pub fn simple_hash(value: &str) -> String {
    sha256_hex(value.as_bytes())
}

/// Encode bytes as base64
pub fn to_base64(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// Decode base64 to bytes
pub fn from_base64(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    general_purpose::STANDARD.decode(s)
}

/// Encode bytes as URL-safe base64 (with padding)
pub fn to_base64_url(bytes: &[u8]) -> String {
    general_purpose::URL_SAFE.encode(bytes)
}

/// XOR two hex-encoded unsigned integers
///
/// Operands of different length are aligned on their least significant
/// digit. The result is uppercase hex without leading zeros (`"0"` for zero),
/// so it matches the stored legacy scramble and digest values.
pub fn hex_xor(a: &str, b: &str) -> Result<String, HexError> {
    Ok(format!("{:X}", xor_big(a, b)?))
}

/// XOR two hex-encoded unsigned integers, rendered in decimal
pub fn hex_xor_decimal(a: &str, b: &str) -> Result<String, HexError> {
    Ok(xor_big(a, b)?.to_str_radix(10))
}

fn xor_big(a: &str, b: &str) -> Result<BigUint, HexError> {
    Ok(parse_hex(a)? ^ parse_hex(b)?)
}

// parse_bytes also takes '_' separators, so digits are checked first
fn parse_hex(s: &str) -> Result<BigUint, HexError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(HexError::InvalidOperand(s.to_string()));
    }
    BigUint::parse_bytes(s.as_bytes(), 16).ok_or_else(|| HexError::InvalidOperand(s.to_string()))
}

/// Constant-time comparison to prevent timing attacks
///
/// Every byte pair is visited; differences are OR-accumulated.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (SHA-256, hex XOR, Base64, constant-time compare)
//! - Scoped advisory file locks
//! - Password hashing (PBKDF2), legacy scramble/digest/encrypt, policy rules
//! - CSRF token derivation

pub mod crypto;
pub mod csrf;
pub mod file_lock;
pub mod password;

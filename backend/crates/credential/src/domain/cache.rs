//! Verification Cache
//!
//! Remembers passwords that already verified against a stored value so a
//! repeated check skips the key derivation and the policy. Keys are
//! fingerprints of the cleartext, never the cleartext itself. A cache is
//! owned by the caller and lives as long as it wants (one request, one
//! session); nothing is shared between callers.

use std::collections::HashMap;

use platform::crypto::simple_hash;

/// Fingerprint of a cleartext password
pub fn fingerprint(password: &str) -> String {
    simple_hash(password)
}

#[derive(Debug, Clone, Default)]
pub struct VerificationCache {
    entries: HashMap<String, String>,
}

impl VerificationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `password` verified against exactly `stored` before
    pub fn hit(&self, password: &str, stored: &str) -> bool {
        self.entries
            .get(&fingerprint(password))
            .is_some_and(|cached| cached == stored)
    }

    pub fn insert(&mut self, password: &str, stored: &str) {
        self.entries.insert(fingerprint(password), stored.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

//! Domain Layer
//!
//! Stored credential values and verification caches.

pub mod cache;
pub mod stored;

// Re-exports
pub use cache::VerificationCache;
pub use stored::{Scheme, StoredCredential};

//! Shared Kernel - Domain-crossing minimal core
//!
//! This crate contains the "smallest core" of vocabulary shared by the
//! rate limiter and the credential subsystem:
//! - The error taxonomy (store, policy, configuration, format, refusal)
//! - A unified error type and result aliases
//!
//! **Design Principle**: Only include things that are "hard to change"
//! and have consistent meaning across all crates.

pub mod error {
    pub mod app_error;
    pub mod kind;
}

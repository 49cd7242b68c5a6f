//! Login Rate Limiter
//!
//! Clean Architecture structure:
//! - `domain/` - Counter table, pure rules, store trait
//! - `application/` - Use cases, configuration and the limiter facade
//! - `infra/` - File-backed store with `flock` locking
//!
//! ## Model
//! - Counters live in one file per protocol, shared by every login process
//! - Writers take an exclusive lock for the whole load-modify-save cycle
//! - Store failures never block a login; they are logged and the limiter
//!   allows the attempt
//! - A success forgets the identity completely, even after many failures

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;

// Re-exports for convenience
pub use application::config::RateLimitConfig;
pub use application::limiter::RateLimiter;
pub use domain::repository::CounterStore;
pub use domain::services::penalty_for;
pub use domain::table::{AttemptHits, RateLimitTable};
pub use error::{RateLimitError, RateLimitResult};
pub use infra::file_store::FileCounterStore;

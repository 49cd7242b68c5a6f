//! Repository Traits
//!
//! Interface for counter persistence. Implementation is in infrastructure layer.

use chrono::{DateTime, Utc};

use crate::domain::table::RateLimitTable;
use crate::error::RateLimitResult;

/// Per-protocol counter table storage shared between processes
pub trait CounterStore: Send + Sync {
    /// Load without locking; a missing or corrupt table loads as empty
    fn load(&self, proto: &str) -> RateLimitResult<RateLimitTable>;

    /// Replace the stored table without locking
    fn save(&self, proto: &str, table: &RateLimitTable) -> RateLimitResult<()>;

    /// Load under a shared lock
    fn read(&self, proto: &str) -> RateLimitResult<RateLimitTable>;

    /// Load, modify and save under one exclusive lock
    fn update<R, F>(&self, proto: &str, f: F) -> RateLimitResult<R>
    where
        F: FnOnce(&mut RateLimitTable) -> R;

    /// Time of the last finished expiry run, if any
    fn last_expired(&self, proto: &str) -> RateLimitResult<Option<DateTime<Utc>>>;

    /// Record that an expiry run just finished
    fn mark_expired(&self, proto: &str) -> RateLimitResult<()>;
}

//! Rate Limiter
//!
//! Entry point for login handlers. The usual sequence is:
//!
//! 1. [`RateLimiter::check_limit`] before looking at the credentials
//! 2. on failure [`RateLimiter::record_attempt`] with `success = false`, then
//!    [`RateLimiter::penalize`] with the returned user hits
//! 3. on success [`RateLimiter::record_attempt`] with `success = true`
//!
//! plus [`RateLimiter::expire_entries`] from any process that has time for
//! it; runs are throttled.

use std::sync::Arc;

use crate::application::check_limit::CheckLimitUseCase;
use crate::application::config::RateLimitConfig;
use crate::application::expire_entries::ExpireEntriesUseCase;
use crate::application::penalize::PenalizeUseCase;
use crate::application::record_attempt::RecordAttemptUseCase;
use crate::domain::repository::CounterStore;
use crate::domain::table::{AttemptHits, RateLimitTable};
use crate::error::{RateLimitError, RateLimitResult};
use crate::infra::file_store::FileCounterStore;

/// Rate limiter over a counter store
pub struct RateLimiter<S>
where
    S: CounterStore,
{
    store: Arc<S>,
    config: Arc<RateLimitConfig>,
}

impl RateLimiter<FileCounterStore> {
    /// File-backed limiter in `config.run_dir`
    pub fn from_config(config: RateLimitConfig) -> Self {
        let store = FileCounterStore::new(config.run_dir.clone());
        Self::new(Arc::new(store), Arc::new(config))
    }
}

impl<S> RateLimiter<S>
where
    S: CounterStore,
{
    pub fn new(store: Arc<S>, config: Arc<RateLimitConfig>) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Whether the login must be refused, at the configured limit
    pub fn check_limit(&self, address: &str, proto: &str, identity: &str) -> bool {
        self.check_limit_with(address, proto, identity, self.config.max_user_hits)
    }

    /// Whether the login must be refused, at an explicit limit
    pub fn check_limit_with(
        &self,
        address: &str,
        proto: &str,
        identity: &str,
        max_hits: u64,
    ) -> bool {
        CheckLimitUseCase::new(self.store.clone()).execute(address, proto, identity, max_hits)
    }

    /// Like [`Self::check_limit`], as a typed refusal
    pub fn admit(&self, address: &str, proto: &str, identity: &str) -> RateLimitResult<()> {
        let max_hits = self.config.max_user_hits;
        let hits = match CheckLimitUseCase::new(self.store.clone()).user_hits(address, proto, identity)
        {
            Ok(hits) => hits,
            Err(err) => {
                err.log(proto);
                return Ok(());
            }
        };

        if hits >= max_hits {
            let err = RateLimitError::Refused { hits, max_hits };
            err.log(proto);
            return Err(err);
        }
        Ok(())
    }

    pub fn record_attempt(
        &self,
        address: &str,
        proto: &str,
        identity: &str,
        success: bool,
        secret: Option<&str>,
    ) -> AttemptHits {
        RecordAttemptUseCase::new(self.store.clone())
            .execute(address, proto, identity, success, secret)
    }

    /// Sweep with the configured window and delay
    pub fn expire_entries(&self, proto: &str) -> i64 {
        ExpireEntriesUseCase::new(self.store.clone()).execute(
            proto,
            self.config.fail_window,
            self.config.expire_delay,
        )
    }

    /// Stall for the hits over the configured limit
    pub fn penalize(&self, address: &str, proto: &str, identity: &str, current_hits: u64) -> u64 {
        PenalizeUseCase::new(self.config.clone()).execute(
            address,
            proto,
            identity,
            current_hits,
            self.config.max_user_hits,
        )
    }

    /// Current table of `proto`, read under a shared lock
    pub fn snapshot(&self, proto: &str) -> RateLimitResult<RateLimitTable> {
        self.store.read(proto)
    }
}

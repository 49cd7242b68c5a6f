//! Expire Entries Use Case

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::repository::CounterStore;
use crate::domain::services::{epoch_seconds, postponed_for};

/// Expire Entries Use Case
///
/// Sweeps failed secrets older than the fail window out of one protocol
/// table. Runs are throttled through the store's expiry marker so that many
/// processes calling this on every login do little work.
pub struct ExpireEntriesUseCase<S>
where
    S: CounterStore,
{
    store: Arc<S>,
}

impl<S> ExpireEntriesUseCase<S>
where
    S: CounterStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn execute(&self, proto: &str, fail_window: Duration, min_interval: Duration) -> i64 {
        self.execute_at(proto, fail_window, min_interval, Utc::now())
    }

    /// Sweep as of `now`
    ///
    /// Returns the number of expired secrets, or the negative number of
    /// seconds until the next run is allowed.
    pub fn execute_at(
        &self,
        proto: &str,
        fail_window: Duration,
        min_interval: Duration,
        now: DateTime<Utc>,
    ) -> i64 {
        let last_expired = self.store.last_expired(proto).unwrap_or_else(|err| {
            err.log(proto);
            None
        });
        if let Some(wait) = postponed_for(last_expired, min_interval, now) {
            tracing::debug!(proto, seconds = -wait, "Postponed expire");
            return wait;
        }

        let window = fail_window.as_secs_f64();
        let now_secs = epoch_seconds(now);
        let expired = match self
            .store
            .update(proto, |table| table.expire_older_than(proto, window, now_secs))
        {
            Ok(expired) => expired,
            Err(err) => {
                err.log(proto);
                0
            }
        };

        if expired > 0 {
            tracing::info!(proto, expired, "Expired rate limit entries");
        }

        // Touched even after a failed sweep to keep retries bounded
        if let Err(err) = self.store.mark_expired(proto) {
            err.log(proto);
        }

        i64::try_from(expired).unwrap_or(i64::MAX)
    }
}

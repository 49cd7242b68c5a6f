//! Record Attempt Use Case

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::repository::CounterStore;
use crate::domain::services::epoch_seconds;
use crate::domain::table::AttemptHits;

/// Record Attempt Use Case
///
/// A failure adds to the counters, a success clears the identity entirely.
pub struct RecordAttemptUseCase<S>
where
    S: CounterStore,
{
    store: Arc<S>,
}

impl<S> RecordAttemptUseCase<S>
where
    S: CounterStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn execute(
        &self,
        address: &str,
        proto: &str,
        identity: &str,
        success: bool,
        secret: Option<&str>,
    ) -> AttemptHits {
        self.execute_at(address, proto, identity, success, secret, Utc::now())
    }

    /// Record as of `now`
    ///
    /// Without a secret the timestamp stands in for it, so every such
    /// failure counts as a distinct hit. Store failures are logged and give
    /// all-zero hits.
    pub fn execute_at(
        &self,
        address: &str,
        proto: &str,
        identity: &str,
        success: bool,
        secret: Option<&str>,
        now: DateTime<Utc>,
    ) -> AttemptHits {
        let timestamp = epoch_seconds(now);
        let fallback_secret = timestamp.to_string();
        let secret = secret.filter(|s| !s.is_empty()).unwrap_or(&fallback_secret);

        let result = self.store.update(proto, |table| {
            let old_hits = table.user_hits(address, proto, identity);
            let hits = if success {
                table.register_success(address, proto, identity)
            } else {
                table.register_failure(address, proto, identity, secret, timestamp)
            };
            (old_hits, hits)
        });

        match result {
            Ok((old_hits, hits)) => {
                if hits.user_hits != old_hits {
                    tracing::info!(
                        proto,
                        address,
                        identity,
                        outcome = if success { "success" } else { "failure" },
                        from = old_hits,
                        to = hits.user_hits,
                        "Updated rate limit"
                    );
                }
                hits
            }
            Err(err) => {
                err.log(proto);
                AttemptHits::default()
            }
        }
    }
}

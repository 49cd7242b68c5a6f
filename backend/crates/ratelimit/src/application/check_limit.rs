//! Check Limit Use Case

use std::sync::Arc;

use crate::domain::repository::CounterStore;
use crate::error::RateLimitResult;

/// Check Limit Use Case
///
/// Refuses an identity from an address once it has `max_hits` distinct
/// failing secrets on record, however many raw fails those took.
pub struct CheckLimitUseCase<S>
where
    S: CounterStore,
{
    store: Arc<S>,
}

impl<S> CheckLimitUseCase<S>
where
    S: CounterStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Current hits of the identity, read under a shared lock
    pub fn user_hits(&self, address: &str, proto: &str, identity: &str) -> RateLimitResult<u64> {
        let table = self.store.read(proto)?;
        Ok(table.user_hits(address, proto, identity))
    }

    /// Returns `true` when the login must be refused
    ///
    /// A store failure allows the login; the limiter is advisory.
    pub fn execute(&self, address: &str, proto: &str, identity: &str, max_hits: u64) -> bool {
        let table = match self.store.read(proto) {
            Ok(table) => table,
            Err(err) => {
                err.log(proto);
                return false;
            }
        };

        let user_hits = table.user_hits(address, proto, identity);
        let refuse = user_hits >= max_hits;
        if refuse {
            let proto_hits = table.proto(address, proto).map_or(0, |p| p.hits);
            tracing::warn!(
                proto,
                address,
                identity,
                user_hits,
                proto_hits,
                max_hits,
                "Reached hit rate limit"
            );
        }
        refuse
    }
}

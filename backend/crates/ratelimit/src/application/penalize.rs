//! Penalize Use Case

use std::sync::Arc;
use std::thread;

use crate::application::config::RateLimitConfig;
use crate::domain::services::penalty_for;

/// Penalize Use Case
///
/// Stalls a rate-limited client so repeated forced failures cost the
/// attacker time instead of costing the server work.
pub struct PenalizeUseCase {
    config: Arc<RateLimitConfig>,
}

impl PenalizeUseCase {
    pub fn new(config: Arc<RateLimitConfig>) -> Self {
        Self { config }
    }

    /// Sleep for the penalty and return it in whole seconds
    pub fn execute(
        &self,
        address: &str,
        proto: &str,
        identity: &str,
        current_hits: u64,
        max_hits: u64,
    ) -> u64 {
        let penalty = penalty_for(current_hits, max_hits, self.config.penalty_per_hit);
        if penalty.is_zero() {
            return 0;
        }

        tracing::info!(
            proto,
            address,
            identity,
            seconds = penalty.as_secs(),
            "Stalling rate limited client"
        );
        thread::sleep(penalty);
        penalty.as_secs()
    }
}

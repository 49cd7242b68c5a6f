//! Application Configuration
//!
//! Configuration for the rate limiter.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_RUN_DIR: &str = "/run/gridauth";
pub const DEFAULT_MAX_USER_HITS: u64 = 5;
pub const DEFAULT_FAIL_WINDOW_SECS: u64 = 120;
pub const DEFAULT_EXPIRE_DELAY_SECS: u64 = 120;
pub const DEFAULT_PENALTY_SECS: u64 = 3;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Directory holding counter, lock and marker files
    pub run_dir: PathBuf,
    /// Distinct failing secrets allowed per identity before refusal
    pub max_user_hits: u64,
    /// Age after which a failed secret is forgotten
    pub fail_window: Duration,
    /// Minimum time between expiry runs
    pub expire_delay: Duration,
    /// Stall per hit over the limit
    pub penalty_per_hit: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            run_dir: PathBuf::from(DEFAULT_RUN_DIR),
            max_user_hits: DEFAULT_MAX_USER_HITS,
            fail_window: Duration::from_secs(DEFAULT_FAIL_WINDOW_SECS),
            expire_delay: Duration::from_secs(DEFAULT_EXPIRE_DELAY_SECS),
            penalty_per_hit: Duration::from_secs(DEFAULT_PENALTY_SECS),
        }
    }
}

impl RateLimitConfig {
    /// Load from `GRIDAUTH_*` environment variables
    ///
    /// Unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            run_dir: std::env::var("GRIDAUTH_RUN_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.run_dir),
            max_user_hits: env_parse("GRIDAUTH_MAX_USER_HITS").unwrap_or(defaults.max_user_hits),
            fail_window: env_parse("GRIDAUTH_FAIL_WINDOW")
                .map(Duration::from_secs)
                .unwrap_or(defaults.fail_window),
            expire_delay: env_parse("GRIDAUTH_EXPIRE_DELAY")
                .map(Duration::from_secs)
                .unwrap_or(defaults.expire_delay),
            penalty_per_hit: defaults.penalty_per_hit,
        }
    }

    /// Same limits over another run directory (tests, tools)
    pub fn with_run_dir(run_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_dir: run_dir.into(),
            ..Default::default()
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Ignoring unparsable setting");
            None
        }
    }
}

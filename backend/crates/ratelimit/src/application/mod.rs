//! Application Layer - Use Cases
//!
//! This layer orchestrates domain logic and infrastructure.
//! Contains use case implementations.

pub mod check_limit;
pub mod config;
pub mod expire_entries;
pub mod limiter;
pub mod penalize;
pub mod record_attempt;

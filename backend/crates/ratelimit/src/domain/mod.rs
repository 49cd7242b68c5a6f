//! Domain Layer - Counter table and rules
//!
//! This layer contains:
//! - The four-level counter table and its update rules
//! - Pure services (penalty, throttling arithmetic, timestamps)
//! - The counter store trait (interface)

pub mod repository;
pub mod services;
pub mod table;

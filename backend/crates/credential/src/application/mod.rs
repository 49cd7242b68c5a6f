//! Application Layer
//!
//! Site configuration wired into hashing, policy checks, legacy schemes,
//! password generation and CSRF tokens.

pub mod checker;
pub mod config;
pub mod generate;
pub mod hashing;
pub mod policy_engine;
pub mod tokens;

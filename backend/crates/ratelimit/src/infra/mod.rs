//! Infrastructure Layer - Store implementations

pub mod file_store;

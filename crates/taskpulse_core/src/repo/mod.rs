//! Repository layer: the local key-value store and the collections on it.
//!
//! # Responsibility
//! - Define the store contract consumed by the service layer.
//! - Isolate SQL and JSON encoding details from use-case orchestration.
//!
//! # Invariants
//! - Each collection is one JSON array under one fixed key.
//! - Malformed persisted data is never surfaced as an error.

pub mod collection;
pub mod kv_store;

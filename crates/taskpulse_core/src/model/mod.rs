//! Tracker domain model.
//!
//! # Responsibility
//! - Define the project and task records shared by persistence and analytics.
//! - Keep the persisted JSON shape (camelCase flat records) in one place.
//!
//! # Invariants
//! - A record is persisted iff its `id` is `Some`.
//! - Identifiers are generated without coordination (time-ordered + random).

use uuid::Uuid;

pub mod fields;
pub mod project;
pub mod task;

/// Identifier of a persisted project or task.
///
/// Kept as plain text because persisted data may carry short legacy ids
/// such as `"1"`.
pub type RecordId = String;

/// Generates a collision-resistant record identifier.
///
/// UUID v7 combines a millisecond timestamp with random bits, so ids sort by
/// creation time and need no central counter.
pub fn new_record_id() -> RecordId {
    Uuid::now_v7().simple().to_string()
}

//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store access into tracker use cases (`tracker_service`).
//! - Derive read-only analytics from collection snapshots (`analytics`).

pub mod analytics;
pub mod tracker_service;

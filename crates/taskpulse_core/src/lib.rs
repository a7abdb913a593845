//! Core domain logic for TaskPulse.
//! This crate is the single source of truth for tracker invariants:
//! persistence of projects and tasks, and the analytics derived from them.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, LogLevel, TrackerConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::project::{Priority, Project};
pub use model::task::{Task, TaskStatus};
pub use model::{new_record_id, RecordId};
pub use repo::collection::{PROJECTS_KEY, TASKS_KEY};
pub use repo::kv_store::{KeyValueStore, MemoryKvStore, SqliteKvStore, StoreError, StoreResult};
pub use service::analytics::{
    build_dashboard_report, compute_dashboard_metrics, compute_dashboard_metrics_at,
    compute_distribution, compute_overdue_tasks, compute_overdue_tasks_now, DashboardMetrics,
    DashboardReport, Distribution, OverdueTask, ProjectBucket, StatusCounts, NO_PROJECT_LABEL,
};
pub use service::tracker_service::{ChangeEvent, TaskFilter, TrackerService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

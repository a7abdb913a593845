//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open the configured store, seed it when empty, and print the dashboard.
//! - Keep output line-oriented (`key=value`) for quick local sanity checks.

use std::process::ExitCode;
use taskpulse_core::db::open_db;
use taskpulse_core::{
    core_version, init_logging, SqliteKvStore, TaskFilter, TrackerConfig, TrackerService,
};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("taskpulse error={err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = TrackerConfig::from_env()?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(config.log_level, log_dir)?;
    }

    let conn = open_db(&config.db_path)?;
    let service = TrackerService::new(SqliteKvStore::new(&conn));
    if service.initialize_sample_data()? {
        log::info!("event=cli_seed module=cli status=ok");
    }

    let report = service.dashboard();
    let metrics = report.metrics;
    println!("taskpulse version={}", core_version());
    println!("store path={}", config.db_path.display());
    println!(
        "metrics active_projects={} pending_tasks={} productivity_index={}% completion_rate={}% time_efficiency={}% overall_score={}",
        metrics.active_projects,
        metrics.pending_tasks,
        metrics.productivity_index,
        metrics.completion_rate,
        metrics.time_efficiency,
        metrics.overall_score
    );

    for overdue in &report.overdue {
        println!(
            "overdue task={:?} project={:?} days={}",
            overdue.task.name, overdue.project_name, overdue.days_overdue
        );
    }
    for bucket in &report.distribution.by_project {
        println!("distribution project={:?} tasks={}", bucket.name, bucket.count);
    }
    let by_status = report.distribution.by_status;
    println!(
        "distribution completed={} in_progress={} pending={}",
        by_status.completed, by_status.in_progress, by_status.pending
    );

    for task in service.list_tasks(&TaskFilter::default()) {
        println!(
            "task name={:?} status={} priority={} end={}",
            task.name,
            task.status.as_str(),
            task.priority.as_str(),
            task.end.map(|end| end.to_string()).unwrap_or_default()
        );
    }
    Ok(())
}

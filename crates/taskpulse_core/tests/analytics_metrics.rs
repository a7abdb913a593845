use chrono::{DateTime, Duration, NaiveDate, Utc};
use taskpulse_core::service::analytics::{
    average_time_efficiency, high_priority_completion_rate, overall_score, task_time_efficiency,
    time_efficiency_percentage,
};
use taskpulse_core::{compute_dashboard_metrics_at, Priority, Project, Task, TaskStatus};

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 6, 1).unwrap() + Duration::days(offset)
}

fn at_day(offset: i64) -> DateTime<Utc> {
    day(offset).and_hms_opt(0, 0, 0).unwrap().and_utc()
}

fn project(id: &str) -> Project {
    let mut project = Project::new(format!("project {id}"));
    project.id = Some(id.to_string());
    project
}

fn task(status: TaskStatus) -> Task {
    Task::new("task").in_project("p1").with_status(status)
}

fn completed_between(start: i64, end: i64) -> Task {
    task(TaskStatus::Completed).with_schedule(day(start), day(end))
}

#[test]
fn empty_snapshot_yields_zero_everywhere() {
    let metrics = compute_dashboard_metrics_at(&[], &[], at_day(0));

    assert_eq!(metrics.active_projects, 0);
    assert_eq!(metrics.pending_tasks, 0);
    assert_eq!(metrics.productivity_index, 0);
    assert_eq!(metrics.completion_rate, 0);
    assert_eq!(metrics.time_efficiency, 0);
    assert_eq!(metrics.overall_score, 0);
}

#[test]
fn completion_rate_reflects_completed_share() {
    let projects = [project("p1")];
    let one_of_four = [
        task(TaskStatus::Completed),
        task(TaskStatus::Pending),
        task(TaskStatus::InProgress),
        task(TaskStatus::Pending),
    ];
    let metrics = compute_dashboard_metrics_at(&projects, &one_of_four, at_day(0));
    assert_eq!(metrics.completion_rate, 25);
    assert_eq!(metrics.productivity_index, 25);
    assert_eq!(metrics.pending_tasks, 3);
    assert_eq!(metrics.active_projects, 1);

    let all_done = [task(TaskStatus::Completed), task(TaskStatus::Completed)];
    let metrics = compute_dashboard_metrics_at(&projects, &all_done, at_day(0));
    assert_eq!(metrics.completion_rate, 100);
    assert_eq!(metrics.pending_tasks, 0);
}

#[test]
fn time_efficiency_is_planned_over_actual() {
    let late = completed_between(0, 10);
    assert_eq!(task_time_efficiency(&late, at_day(20)), Some(0.5));

    let metrics = compute_dashboard_metrics_at(&[project("p1")], &[late], at_day(20));
    assert_eq!(metrics.time_efficiency, 50);
}

#[test]
fn time_efficiency_is_capped_at_one() {
    let early = completed_between(0, 10);
    assert_eq!(task_time_efficiency(&early, at_day(5)), Some(1.0));

    let metrics = compute_dashboard_metrics_at(&[project("p1")], &[early], at_day(5));
    assert_eq!(metrics.time_efficiency, 100);
}

#[test]
fn tasks_without_full_schedule_are_excluded_not_zeroed() {
    let mut no_end = task(TaskStatus::Completed);
    no_end.start = Some(day(0));
    let no_dates = task(TaskStatus::Completed);
    let pending = task(TaskStatus::Pending).with_schedule(day(0), day(10));
    let zero_length = completed_between(3, 3);
    let measured = completed_between(0, 10);

    let tasks = [no_end, no_dates, pending, zero_length, measured];
    assert_eq!(average_time_efficiency(&tasks, at_day(20)), 0.5);
    assert_eq!(average_time_efficiency(&tasks[..4], at_day(20)), 0.0);
}

#[test]
fn task_started_in_the_future_is_excluded() {
    let future = completed_between(30, 40);
    assert_eq!(task_time_efficiency(&future, at_day(20)), None);
}

#[test]
fn time_efficiency_rounds_each_task_before_averaging() {
    // 1/8 -> 13% and 1/10 -> 10%; (13 + 10) / 2 = 11.5 -> 12.
    let tasks = [completed_between(0, 1), completed_between(-2, -1)];
    let now = at_day(8);

    assert_eq!(time_efficiency_percentage(&tasks, now), 12);
    let metrics = compute_dashboard_metrics_at(&[project("p1")], &tasks, now);
    assert_eq!(metrics.time_efficiency, 12);

    // The score keeps the unrounded mean of 0.1125.
    assert!((average_time_efficiency(&tasks, now) - 0.1125).abs() < 1e-12);
}

#[test]
fn time_efficiency_percentage_is_zero_without_measurable_tasks() {
    let tasks = [task(TaskStatus::Completed), task(TaskStatus::Pending)];
    assert_eq!(time_efficiency_percentage(&tasks, at_day(8)), 0);
}

#[test]
fn high_priority_rate_defaults_to_one_without_high_priority_tasks() {
    assert_eq!(high_priority_completion_rate(&[]), 1.0);
    assert_eq!(high_priority_completion_rate(&[task(TaskStatus::Pending)]), 1.0);

    let tasks = [
        task(TaskStatus::Completed).with_priority(Priority::High),
        task(TaskStatus::Pending).with_priority(Priority::High),
        task(TaskStatus::Pending).with_priority(Priority::Low),
    ];
    assert_eq!(high_priority_completion_rate(&tasks), 0.5);
}

#[test]
fn overall_score_is_zero_without_projects_or_tasks() {
    let tasks = [completed_between(0, 10)];
    assert_eq!(overall_score(&[], &tasks, at_day(20)), 0);
    assert_eq!(overall_score(&[project("p1")], &[], at_day(20)), 0);
}

#[test]
fn overall_score_blends_weighted_components() {
    // completion 0.5 * 0.5 + efficiency 0.5 * 0.3 + high priority 1.0 * 0.2
    let tasks = [completed_between(0, 10), task(TaskStatus::Pending)];
    assert_eq!(overall_score(&[project("p1")], &tasks, at_day(20)), 60);

    // completion 1/3, no measurable efficiency, one of two high priority done
    let tasks = [
        task(TaskStatus::Completed).with_priority(Priority::High),
        task(TaskStatus::InProgress).with_priority(Priority::High),
        task(TaskStatus::Pending),
    ];
    assert_eq!(overall_score(&[project("p1")], &tasks, at_day(20)), 27);
}

#[test]
fn perfect_snapshot_scores_one_hundred() {
    let tasks = [completed_between(0, 10).with_priority(Priority::High)];
    let metrics = compute_dashboard_metrics_at(&[project("p1")], &tasks, at_day(10));
    assert_eq!(metrics.overall_score, 100);
    assert_eq!(metrics.time_efficiency, 100);
}

//! Analytics derived from project/task snapshots.
//!
//! # Responsibility
//! - Compute dashboard metrics, overdue listings and distribution data.
//! - Provide the display ordering used by task lists.
//!
//! # Invariants
//! - Every function is pure over its inputs; the clock is always a parameter
//!   except in the `*_now`/default wrappers.
//! - Every ratio over an empty set is 0, never NaN.
//! - Per-task time efficiency never exceeds 1.0.
//! - Dangling project references resolve to `NO_PROJECT_LABEL`.

use crate::model::project::{Priority, Project};
use crate::model::task::{Task, TaskStatus};
use crate::model::RecordId;
use chrono::{DateTime, Local, NaiveDate, NaiveTime, Utc};
use std::cmp::Ordering;

/// Label used wherever a task has no resolvable project.
pub const NO_PROJECT_LABEL: &str = "No project";

const COMPLETION_WEIGHT: f64 = 0.5;
const TIME_EFFICIENCY_WEIGHT: f64 = 0.3;
const PRIORITY_WEIGHT: f64 = 0.2;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardMetrics {
    pub active_projects: usize,
    /// Tasks whose status is anything but completed.
    pub pending_tasks: usize,
    /// Rounded completed/total percentage.
    pub productivity_index: u32,
    /// Same ratio as `productivity_index`; reported separately in analytics.
    pub completion_rate: u32,
    /// Rounded mean of per-task percentages, each already rounded.
    pub time_efficiency: u32,
    /// Weighted blend in `0..=100`.
    pub overall_score: u32,
}

/// One overdue task with its resolved project label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverdueTask {
    pub task: Task,
    pub project_name: String,
    /// Whole days between the due date and today.
    pub days_overdue: i64,
}

/// Task count for one project bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectBucket {
    /// `None` for the synthetic no-project bucket.
    pub project_id: Option<RecordId>,
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.completed + self.in_progress + self.pending
    }

    pub fn get(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::Completed => self.completed,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Pending => self.pending,
        }
    }
}

/// Chart inputs: tasks per project and per status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Distribution {
    /// Projects in collection order, then the no-project bucket if non-empty.
    pub by_project: Vec<ProjectBucket>,
    pub by_status: StatusCounts,
}

impl Distribution {
    /// Returns the count of the first bucket labelled `name`.
    pub fn project_count(&self, name: &str) -> Option<usize> {
        self.by_project
            .iter()
            .find(|bucket| bucket.name == name)
            .map(|bucket| bucket.count)
    }
}

/// Every derivation for one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardReport {
    pub metrics: DashboardMetrics,
    pub overdue: Vec<OverdueTask>,
    pub distribution: Distribution,
}

/// Computes dashboard metrics against the system clock.
pub fn compute_dashboard_metrics(projects: &[Project], tasks: &[Task]) -> DashboardMetrics {
    compute_dashboard_metrics_at(projects, tasks, Utc::now())
}

/// Computes dashboard metrics as of `now`.
pub fn compute_dashboard_metrics_at(
    projects: &[Project],
    tasks: &[Task],
    now: DateTime<Utc>,
) -> DashboardMetrics {
    let completed = count_completed(tasks);
    let completion_rate = as_percentage(ratio(completed, tasks.len()));

    DashboardMetrics {
        active_projects: projects.len(),
        pending_tasks: tasks.len() - completed,
        productivity_index: completion_rate,
        completion_rate,
        time_efficiency: time_efficiency_percentage(tasks, now),
        overall_score: overall_score(projects, tasks, now),
    }
}

/// Returns planned/actual duration for one task, capped at 1.0.
///
/// Only completed tasks with both dates qualify, and only when both the
/// planned span and the elapsed span since start are positive.
pub fn task_time_efficiency(task: &Task, now: DateTime<Utc>) -> Option<f64> {
    if !task.is_completed() {
        return None;
    }
    let start = midnight_utc(task.start?);
    let end = midnight_utc(task.end?);

    let planned_days = days_between(start, end);
    let actual_days = days_between(start, now);
    if planned_days > 0.0 && actual_days > 0.0 {
        Some((planned_days / actual_days).min(1.0))
    } else {
        None
    }
}

/// Mean per-task efficiency over qualifying tasks, 0.0 when none qualify.
pub fn average_time_efficiency(tasks: &[Task], now: DateTime<Utc>) -> f64 {
    let (sum, count) = tasks
        .iter()
        .filter_map(|task| task_time_efficiency(task, now))
        .fold((0.0, 0_usize), |(sum, count), efficiency| {
            (sum + efficiency, count + 1)
        });

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Dashboard time efficiency in `0..=100`.
///
/// Each qualifying task is rounded to a whole percentage before the mean is
/// taken and rounded again. `overall_score` uses the unrounded mean instead.
pub fn time_efficiency_percentage(tasks: &[Task], now: DateTime<Utc>) -> u32 {
    let (sum, count) = tasks
        .iter()
        .filter_map(|task| task_time_efficiency(task, now))
        .fold((0_u32, 0_u32), |(sum, count), efficiency| {
            (sum + as_percentage(efficiency), count + 1)
        });

    if count == 0 {
        0
    } else {
        (f64::from(sum) / f64::from(count)).round() as u32
    }
}

/// Completed share of high-priority tasks; 1.0 when there are none.
pub fn high_priority_completion_rate(tasks: &[Task]) -> f64 {
    let high_priority: Vec<&Task> = tasks
        .iter()
        .filter(|task| task.priority == Priority::High)
        .collect();
    if high_priority.is_empty() {
        return 1.0;
    }

    let completed = high_priority
        .iter()
        .filter(|task| task.is_completed())
        .count();
    ratio(completed, high_priority.len())
}

/// Weighted score: completion 50%, time efficiency 30%, high priority 20%.
///
/// Returns 0 when there are no projects or no tasks.
pub fn overall_score(projects: &[Project], tasks: &[Task], now: DateTime<Utc>) -> u32 {
    if projects.is_empty() || tasks.is_empty() {
        return 0;
    }

    let completion = ratio(count_completed(tasks), tasks.len());
    let blended = completion * COMPLETION_WEIGHT
        + average_time_efficiency(tasks, now) * TIME_EFFICIENCY_WEIGHT
        + high_priority_completion_rate(tasks) * PRIORITY_WEIGHT;
    as_percentage(blended)
}

/// Lists overdue tasks as of the local calendar date.
pub fn compute_overdue_tasks_now(tasks: &[Task], projects: &[Project]) -> Vec<OverdueTask> {
    compute_overdue_tasks(tasks, projects, Local::now().date_naive())
}

/// Lists unfinished tasks due strictly before `today`, earliest due first.
///
/// Tasks sharing a due date keep their collection order. Tasks without an
/// end date are never overdue.
pub fn compute_overdue_tasks(
    tasks: &[Task],
    projects: &[Project],
    today: NaiveDate,
) -> Vec<OverdueTask> {
    let mut overdue: Vec<(&Task, NaiveDate)> = tasks
        .iter()
        .filter(|task| !task.is_completed())
        .filter_map(|task| task.end.filter(|end| *end < today).map(|end| (task, end)))
        .collect();
    overdue.sort_by_key(|(_, end)| *end);

    overdue
        .into_iter()
        .map(|(task, end)| OverdueTask {
            task: task.clone(),
            project_name: project_label(projects, task.project_id.as_deref()).to_string(),
            days_overdue: (today - end).num_days(),
        })
        .collect()
}

/// Counts tasks per project and per status.
///
/// Every project appears, zero counts included. Tasks without a project or
/// with a dangling reference fall into the `NO_PROJECT_LABEL` bucket, which
/// is appended only when non-empty.
pub fn compute_distribution(projects: &[Project], tasks: &[Task]) -> Distribution {
    let mut by_project: Vec<ProjectBucket> = projects
        .iter()
        .map(|project| ProjectBucket {
            project_id: project.id.clone(),
            name: project.name.clone(),
            count: project.id.as_deref().map_or(0, |id| {
                tasks.iter().filter(|task| task.belongs_to(id)).count()
            }),
        })
        .collect();

    let unassigned = tasks
        .iter()
        .filter(|task| resolve_project(projects, task.project_id.as_deref()).is_none())
        .count();
    if unassigned > 0 {
        by_project.push(ProjectBucket {
            project_id: None,
            name: NO_PROJECT_LABEL.to_string(),
            count: unassigned,
        });
    }

    let mut by_status = StatusCounts::default();
    for task in tasks {
        match task.status {
            TaskStatus::Completed => by_status.completed += 1,
            TaskStatus::InProgress => by_status.in_progress += 1,
            TaskStatus::Pending => by_status.pending += 1,
        }
    }

    Distribution {
        by_project,
        by_status,
    }
}

/// Builds every derivation for one snapshot.
pub fn build_dashboard_report(
    projects: &[Project],
    tasks: &[Task],
    now: DateTime<Utc>,
    today: NaiveDate,
) -> DashboardReport {
    DashboardReport {
        metrics: compute_dashboard_metrics_at(projects, tasks, now),
        overdue: compute_overdue_tasks(tasks, projects, today),
        distribution: compute_distribution(projects, tasks),
    }
}

/// Finds the project a reference points to, if it still exists.
pub fn resolve_project<'a>(
    projects: &'a [Project],
    project_id: Option<&str>,
) -> Option<&'a Project> {
    let project_id = project_id?;
    projects.iter().find(|project| project.has_id(project_id))
}

/// Returns the project name for a reference, or `NO_PROJECT_LABEL`.
pub fn project_label<'a>(projects: &'a [Project], project_id: Option<&str>) -> &'a str {
    resolve_project(projects, project_id)
        .map_or(NO_PROJECT_LABEL, |project| project.name.as_str())
}

/// Sorts tasks for list display.
///
/// Unfinished before completed, then by end date (undated last), then by
/// priority high to low. Stable.
pub fn order_for_display(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        a.is_completed()
            .cmp(&b.is_completed())
            .then_with(|| compare_due_dates(a.end, b.end))
            .then_with(|| a.priority.rank().cmp(&b.priority.rank()))
    });
}

fn compare_due_dates(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn count_completed(tasks: &[Task]) -> usize {
    tasks.iter().filter(|task| task.is_completed()).count()
}

fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

fn as_percentage(value: f64) -> u32 {
    (value * 100.0).round().clamp(0.0, 100.0) as u32
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / MILLIS_PER_DAY
}

#[cfg(test)]
mod tests {
    use super::{as_percentage, compare_due_dates, days_between, midnight_utc, ratio};
    use chrono::NaiveDate;
    use std::cmp::Ordering;

    #[test]
    fn ratio_guards_division_by_zero() {
        assert_eq!(ratio(0, 0), 0.0);
        assert_eq!(ratio(3, 0), 0.0);
        assert_eq!(ratio(1, 4), 0.25);
    }

    #[test]
    fn as_percentage_rounds_half_up() {
        assert_eq!(as_percentage(0.125), 13);
        assert_eq!(as_percentage(0.3333), 33);
        assert_eq!(as_percentage(1.0), 100);
    }

    #[test]
    fn days_between_is_fractional() {
        let start = midnight_utc(NaiveDate::from_ymd_opt(2023, 6, 1).unwrap());
        let later = start + chrono::Duration::hours(36);
        assert_eq!(days_between(start, later), 1.5);
        assert_eq!(days_between(later, start), -1.5);
    }

    #[test]
    fn undated_tasks_sort_after_dated_ones() {
        let date = NaiveDate::from_ymd_opt(2023, 6, 1);
        assert_eq!(compare_due_dates(date, None), Ordering::Less);
        assert_eq!(compare_due_dates(None, date), Ordering::Greater);
        assert_eq!(compare_due_dates(None, None), Ordering::Equal);
    }
}

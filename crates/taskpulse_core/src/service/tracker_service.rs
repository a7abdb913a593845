//! Tracker use-case service.
//!
//! # Responsibility
//! - Provide project/task CRUD over the collections in a key-value store.
//! - Cascade project deletion to owned tasks.
//! - Notify subscribers after every successful mutation.
//!
//! # Invariants
//! - Reads never fail; malformed collections read as empty.
//! - A failed write is logged, returned as `Err`, and leaves the stored
//!   collections as they were. Subscribers are not notified.
//! - Saving a record with an unknown id changes nothing.

use crate::model::project::{Priority, Project};
use crate::model::task::{Task, TaskStatus};
use crate::model::RecordId;
use crate::repo::collection::{
    encode_collection, load_collection, store_collection, upsert, Record, UpsertOutcome,
    PROJECTS_KEY, TASKS_KEY,
};
use crate::repo::kv_store::{KeyValueStore, StoreResult};
use crate::service::analytics::{build_dashboard_report, order_for_display, DashboardReport};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use log::{debug, error, info};
use std::cell::RefCell;

/// Mutation notice delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    ProjectSaved(Project),
    ProjectDeleted {
        project_id: RecordId,
        cascaded_tasks: usize,
    },
    TaskSaved(Task),
    TaskDeleted(RecordId),
    Seeded {
        projects: bool,
        tasks: bool,
    },
    Cleared,
}

/// Filter for task listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Restrict to tasks referencing this project.
    pub project_id: Option<RecordId>,
}

type Listener = Box<dyn Fn(&ChangeEvent)>;

/// Project/task service over a key-value store.
pub struct TrackerService<S: KeyValueStore> {
    store: S,
    listeners: RefCell<Vec<Listener>>,
}

impl<S: KeyValueStore> TrackerService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registers a callback fired after each successful mutation.
    ///
    /// Callbacks may read through the service but must not subscribe.
    pub fn subscribe(&self, listener: impl Fn(&ChangeEvent) + 'static) {
        self.listeners.borrow_mut().push(Box::new(listener));
    }

    pub fn get_projects(&self) -> Vec<Project> {
        load_collection(&self.store)
    }

    pub fn find_project(&self, project_id: &str) -> Option<Project> {
        self.get_projects()
            .into_iter()
            .find(|project| project.has_id(project_id))
    }

    /// Returns the first `limit` projects in insertion order.
    pub fn recent_projects(&self, limit: usize) -> Vec<Project> {
        let mut projects = self.get_projects();
        projects.truncate(limit);
        projects
    }

    /// Inserts a new project or replaces an existing one by id.
    pub fn save_project(&self, project: Project) -> StoreResult<Project> {
        let (saved, outcome) = self.save_record(project)?;
        if outcome != UpsertOutcome::Missing {
            self.notify(&ChangeEvent::ProjectSaved(saved.clone()));
        }
        Ok(saved)
    }

    /// Deletes a project and every task referencing it.
    ///
    /// Both collections are written together; returns the number of tasks
    /// removed alongside the project.
    pub fn delete_project(&self, project_id: &str) -> StoreResult<usize> {
        let mut projects: Vec<Project> = self.get_projects();
        let mut tasks: Vec<Task> = self.get_tasks();
        projects.retain(|project| !project.has_id(project_id));
        let tasks_before = tasks.len();
        tasks.retain(|task| !task.belongs_to(project_id));
        let cascaded_tasks = tasks_before - tasks.len();

        let write = encode_collection(&projects).and_then(|projects_payload| {
            let tasks_payload = encode_collection(&tasks)?;
            self.store.set_items(&[
                (PROJECTS_KEY, projects_payload),
                (TASKS_KEY, tasks_payload),
            ])
        });
        if let Err(err) = write {
            error!(
                "event=project_delete module=service status=error project_id={} error={}",
                project_id, err
            );
            return Err(err);
        }

        info!(
            "event=project_delete module=service status=ok project_id={} cascaded_tasks={}",
            project_id, cascaded_tasks
        );
        self.notify(&ChangeEvent::ProjectDeleted {
            project_id: project_id.to_string(),
            cascaded_tasks,
        });
        Ok(cascaded_tasks)
    }

    pub fn get_tasks(&self) -> Vec<Task> {
        load_collection(&self.store)
    }

    pub fn find_task(&self, task_id: &str) -> Option<Task> {
        self.get_tasks().into_iter().find(|task| task.has_id(task_id))
    }

    /// Returns tasks referencing `project_id`, in insertion order.
    pub fn get_tasks_by_project(&self, project_id: &str) -> Vec<Task> {
        self.get_tasks()
            .into_iter()
            .filter(|task| task.belongs_to(project_id))
            .collect()
    }

    /// Returns filtered tasks in display order.
    pub fn list_tasks(&self, filter: &TaskFilter) -> Vec<Task> {
        let mut tasks = match filter.project_id.as_deref() {
            Some(project_id) => self.get_tasks_by_project(project_id),
            None => self.get_tasks(),
        };
        order_for_display(&mut tasks);
        tasks
    }

    /// Inserts a new task or replaces an existing one by id.
    pub fn save_task(&self, task: Task) -> StoreResult<Task> {
        let (saved, outcome) = self.save_record(task)?;
        if outcome != UpsertOutcome::Missing {
            self.notify(&ChangeEvent::TaskSaved(saved.clone()));
        }
        Ok(saved)
    }

    /// Deletes one task. Unknown ids change nothing and notify no one.
    pub fn delete_task(&self, task_id: &str) -> StoreResult<()> {
        let mut tasks = self.get_tasks();
        let tasks_before = tasks.len();
        tasks.retain(|task| !task.has_id(task_id));
        if tasks.len() == tasks_before {
            debug!(
                "event=task_delete module=service status=skipped task_id={task_id} reason=unknown_id"
            );
            return Ok(());
        }

        if let Err(err) = store_collection(&self.store, &tasks) {
            error!(
                "event=task_delete module=service status=error task_id={} error={}",
                task_id, err
            );
            return Err(err);
        }

        debug!("event=task_delete module=service status=ok task_id={task_id}");
        self.notify(&ChangeEvent::TaskDeleted(task_id.to_string()));
        Ok(())
    }

    /// Sets one task's status. Returns `None` when the task does not exist.
    pub fn set_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
    ) -> StoreResult<Option<Task>> {
        let Some(mut task) = self.find_task(task_id) else {
            return Ok(None);
        };
        task.status = status;
        self.save_task(task).map(Some)
    }

    /// Flips completed tasks back to pending and completes everything else.
    pub fn toggle_task_status(&self, task_id: &str) -> StoreResult<Option<Task>> {
        let Some(task) = self.find_task(task_id) else {
            return Ok(None);
        };
        self.set_task_status(task_id, task.status.toggled())
    }

    /// Seeds each empty collection with sample records.
    ///
    /// Returns whether anything was written. Non-empty collections are left
    /// alone; the seeded collections are written together.
    pub fn initialize_sample_data(&self) -> StoreResult<bool> {
        let seed_projects = self.get_projects().is_empty();
        let seed_tasks = self.get_tasks().is_empty();
        if !seed_projects && !seed_tasks {
            return Ok(false);
        }

        let write = sample_entries(seed_projects, seed_tasks)
            .and_then(|entries| self.store.set_items(&entries));
        if let Err(err) = write {
            error!(
                "event=sample_seed module=service status=error projects={} tasks={} error={}",
                seed_projects, seed_tasks, err
            );
            return Err(err);
        }

        info!(
            "event=sample_seed module=service status=ok projects={} tasks={}",
            seed_projects, seed_tasks
        );
        self.notify(&ChangeEvent::Seeded {
            projects: seed_projects,
            tasks: seed_tasks,
        });
        Ok(true)
    }

    /// Removes both collections from the store.
    pub fn clear(&self) -> StoreResult<()> {
        if let Err(err) = self.store.remove_items(&[TASKS_KEY, PROJECTS_KEY]) {
            error!("event=store_clear module=service status=error error={err}");
            return Err(err);
        }

        info!("event=store_clear module=service status=ok");
        self.notify(&ChangeEvent::Cleared);
        Ok(())
    }

    /// Builds the dashboard report for the stored collections.
    pub fn dashboard_at(&self, now: DateTime<Utc>, today: NaiveDate) -> DashboardReport {
        build_dashboard_report(&self.get_projects(), &self.get_tasks(), now, today)
    }

    /// Builds the dashboard report against the system clock.
    pub fn dashboard(&self) -> DashboardReport {
        self.dashboard_at(Utc::now(), Local::now().date_naive())
    }

    /// Applies save semantics and persists the collection when it changed.
    fn save_record<T: Record>(&self, record: T) -> StoreResult<(T, UpsertOutcome)> {
        let key = T::COLLECTION_KEY;
        let mut records: Vec<T> = load_collection(&self.store);
        let (saved, outcome) = upsert(&mut records, record, Utc::now());

        if outcome == UpsertOutcome::Missing {
            debug!(
                "event=record_save module=service status=skipped key={} id={} reason=unknown_id",
                key,
                saved.record_id().unwrap_or_default()
            );
            return Ok((saved, outcome));
        }

        self.write_collection(&records)?;
        debug!(
            "event=record_save module=service status=ok key={} id={} outcome={:?}",
            key,
            saved.record_id().unwrap_or_default(),
            outcome
        );
        Ok((saved, outcome))
    }

    fn write_collection<T: Record>(&self, records: &[T]) -> StoreResult<()> {
        store_collection(&self.store, records).map_err(|err| {
            error!(
                "event=store_write module=service status=error key={} records={} error={}",
                T::COLLECTION_KEY,
                records.len(),
                err
            );
            err
        })
    }

    fn notify(&self, event: &ChangeEvent) {
        for listener in self.listeners.borrow().iter() {
            listener(event);
        }
    }
}

fn sample_entries(
    seed_projects: bool,
    seed_tasks: bool,
) -> StoreResult<Vec<(&'static str, String)>> {
    let mut entries = Vec::with_capacity(2);
    if seed_projects {
        entries.push((PROJECTS_KEY, encode_collection(&sample_projects())?));
    }
    if seed_tasks {
        entries.push((TASKS_KEY, encode_collection(&sample_tasks())?));
    }
    Ok(entries)
}

fn sample_projects() -> Vec<Project> {
    vec![
        sample_project(
            "1",
            "Corporate Website",
            "Build the company's main website",
            (2023, 6, 1),
            (2023, 8, 15),
            Priority::High,
            (2023, 5, 20),
        ),
        sample_project(
            "2",
            "Mobile App",
            "Build the customer-facing mobile application",
            (2023, 7, 1),
            (2023, 9, 30),
            Priority::Medium,
            (2023, 6, 15),
        ),
    ]
}

fn sample_tasks() -> Vec<Task> {
    vec![
        sample_task(
            "1",
            "1",
            "UI/UX design",
            "Create wireframes and prototypes",
            ((2023, 6, 1), (2023, 6, 10)),
            Priority::High,
            TaskStatus::Completed,
            (2023, 5, 20),
        ),
        sample_task(
            "2",
            "1",
            "Frontend development",
            "Implement the user interface",
            ((2023, 6, 11), (2023, 7, 5)),
            Priority::High,
            TaskStatus::InProgress,
            (2023, 5, 20),
        ),
        sample_task(
            "3",
            "2",
            "Feature planning",
            "Define the core functionality",
            ((2023, 7, 1), (2023, 7, 7)),
            Priority::Medium,
            TaskStatus::Pending,
            (2023, 6, 15),
        ),
    ]
}

type Ymd = (i32, u32, u32);

fn sample_project(
    id: &str,
    name: &str,
    description: &str,
    start: Ymd,
    end: Ymd,
    priority: Priority,
    created: Ymd,
) -> Project {
    Project {
        id: Some(id.to_string()),
        name: name.to_string(),
        description: description.to_string(),
        start: ymd(start),
        end: ymd(end),
        priority,
        created_at: created_at(created),
    }
}

#[allow(clippy::too_many_arguments)]
fn sample_task(
    id: &str,
    project_id: &str,
    name: &str,
    description: &str,
    (start, end): (Ymd, Ymd),
    priority: Priority,
    status: TaskStatus,
    created: Ymd,
) -> Task {
    Task {
        id: Some(id.to_string()),
        project_id: Some(project_id.to_string()),
        name: name.to_string(),
        description: description.to_string(),
        start: ymd(start),
        end: ymd(end),
        priority,
        status,
        created_at: created_at(created),
    }
}

fn ymd((year, month, day): Ymd) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn created_at((year, month, day): Ymd) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).single()
}

//! Mapping from raw persisted task records to [`Task`].
//!
//! The data store hands back the joined project either as a single object or
//! as a one-element list, and older rows still carry the single `work_day`
//! column. Both shapes stop here: everything past the store boundary sees a
//! normalized [`Task`].

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;

use crate::dates::parse_iso_date;
use crate::models::project::Project;
use crate::models::task::{Priority, Task, TaskStatus, TaskType, WorkDays};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProjectJoin {
    One(Project),
    Many(Vec<Project>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskRow {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub work_days: Option<Vec<String>>,
    /// Legacy single-day column.
    #[serde(default)]
    pub work_day: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub project: Option<ProjectJoin>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn parse_stored_day(task_id: &str, value: &str) -> Option<NaiveDate> {
    // `date` columns come back bare, timestamps carry a time suffix.
    let head = value.get(..10).unwrap_or(value);
    let parsed = parse_iso_date(head);
    if parsed.is_none() && !value.is_empty() {
        warn!("Ignoring unparseable date {:?} on task {}", value, task_id);
    }
    parsed
}

pub fn normalize_task(row: TaskRow) -> Task {
    let project = match row.project {
        Some(ProjectJoin::One(project)) => Some(project),
        Some(ProjectJoin::Many(projects)) => projects.into_iter().next(),
        None => None,
    };

    let listed = row.work_days.filter(|days| !days.is_empty());
    let raw_days = listed.or_else(|| row.work_day.map(|day| vec![day]));
    let work_days = raw_days.and_then(|days| {
        WorkDays::normalize(days.iter().filter_map(|day| parse_stored_day(&row.id, day)))
    });

    let due_date = row
        .due_date
        .as_deref()
        .and_then(|value| parse_stored_day(&row.id, value));

    Task {
        id: row.id,
        title: row.title,
        task_type: row.task_type,
        priority: row.priority.unwrap_or_default(),
        status: row.status,
        due_date,
        work_days,
        project_id: row.project_id,
        project,
        notes: row.notes,
    }
}

pub fn normalize_tasks(rows: Vec<TaskRow>) -> Vec<Task> {
    rows.into_iter().map(normalize_task).collect()
}

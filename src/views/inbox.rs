use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::dates::toggle_day;
use crate::error::AppError;
use crate::models::project::sort_projects;
use crate::models::{NewProjectRequest, NewTaskRequest, Project, Task, TaskStatus};
use crate::scheduling;
use crate::state::AppState;
use crate::store::{Column, TaskQuery};
use crate::views::{ActiveFlag, PageStatus, load_tasks_and_projects, optimistic_update, record};

pub const TOAST_SCHEDULED: &str = "Task pianificato.";
pub const TOAST_INBOX: &str = "Task aggiunto in Inbox.";

/// Unplanned tasks plus quick capture.
#[derive(Serialize)]
pub struct InboxView {
    #[serde(skip)]
    state: AppState,
    #[serde(skip)]
    active: ActiveFlag,
    pub status: PageStatus,
    pub tasks: Vec<Task>,
    pub projects: Vec<Project>,
    /// Per-task day selection for the plan picker.
    pub plan_dates: HashMap<String, Vec<NaiveDate>>,
    pub toast: Option<String>,
}

impl InboxView {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            active: ActiveFlag::new(),
            status: PageStatus::default(),
            tasks: Vec::new(),
            projects: Vec::new(),
            plan_dates: HashMap::new(),
            toast: None,
        }
    }

    pub fn query() -> TaskQuery {
        TaskQuery::new()
            .status(TaskStatus::Inbox)
            .asc(Column::Priority)
            .asc(Column::DueDate)
    }

    pub fn active_flag(&self) -> ActiveFlag {
        self.active.clone()
    }

    pub async fn load(&mut self) -> Result<(), AppError> {
        self.status.begin();
        let result = load_tasks_and_projects(&self.state, &Self::query()).await;
        if !self.active.is_active() {
            return Ok(());
        }
        let (tasks, projects) = record(&mut self.status, &self.active, result)?;
        self.tasks = tasks;
        self.projects = projects;
        self.status.finish();
        Ok(())
    }

    /// Quick capture. Tasks that land in the inbox are shown first.
    pub async fn create_task(&mut self, req: NewTaskRequest) -> Result<Task, AppError> {
        self.status.dismiss_error();
        self.toast = None;
        let result = self.state.tasks().create(req).await;
        let task = record(&mut self.status, &self.active, result)?;
        if !self.active.is_active() {
            return Ok(task);
        }

        self.toast = Some(match task.status {
            TaskStatus::Inbox => TOAST_INBOX.to_string(),
            _ => TOAST_SCHEDULED.to_string(),
        });
        if task.status == TaskStatus::Inbox {
            self.tasks.insert(0, task.clone());
        }
        Ok(task)
    }

    /// Inline project creation from the capture form; the list stays sorted.
    pub async fn create_project(&mut self, name: &str) -> Result<Project, AppError> {
        self.status.dismiss_error();
        let req = NewProjectRequest {
            name: name.to_string(),
            color: None,
        };
        let result = self.state.projects().create(req).await;
        let project = record(&mut self.status, &self.active, result)?;
        if self.active.is_active() {
            self.projects.push(project.clone());
            sort_projects(&mut self.projects);
        }
        Ok(project)
    }

    pub fn toggle_plan_date(&mut self, id: &str, day: NaiveDate) -> &[NaiveDate] {
        let entry = self.plan_dates.entry(id.to_string()).or_default();
        let next = toggle_day(entry.as_slice(), day);
        *entry = next;
        entry.as_slice()
    }

    pub fn set_plan_dates(&mut self, id: &str, days: Vec<NaiveDate>) {
        self.plan_dates.insert(id.to_string(), days);
    }

    /// Plans a task on `days`; it leaves the inbox straight away.
    pub async fn schedule(&mut self, id: &str, days: Vec<NaiveDate>) -> Result<(), AppError> {
        self.status.dismiss_error();
        let patch = match scheduling::schedule(days) {
            Ok(patch) => patch,
            Err(e) => {
                self.status.fail(&e);
                return Err(e);
            }
        };

        let query = Self::query();
        let tasks = self.state.tasks();
        let result = optimistic_update(&mut self.tasks, id, &patch, &tasks, &self.active, |t| {
            query.matches(t)
        })
        .await;
        record(&mut self.status, &self.active, result)?;
        if self.active.is_active() {
            self.plan_dates.remove(id);
        }
        Ok(())
    }

    /// Schedules a task on the days picked with [`toggle_plan_date`](Self::toggle_plan_date).
    pub async fn schedule_selected(&mut self, id: &str) -> Result<(), AppError> {
        let days = self.plan_dates.get(id).cloned().unwrap_or_default();
        self.schedule(id, days).await
    }

    pub fn dismiss_error(&mut self) {
        self.status.dismiss_error();
    }

    pub fn dismiss_toast(&mut self) {
        self.toast = None;
    }
}

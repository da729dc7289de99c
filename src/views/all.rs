use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{Priority, Project, Task, TaskPatch, TaskStatus, TaskType};
use crate::scheduling;
use crate::state::AppState;
use crate::store::{Column, Filter, TaskQuery};
use crate::views::{ActiveFlag, PageStatus, load_tasks_and_projects, optimistic_update, record};

/// `None` means "all" for every field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllTasksFilters {
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(rename = "type", default)]
    pub task_type: Option<TaskType>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(rename = "project", default)]
    pub project_id: Option<String>,
}

/// Every open and unplanned task, filterable.
#[derive(Serialize)]
pub struct AllTasksView {
    #[serde(skip)]
    state: AppState,
    #[serde(skip)]
    active: ActiveFlag,
    pub status: PageStatus,
    pub filters: AllTasksFilters,
    pub tasks: Vec<Task>,
    pub projects: Vec<Project>,
}

impl AllTasksView {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            active: ActiveFlag::new(),
            status: PageStatus::default(),
            filters: AllTasksFilters::default(),
            tasks: Vec::new(),
            projects: Vec::new(),
        }
    }

    pub fn query(&self) -> TaskQuery {
        let mut query = TaskQuery::new().filter(Filter::StatusIn(vec![
            TaskStatus::Open,
            TaskStatus::Inbox,
        ]));
        if let Some(status) = self.filters.status {
            query = query.status(status);
        }
        if let Some(task_type) = self.filters.task_type {
            query = query.filter(Filter::Type(task_type));
        }
        if let Some(priority) = self.filters.priority {
            query = query.filter(Filter::Priority(priority));
        }
        if let Some(project_id) = &self.filters.project_id {
            query = query.filter(Filter::Project(project_id.clone()));
        }
        query
            .asc(Column::Status)
            .asc(Column::WorkDays)
            .asc(Column::DueDate)
    }

    pub fn active_flag(&self) -> ActiveFlag {
        self.active.clone()
    }

    pub async fn load(&mut self) -> Result<(), AppError> {
        self.status.begin();
        let result = load_tasks_and_projects(&self.state, &self.query()).await;
        if !self.active.is_active() {
            return Ok(());
        }
        let (tasks, projects) = record(&mut self.status, &self.active, result)?;
        self.tasks = tasks;
        self.projects = projects;
        self.status.finish();
        Ok(())
    }

    /// Changing a filter reloads from the store.
    pub async fn set_filters(&mut self, filters: AllTasksFilters) -> Result<(), AppError> {
        self.filters = filters;
        self.load().await
    }

    pub async fn update_fields(&mut self, id: &str, patch: TaskPatch) -> Result<(), AppError> {
        self.status.dismiss_error();
        let query = self.query();
        let tasks = self.state.tasks();
        let result = optimistic_update(&mut self.tasks, id, &patch, &tasks, &self.active, |t| {
            query.matches(t)
        })
        .await;
        record(&mut self.status, &self.active, result).map(|_| ())
    }

    pub async fn change_work_days(&mut self, id: &str, days: Vec<NaiveDate>) -> Result<(), AppError> {
        let task = self.find(id)?;
        let patch = scheduling::set_work_days(task, days);
        self.update_fields(id, patch).await
    }

    pub async fn change_due_date(&mut self, id: &str, due: Option<NaiveDate>) -> Result<(), AppError> {
        self.update_fields(id, TaskPatch::default().due_date(due)).await
    }

    pub async fn change_status(&mut self, id: &str, status: TaskStatus) -> Result<(), AppError> {
        let patch = match status {
            TaskStatus::Inbox => scheduling::move_to_inbox(),
            other => TaskPatch::default().status(other),
        };
        self.update_fields(id, patch).await
    }

    pub async fn complete(&mut self, id: &str) -> Result<(), AppError> {
        self.update_fields(id, scheduling::complete()).await
    }

    fn find(&self, id: &str) -> Result<&Task, AppError> {
        self.tasks.iter().find(|t| t.id == id).ok_or(AppError::NotFound)
    }

    pub fn dismiss_error(&mut self) {
        self.status.dismiss_error();
    }
}

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{Project, Task, TaskStatus, TaskType};
use crate::scheduling;
use crate::state::AppState;
use crate::store::{Column, Filter, TaskQuery};
use crate::views::{
    ActiveFlag, PageStatus, load_tasks_and_projects, optimistic_delete, optimistic_update, record,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoneFilters {
    #[serde(rename = "type", default)]
    pub task_type: Option<TaskType>,
    #[serde(rename = "project", default)]
    pub project_id: Option<String>,
}

/// Completed tasks, most recent work first.
#[derive(Serialize)]
pub struct DoneView {
    #[serde(skip)]
    state: AppState,
    #[serde(skip)]
    active: ActiveFlag,
    pub status: PageStatus,
    pub filters: DoneFilters,
    pub tasks: Vec<Task>,
    pub projects: Vec<Project>,
}

impl DoneView {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            active: ActiveFlag::new(),
            status: PageStatus::default(),
            filters: DoneFilters::default(),
            tasks: Vec::new(),
            projects: Vec::new(),
        }
    }

    pub fn query(&self) -> TaskQuery {
        let mut query = TaskQuery::new().status(TaskStatus::Done);
        if let Some(task_type) = self.filters.task_type {
            query = query.filter(Filter::Type(task_type));
        }
        if let Some(project_id) = &self.filters.project_id {
            query = query.filter(Filter::Project(project_id.clone()));
        }
        query.desc(Column::WorkDays)
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

    pub async fn set_filters(&mut self, filters: DoneFilters) -> Result<(), AppError> {
        self.filters = filters;
        self.load().await
    }

    /// Back to the plan (or the inbox when it has no days).
    pub async fn reopen(&mut self, id: &str) -> Result<(), AppError> {
        self.status.dismiss_error();
        let patch = {
            let task = self
                .tasks
                .iter()
                .find(|t| t.id == id)
                .ok_or(AppError::NotFound)?;
            scheduling::reopen(task)
        };
        let query = self.query();
        let tasks = self.state.tasks();
        let result = optimistic_update(&mut self.tasks, id, &patch, &tasks, &self.active, |t| {
            query.matches(t)
        })
        .await;
        record(&mut self.status, &self.active, result).map(|_| ())
    }

    pub async fn delete(&mut self, id: &str) -> Result<(), AppError> {
        self.status.dismiss_error();
        let tasks = self.state.tasks();
        let result = optimistic_delete(&mut self.tasks, id, &tasks, &self.active).await;
        record(&mut self.status, &self.active, result)
    }

    pub fn dismiss_error(&mut self) {
        self.status.dismiss_error();
    }
}

use chrono::NaiveDate;
use serde::Serialize;

use crate::dates;
use crate::error::AppError;
use crate::models::labels::status_label;
use crate::models::{Project, Task, TaskDraft};
use crate::state::AppState;
use crate::views::{ActiveFlag, PageStatus, establish_session, record};

pub const NOT_FOUND_MESSAGE: &str = "Task non trovato.";

/// One task with an editable draft.
///
/// Actions here wait for the store before the page changes.
#[derive(Serialize)]
pub struct TaskDetailView {
    #[serde(skip)]
    state: AppState,
    #[serde(skip)]
    active: ActiveFlag,
    pub id: String,
    pub today: NaiveDate,
    pub status: PageStatus,
    pub task: Option<Task>,
    pub draft: Option<TaskDraft>,
    pub projects: Vec<Project>,
    pub deleted: bool,
}

impl TaskDetailView {
    pub fn new(state: AppState, id: impl Into<String>) -> Self {
        Self::on(state, id, dates::today())
    }

    pub fn on(state: AppState, id: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            state,
            active: ActiveFlag::new(),
            id: id.into(),
            today,
            status: PageStatus::default(),
            task: None,
            draft: None,
            projects: Vec::new(),
            deleted: false,
        }
    }

    pub fn active_flag(&self) -> ActiveFlag {
        self.active.clone()
    }

    pub async fn load(&mut self) -> Result<(), AppError> {
        self.status.begin();
        let result = self.fetch().await;
        if !self.active.is_active() {
            return Ok(());
        }
        match result {
            Ok((task, projects)) => {
                self.show(task);
                self.projects = projects;
                self.status.finish();
                Ok(())
            }
            Err(AppError::NotFound) => {
                self.status.finish();
                self.status.error = Some(NOT_FOUND_MESSAGE.to_string());
                Err(AppError::NotFound)
            }
            Err(e) => {
                self.status.fail(&e);
                Err(e)
            }
        }
    }

    async fn fetch(&self) -> Result<(Task, Vec<Project>), AppError> {
        establish_session(&self.state).await?;
        let tasks = self.state.tasks();
        let projects = self.state.projects();
        let (task, projects) = tokio::join!(tasks.get(&self.id), projects.list());
        Ok((task?, projects?))
    }

    fn show(&mut self, task: Task) {
        self.draft = Some(TaskDraft::from_task(&task));
        self.task = Some(task);
    }

    fn settle(&mut self, result: Result<Task, AppError>) -> Result<(), AppError> {
        let task = record(&mut self.status, &self.active, result)?;
        if self.active.is_active() {
            self.show(task);
        }
        Ok(())
    }

    /// Edits the draft in place, e.g. from a form binding.
    pub fn edit<F>(&mut self, f: F)
    where
        F: FnOnce(&mut TaskDraft),
    {
        if let Some(draft) = self.draft.as_mut() {
            f(draft);
        }
    }

    pub async fn save(&mut self) -> Result<(), AppError> {
        self.status.dismiss_error();
        let Some(draft) = self.draft.clone() else {
            return Err(AppError::NotFound);
        };
        let result = self.state.tasks().save(&self.id, draft).await;
        self.settle(result)
    }

    pub async fn complete(&mut self) -> Result<(), AppError> {
        self.status.dismiss_error();
        let result = self.state.tasks().complete(&self.id).await;
        self.settle(result)
    }

    pub async fn send_to_today(&mut self) -> Result<(), AppError> {
        self.status.dismiss_error();
        let result = self.state.tasks().send_to_today(&self.id, self.today).await;
        self.settle(result)
    }

    pub async fn send_to_inbox(&mut self) -> Result<(), AppError> {
        self.status.dismiss_error();
        let result = self.state.tasks().send_to_inbox(&self.id).await;
        self.settle(result)
    }

    pub async fn snooze(&mut self) -> Result<(), AppError> {
        self.status.dismiss_error();
        let result = self.state.tasks().snooze(&self.id).await;
        self.settle(result)
    }

    pub async fn delete(&mut self) -> Result<(), AppError> {
        self.status.dismiss_error();
        let result = self.state.tasks().delete(&self.id).await;
        record(&mut self.status, &self.active, result)?;
        if self.active.is_active() {
            self.deleted = true;
            self.task = None;
            self.draft = None;
        }
        Ok(())
    }

    pub fn status_label(&self) -> Option<String> {
        self.task
            .as_ref()
            .map(|t| status_label(t.status, t.has_work_days()))
    }

    pub fn work_days_summary(&self) -> Option<String> {
        self.task
            .as_ref()
            .filter(|t| t.has_work_days())
            .map(Task::work_days_summary)
    }

    pub fn dismiss_error(&mut self) {
        self.status.dismiss_error();
    }
}

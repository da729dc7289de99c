use chrono::NaiveDate;
use serde::Serialize;

use crate::dates;
use crate::error::AppError;
use crate::models::{Task, TaskStatus};
use crate::scheduling;
use crate::state::AppState;
use crate::store::{Column, TaskQuery};
use crate::views::{
    ActiveFlag, PageStatus, establish_session, optimistic_update, record, split_by_type,
};

#[derive(Serialize)]
pub struct TodayView {
    #[serde(skip)]
    state: AppState,
    #[serde(skip)]
    active: ActiveFlag,
    pub today: NaiveDate,
    pub status: PageStatus,
    pub tasks: Vec<Task>,
}

impl TodayView {
    pub fn new(state: AppState) -> Self {
        Self::on(state, dates::today())
    }

    pub fn on(state: AppState, today: NaiveDate) -> Self {
        Self {
            state,
            active: ActiveFlag::new(),
            today,
            status: PageStatus::default(),
            tasks: Vec::new(),
        }
    }

    pub fn query(&self) -> TaskQuery {
        TaskQuery::new()
            .status(TaskStatus::Open)
            .scheduled_on(self.today)
            .asc(Column::Type)
            .asc(Column::DueDate)
    }

    pub fn active_flag(&self) -> ActiveFlag {
        self.active.clone()
    }

    pub async fn load(&mut self) -> Result<(), AppError> {
        self.status.begin();
        let result = match establish_session(&self.state).await {
            Ok(_) => self.state.tasks().list(&self.query()).await,
            Err(e) => Err(e),
        };
        if !self.active.is_active() {
            return Ok(());
        }
        self.tasks = record(&mut self.status, &self.active, result)?;
        self.status.finish();
        Ok(())
    }

    /// (work, personal)
    pub fn sections(&self) -> (Vec<&Task>, Vec<&Task>) {
        split_by_type(&self.tasks)
    }

    pub async fn complete(&mut self, id: &str) -> Result<(), AppError> {
        self.status.dismiss_error();
        let query = self.query();
        let tasks = self.state.tasks();
        let result = optimistic_update(
            &mut self.tasks,
            id,
            &scheduling::complete(),
            &tasks,
            &self.active,
            |t| query.matches(t),
        )
        .await;
        record(&mut self.status, &self.active, result).map(|_| ())
    }

    /// Takes today off the task's plan.
    pub async fn unplan(&mut self, id: &str) -> Result<(), AppError> {
        self.status.dismiss_error();
        let patch = self
            .tasks
            .iter()
            .find(|t| t.id == id)
            .and_then(|t| scheduling::remove_work_day(t, self.today));
        let Some(patch) = patch else {
            return Ok(());
        };
        let query = self.query();
        let tasks = self.state.tasks();
        let result = optimistic_update(&mut self.tasks, id, &patch, &tasks, &self.active, |t| {
            query.matches(t)
        })
        .await;
        record(&mut self.status, &self.active, result).map(|_| ())
    }

    pub fn dismiss_error(&mut self) {
        self.status.dismiss_error();
    }
}

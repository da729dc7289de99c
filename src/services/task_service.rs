use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::AppError;
use crate::events::{TaskEvent, TaskEvents};
use crate::models::{NewTaskRequest, Task, TaskDraft, TaskPatch};
use crate::scheduling;
use crate::store::{TaskQuery, TaskStore};

/// Remote-confirmed task operations.
///
/// Input is validated before the store is called; every successful write
/// publishes [`TaskEvent::TasksChanged`].
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    events: TaskEvents,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>, events: TaskEvents) -> Self {
        Self { store, events }
    }

    pub async fn list(&self, query: &TaskQuery) -> Result<Vec<Task>, AppError> {
        self.store.select_tasks(query).await
    }

    pub async fn count(&self, query: &TaskQuery) -> Result<usize, AppError> {
        self.store.count_tasks(query).await
    }

    pub async fn get(&self, id: &str) -> Result<Task, AppError> {
        self.store.fetch_task(id).await?.ok_or(AppError::NotFound)
    }

    pub async fn create(&self, req: NewTaskRequest) -> Result<Task, AppError> {
        let new_task = req.validate()?;
        let task = self.store.insert_task(&new_task).await?;
        info!("created task {} ({})", task.id, task.status.as_str());
        self.events.publish(TaskEvent::TasksChanged);
        Ok(task)
    }

    pub async fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task, AppError> {
        if patch.is_empty() {
            return self.get(id).await;
        }
        let task = self
            .store
            .update_task(id, patch)
            .await?
            .ok_or(AppError::NotFound)?;
        debug!("updated task {}", id);
        self.events.publish(TaskEvent::TasksChanged);
        Ok(task)
    }

    /// Reads the task, derives a patch from it and writes it back.
    /// A transition that changes nothing returns the task untouched.
    async fn transition<F>(&self, id: &str, f: F) -> Result<Task, AppError>
    where
        F: FnOnce(&Task) -> Option<TaskPatch>,
    {
        let task = self.get(id).await?;
        match f(&task) {
            Some(patch) => self.update(id, &patch).await,
            None => Ok(task),
        }
    }

    /// Detail page save.
    pub async fn save(&self, id: &str, draft: TaskDraft) -> Result<Task, AppError> {
        let patch = draft.into_patch()?;
        self.update(id, &patch).await
    }

    pub async fn schedule(&self, id: &str, days: Vec<NaiveDate>) -> Result<Task, AppError> {
        let patch = scheduling::schedule(days)?;
        self.update(id, &patch).await
    }

    pub async fn send_to_today(&self, id: &str, today: NaiveDate) -> Result<Task, AppError> {
        self.transition(id, |task| Some(scheduling::send_to_day(task, today)))
            .await
    }

    pub async fn send_to_inbox(&self, id: &str) -> Result<Task, AppError> {
        self.update(id, &scheduling::move_to_inbox()).await
    }

    pub async fn snooze(&self, id: &str) -> Result<Task, AppError> {
        self.transition(id, scheduling::snooze).await
    }

    pub async fn complete(&self, id: &str) -> Result<Task, AppError> {
        self.update(id, &scheduling::complete()).await
    }

    pub async fn reopen(&self, id: &str) -> Result<Task, AppError> {
        self.transition(id, |task| Some(scheduling::reopen(task)))
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        if !self.store.delete_task(id).await? {
            return Err(AppError::NotFound);
        }
        info!("deleted task {}", id);
        self.events.publish(TaskEvent::TasksChanged);
        Ok(())
    }
}

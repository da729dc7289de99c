use std::sync::Arc;

use tracing::info;

use crate::error::AppError;
use crate::events::{TaskEvent, TaskEvents};
use crate::models::project::validate_project_name;
use crate::models::{NewProjectRequest, Project};
use crate::store::TaskStore;

#[derive(Clone)]
pub struct ProjectService {
    store: Arc<dyn TaskStore>,
    events: TaskEvents,
}

impl ProjectService {
    pub fn new(store: Arc<dyn TaskStore>, events: TaskEvents) -> Self {
        Self { store, events }
    }

    pub async fn list(&self) -> Result<Vec<Project>, AppError> {
        self.store.list_projects().await
    }

    pub async fn count(&self) -> Result<usize, AppError> {
        self.store.count_projects().await
    }

    pub async fn create(&self, req: NewProjectRequest) -> Result<Project, AppError> {
        let name = validate_project_name(&req.name)?;
        let color = req.color.as_deref().map(str::trim).filter(|c| !c.is_empty());
        let project = self.store.insert_project(&name, color).await?;
        info!("created project {}", project.id);
        self.events.publish(TaskEvent::ProjectsChanged);
        Ok(project)
    }

    pub async fn rename(&self, id: &str, name: &str) -> Result<Project, AppError> {
        let name = validate_project_name(name)?;
        let project = self
            .store
            .rename_project(id, &name)
            .await?
            .ok_or(AppError::NotFound)?;
        self.events.publish(TaskEvent::ProjectsChanged);
        Ok(project)
    }

    /// Tasks pointing at the project are detached first, then the row goes.
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let detached = self.store.detach_project(id).await?;
        if detached > 0 {
            info!("detached {} tasks from project {}", detached, id);
            self.events.publish(TaskEvent::TasksChanged);
        }
        if !self.store.delete_project(id).await? {
            return Err(AppError::NotFound);
        }
        self.events.publish(TaskEvent::ProjectsChanged);
        Ok(())
    }
}

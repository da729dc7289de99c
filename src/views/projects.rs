use serde::Serialize;

use crate::error::AppError;
use crate::models::project::{sort_projects, validate_project_name};
use crate::models::{NewProjectRequest, Project};
use crate::state::AppState;
use crate::views::{ActiveFlag, PageStatus, establish_session, record};

#[derive(Serialize)]
pub struct ProjectsView {
    #[serde(skip)]
    state: AppState,
    #[serde(skip)]
    active: ActiveFlag,
    pub status: PageStatus,
    pub projects: Vec<Project>,
}

impl ProjectsView {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            active: ActiveFlag::new(),
            status: PageStatus::default(),
            projects: Vec::new(),
        }
    }

    pub fn active_flag(&self) -> ActiveFlag {
        self.active.clone()
    }

    pub async fn load(&mut self) -> Result<(), AppError> {
        self.status.begin();
        let result = match establish_session(&self.state).await {
            Ok(_) => self.state.projects().list().await,
            Err(e) => Err(e),
        };
        if !self.active.is_active() {
            return Ok(());
        }
        self.projects = record(&mut self.status, &self.active, result)?;
        self.status.finish();
        Ok(())
    }

    pub async fn create(&mut self, name: &str) -> Result<Project, AppError> {
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

    /// Renames in place right away; the old name returns if the store refuses.
    pub async fn rename(&mut self, id: &str, name: &str) -> Result<(), AppError> {
        self.status.dismiss_error();
        let name = match validate_project_name(name) {
            Ok(name) => name,
            Err(e) => {
                self.status.fail(&e);
                return Err(e);
            }
        };

        let snapshot = self.projects.clone();
        let Some(project) = self.projects.iter_mut().find(|p| p.id == id) else {
            self.status.fail(&AppError::NotFound);
            return Err(AppError::NotFound);
        };
        project.name = name.clone();
        sort_projects(&mut self.projects);

        let result = self.state.projects().rename(id, &name).await;
        if !self.active.is_active() {
            return Ok(());
        }
        if let Err(e) = result {
            self.projects = snapshot;
            self.status.fail(&e);
            return Err(e);
        }
        Ok(())
    }

    /// Tasks in the project stay, without a project.
    pub async fn delete(&mut self, id: &str) -> Result<(), AppError> {
        self.status.dismiss_error();
        let snapshot = self.projects.clone();
        self.projects.retain(|p| p.id != id);

        let result = self.state.projects().delete(id).await;
        if !self.active.is_active() {
            return Ok(());
        }
        if let Err(e) = result {
            self.projects = snapshot;
            self.status.fail(&e);
            return Err(e);
        }
        Ok(())
    }

    pub fn dismiss_error(&mut self) {
        self.status.dismiss_error();
    }
}

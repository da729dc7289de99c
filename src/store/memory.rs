use std::sync::{Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::project::sort_projects;
use crate::models::{NewTask, Project, Task, TaskPatch};
use crate::store::{TaskQuery, TaskStore};

/// In-process store with the same query semantics as the hosted tables.
///
/// Backs the offline development mode and the test suite. Failures can be
/// injected to exercise rollback paths.
#[derive(Default)]
pub struct MemoryStore {
    tasks: RwLock<Vec<Task>>,
    projects: RwLock<Vec<Project>>,
    fail_write: Mutex<Option<String>>,
    fail_read: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(tasks: Vec<Task>, projects: Vec<Project>) -> Self {
        Self {
            tasks: RwLock::new(tasks),
            projects: RwLock::new(projects),
            ..Self::default()
        }
    }

    /// The next write call fails with `AppError::Remote(message)`.
    pub fn fail_next_write(&self, message: impl Into<String>) {
        *self.fail_write.lock().unwrap_or_else(PoisonError::into_inner) = Some(message.into());
    }

    /// The next read call fails with `AppError::Remote(message)`.
    pub fn fail_next_read(&self, message: impl Into<String>) {
        *self.fail_read.lock().unwrap_or_else(PoisonError::into_inner) = Some(message.into());
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.tasks().into_iter().find(|t| t.id == id)
    }

    pub fn projects(&self) -> Vec<Project> {
        self.projects.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn check(slot: &Mutex<Option<String>>) -> Result<(), AppError> {
        match slot.lock().unwrap_or_else(PoisonError::into_inner).take() {
            Some(message) => Err(AppError::Remote(message)),
            None => Ok(()),
        }
    }

    fn check_write(&self) -> Result<(), AppError> {
        Self::check(&self.fail_write)
    }

    fn check_read(&self) -> Result<(), AppError> {
        Self::check(&self.fail_read)
    }

    /// Mirrors the `project:projects(id,name)` join.
    fn joined(&self, mut task: Task) -> Task {
        let projects = self.projects.read().unwrap_or_else(PoisonError::into_inner);
        task.project = task.project_id.as_ref().and_then(|id| {
            projects.iter().find(|p| &p.id == id).map(|p| Project {
                id: p.id.clone(),
                name: p.name.clone(),
                color: None,
            })
        });
        task
    }

    fn selected(&self, query: &TaskQuery) -> Vec<Task> {
        let mut found: Vec<Task> = self
            .tasks()
            .into_iter()
            .filter(|task| query.matches(task))
            .collect();
        found.sort_by(|a, b| query.compare(a, b));
        if let Some(limit) = query.limit {
            found.truncate(limit);
        }
        found
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn select_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>, AppError> {
        self.check_read()?;
        let found = self.selected(query);
        debug!("memory store selected {} tasks", found.len());
        Ok(found.into_iter().map(|task| self.joined(task)).collect())
    }

    async fn count_tasks(&self, query: &TaskQuery) -> Result<usize, AppError> {
        self.check_read()?;
        Ok(self.selected(query).len())
    }

    async fn fetch_task(&self, id: &str) -> Result<Option<Task>, AppError> {
        self.check_read()?;
        Ok(self.task(id).map(|task| self.joined(task)))
    }

    async fn insert_task(&self, task: &NewTask) -> Result<Task, AppError> {
        self.check_write()?;
        let created = Task {
            id: Uuid::new_v4().to_string(),
            title: task.title.clone(),
            task_type: task.task_type,
            priority: task.priority,
            status: task.status,
            due_date: task.due_date,
            work_days: task.work_days.clone(),
            project_id: task.project_id.clone(),
            project: None,
            notes: task.notes.clone(),
        };
        self.tasks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(created.clone());
        Ok(self.joined(created))
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Option<Task>, AppError> {
        self.check_write()?;
        let updated = {
            let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
            match tasks.iter_mut().find(|t| t.id == id) {
                Some(task) => {
                    patch.apply_to(task);
                    task.clone()
                }
                None => return Ok(None),
            }
        };
        Ok(Some(self.joined(updated)))
    }

    async fn delete_task(&self, id: &str) -> Result<bool, AppError> {
        self.check_write()?;
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        Ok(tasks.len() < before)
    }

    async fn list_projects(&self) -> Result<Vec<Project>, AppError> {
        self.check_read()?;
        let mut projects = self.projects();
        sort_projects(&mut projects);
        Ok(projects)
    }

    async fn count_projects(&self) -> Result<usize, AppError> {
        self.check_read()?;
        Ok(self.projects().len())
    }

    async fn insert_project(&self, name: &str, color: Option<&str>) -> Result<Project, AppError> {
        self.check_write()?;
        let project = Project {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            color: color.map(str::to_string),
        };
        self.projects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(project.clone());
        Ok(project)
    }

    async fn rename_project(&self, id: &str, name: &str) -> Result<Option<Project>, AppError> {
        self.check_write()?;
        let mut projects = self.projects.write().unwrap_or_else(PoisonError::into_inner);
        Ok(projects.iter_mut().find(|p| p.id == id).map(|project| {
            project.name = name.to_string();
            project.clone()
        }))
    }

    async fn delete_project(&self, id: &str) -> Result<bool, AppError> {
        self.check_write()?;
        let mut projects = self.projects.write().unwrap_or_else(PoisonError::into_inner);
        let before = projects.len();
        projects.retain(|p| p.id != id);
        Ok(projects.len() < before)
    }

    async fn detach_project(&self, project_id: &str) -> Result<usize, AppError> {
        self.check_write()?;
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        let mut detached = 0;
        for task in tasks.iter_mut() {
            if task.project_id.as_deref() == Some(project_id) {
                task.project_id = None;
                task.project = None;
                detached += 1;
            }
        }
        Ok(detached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewTaskRequest, TaskStatus};

    #[tokio::test]
    async fn test_insert_and_select_with_join() {
        let store = MemoryStore::new();
        let project = store.insert_project("Garden", None).await.expect("insert project");

        let req = NewTaskRequest {
            project_id: Some(project.id.clone()),
            ..NewTaskRequest::titled("Plant tomatoes")
        };
        let task = store
            .insert_task(&req.validate().expect("valid"))
            .await
            .expect("insert task");
        assert_eq!(task.status, TaskStatus::Inbox);
        assert_eq!(task.project_name(), Some("Garden"));

        let inbox = store
            .select_tasks(&TaskQuery::new().status(TaskStatus::Inbox))
            .await
            .expect("select");
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].id, task.id);
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let store = MemoryStore::new();
        store.fail_next_write("offline");
        let err = store.insert_project("Garden", None).await.expect_err("should fail");
        assert_eq!(err, AppError::Remote("offline".to_string()));
        assert!(store.insert_project("Garden", None).await.is_ok());
    }

    #[tokio::test]
    async fn test_detach_project_clears_references() {
        let store = MemoryStore::new();
        let project = store.insert_project("Garden", None).await.expect("insert project");
        let req = NewTaskRequest {
            project_id: Some(project.id.clone()),
            ..NewTaskRequest::titled("Water")
        };
        let task = store
            .insert_task(&req.validate().expect("valid"))
            .await
            .expect("insert task");

        assert_eq!(store.detach_project(&project.id).await.expect("detach"), 1);
        assert_eq!(store.task(&task.id).and_then(|t| t.project_id), None);
    }
}

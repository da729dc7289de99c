//! Page-level view state.
//!
//! Each view owns the lists a page renders and applies user actions to them.
//! Mutations are applied locally first and submitted afterwards; a rejected
//! write restores the list exactly as it was before the action.

pub mod all;
pub mod detail;
pub mod done;
pub mod home;
pub mod inbox;
pub mod projects;
pub mod today;
pub mod week;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::error::AppError;
use crate::models::{Project, Task, TaskPatch, TaskType};
use crate::services::TaskService;
use crate::session::Session;
use crate::state::AppState;
use crate::store::TaskQuery;

pub use all::{AllTasksFilters, AllTasksView};
pub use detail::TaskDetailView;
pub use done::{DoneFilters, DoneView};
pub use home::{HomeView, NavSummary, NavSummaryView};
pub use inbox::InboxView;
pub use projects::ProjectsView;
pub use today::TodayView;
pub use week::{DragItem, DragState, DropEffect, WeekView};

pub const LOGIN_REQUIRED_MESSAGE: &str = "Accedi per continuare.";

/// Cleared when the page goes away.
///
/// Requests already in flight still complete, but their results are
/// dropped instead of being applied.
#[derive(Debug, Clone)]
pub struct ActiveFlag(Arc<AtomicBool>);

impl ActiveFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn deactivate(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for ActiveFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Page-level loading and error state.
///
/// Session failures block the page: the message stays until the next load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageStatus {
    pub loading: bool,
    pub login_required: bool,
    pub blocked: bool,
    pub error: Option<String>,
}

impl PageStatus {
    pub(crate) fn begin(&mut self) {
        self.loading = true;
        self.login_required = false;
        self.blocked = false;
        self.error = None;
    }

    pub(crate) fn finish(&mut self) {
        self.loading = false;
    }

    pub(crate) fn fail(&mut self, e: &AppError) {
        self.loading = false;
        self.blocked = e.is_blocking();
        match e {
            AppError::LoginRequired => {
                self.login_required = true;
                self.error = Some(LOGIN_REQUIRED_MESSAGE.to_string());
            }
            other => self.error = Some(other.to_string()),
        }
    }

    /// Clears an inline message; a blocking one stays.
    pub fn dismiss_error(&mut self) {
        if !self.blocked {
            self.error = None;
        }
    }
}

/// Every page establishes a session before its first read.
pub(crate) async fn establish_session(state: &AppState) -> Result<Session, AppError> {
    state.sessions.require_session().await
}

/// Session first, then the page's tasks and the project list side by side.
pub(crate) async fn load_tasks_and_projects(
    state: &AppState,
    query: &TaskQuery,
) -> Result<(Vec<Task>, Vec<Project>), AppError> {
    establish_session(state).await?;
    let tasks = state.tasks();
    let projects = state.projects();
    let (tasks, projects) = tokio::join!(tasks.list(query), projects.list());
    Ok((tasks?, projects?))
}

/// Optimistically patches one task in `list` and submits the patch.
///
/// A task that stops satisfying `keep` leaves the list immediately. On
/// failure the list is restored to its snapshot. On success the stored row
/// replaces the local one. Nothing is touched once `active` is cleared.
pub(crate) async fn optimistic_update<F>(
    list: &mut Vec<Task>,
    id: &str,
    patch: &TaskPatch,
    tasks: &TaskService,
    active: &ActiveFlag,
    keep: F,
) -> Result<Option<Task>, AppError>
where
    F: Fn(&Task) -> bool,
{
    let snapshot = list.clone();
    let pos = list
        .iter()
        .position(|t| t.id == id)
        .ok_or(AppError::NotFound)?;
    patch.apply_to(&mut list[pos]);
    if !keep(&list[pos]) {
        list.remove(pos);
    }

    let result = tasks.update(id, patch).await;
    if !active.is_active() {
        return Ok(None);
    }
    match result {
        Ok(stored) => {
            reconcile(list, &stored, keep);
            Ok(Some(stored))
        }
        Err(e) => {
            *list = snapshot;
            Err(e)
        }
    }
}

/// Optimistically removes a task and deletes it remotely.
pub(crate) async fn optimistic_delete(
    list: &mut Vec<Task>,
    id: &str,
    tasks: &TaskService,
    active: &ActiveFlag,
) -> Result<(), AppError> {
    let snapshot = list.clone();
    list.retain(|t| t.id != id);

    let result = tasks.delete(id).await;
    if !active.is_active() {
        return Ok(());
    }
    if let Err(e) = result {
        *list = snapshot;
        return Err(e);
    }
    Ok(())
}

pub(crate) fn reconcile<F>(list: &mut Vec<Task>, stored: &Task, keep: F)
where
    F: Fn(&Task) -> bool,
{
    if let Some(pos) = list.iter().position(|t| t.id == stored.id) {
        if keep(stored) {
            list[pos] = stored.clone();
        } else {
            list.remove(pos);
        }
    }
}

/// Work and personal sections, in list order.
pub fn split_by_type(tasks: &[Task]) -> (Vec<&Task>, Vec<&Task>) {
    tasks.iter().partition(|t| t.task_type == TaskType::Work)
}

/// Records a failed action on the page unless the page is gone.
pub(crate) fn record<T>(
    status: &mut PageStatus,
    active: &ActiveFlag,
    result: Result<T, AppError>,
) -> Result<T, AppError> {
    if let Err(e) = &result {
        if active.is_active() {
            status.fail(e);
        }
    }
    result
}

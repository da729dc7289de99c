use axum::extract::{Path, Query};
use axum::routing::{patch, post};
use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates;
use crate::error::AppError;
use crate::models::*;
use crate::session::{SessionMode, SessionUser};
use crate::state::AppState;
use crate::views::{
    AllTasksFilters, AllTasksView, DoneFilters, DoneView, DragItem, DropEffect, HomeView,
    InboxView, NavSummary, ProjectsView, TaskDetailView, TodayView, WeekView,
};

#[derive(Deserialize)]
struct WeekParams {
    #[serde(default, deserialize_with = "dates::deserialize_optional_date")]
    start: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct ScheduleRequest {
    #[serde(deserialize_with = "dates::deserialize_date_list")]
    days: Vec<NaiveDate>,
}

/// A finished drag gesture on the week board.
#[derive(Deserialize)]
struct DragRequest {
    #[serde(default, deserialize_with = "dates::deserialize_optional_date")]
    week: Option<NaiveDate>,
    item: DragItem,
    /// `None` when the card was released outside every column.
    #[serde(default, deserialize_with = "dates::deserialize_optional_date")]
    target: Option<NaiveDate>,
    #[serde(default)]
    effect: DropEffect,
    /// Dropped on the unplanned area instead of a column.
    #[serde(default)]
    unscheduled: bool,
}

#[derive(Deserialize)]
struct MagicLinkRequest {
    email: String,
}

#[derive(Deserialize)]
struct CallbackRequest {
    token_hash: String,
}

#[derive(Serialize)]
struct SessionInfo {
    mode: SessionMode,
    user: Option<SessionUser>,
}

#[derive(Serialize)]
struct WeekPage<'a> {
    label: String,
    days: Vec<NaiveDate>,
    #[serde(flatten)]
    view: &'a WeekView,
}

impl<'a> WeekPage<'a> {
    fn of(view: &'a WeekView) -> Self {
        Self {
            label: view.label(),
            days: view.days(),
            view,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/home", get(home))
        .route("/summary", get(summary))
        .route("/inbox", get(inbox))
        .route("/today", get(today))
        .route("/week", get(week))
        .route("/week/drag", post(week_drag))
        .route("/done", get(done))
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/{id}",
            get(task_detail).patch(save_task).delete(delete_task),
        )
        .route("/tasks/{id}/complete", post(complete_task))
        .route("/tasks/{id}/reopen", post(reopen_task))
        .route("/tasks/{id}/today", post(send_task_to_today))
        .route("/tasks/{id}/inbox", post(send_task_to_inbox))
        .route("/tasks/{id}/snooze", post(snooze_task))
        .route("/tasks/{id}/schedule", post(schedule_task))
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{id}",
            patch(rename_project).delete(delete_project),
        )
        .route("/auth/session", get(session_info))
        .route("/auth/magic-link", post(send_magic_link))
        .route("/auth/callback", post(auth_callback))
        .route("/auth/sign-out", post(sign_out))
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn home(State(state): State<AppState>) -> Result<Json<HomeView>, AppError> {
    let mut view = HomeView::new(state);
    view.load().await?;
    Ok(Json(view))
}

async fn summary(State(state): State<AppState>) -> Result<Json<NavSummary>, AppError> {
    state.sessions.require_session().await?;
    let summary = NavSummary::load(&state, dates::today()).await?;
    Ok(Json(summary))
}

async fn inbox(State(state): State<AppState>) -> Result<Json<InboxView>, AppError> {
    let mut view = InboxView::new(state);
    view.load().await?;
    Ok(Json(view))
}

async fn today(State(state): State<AppState>) -> Result<Json<TodayView>, AppError> {
    let mut view = TodayView::new(state);
    view.load().await?;
    Ok(Json(view))
}

async fn week(
    State(state): State<AppState>,
    Query(params): Query<WeekParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut view = WeekView::new(state);
    if let Some(start) = params.start {
        view = view.at_week(start);
    }
    view.load().await?;
    Ok(Json(serde_json::to_value(WeekPage::of(&view))?))
}

async fn week_drag(
    State(state): State<AppState>,
    Json(req): Json<DragRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut view = WeekView::new(state);
    if let Some(week) = req.week {
        view = view.at_week(week);
    }
    view.load().await?;

    view.begin_drag(req.item);
    if req.unscheduled {
        view.drop_on_unscheduled().await?;
    } else if let Some(target) = req.target {
        view.drop_on(target, req.effect).await?;
    }
    view.end_drag().await?;
    Ok(Json(serde_json::to_value(WeekPage::of(&view))?))
}

async fn done(
    State(state): State<AppState>,
    Query(filters): Query<DoneFilters>,
) -> Result<Json<DoneView>, AppError> {
    let mut view = DoneView::new(state);
    view.set_filters(filters).await?;
    Ok(Json(view))
}

async fn list_tasks(
    State(state): State<AppState>,
    Query(filters): Query<AllTasksFilters>,
) -> Result<Json<AllTasksView>, AppError> {
    let mut view = AllTasksView::new(state);
    view.set_filters(filters).await?;
    Ok(Json(view))
}

async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<NewTaskRequest>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    state.sessions.require_session().await?;
    let task = state.tasks().create(req).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn task_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TaskDetailView>, AppError> {
    let mut view = TaskDetailView::new(state, id);
    view.load().await?;
    Ok(Json(view))
}

async fn save_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(draft): Json<TaskDraft>,
) -> Result<Json<Task>, AppError> {
    state.sessions.require_session().await?;
    let task = state.tasks().save(&id, draft).await?;
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.sessions.require_session().await?;
    state.tasks().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn complete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, AppError> {
    state.sessions.require_session().await?;
    Ok(Json(state.tasks().complete(&id).await?))
}

async fn reopen_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, AppError> {
    state.sessions.require_session().await?;
    Ok(Json(state.tasks().reopen(&id).await?))
}

async fn send_task_to_today(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, AppError> {
    state.sessions.require_session().await?;
    Ok(Json(state.tasks().send_to_today(&id, dates::today()).await?))
}

async fn send_task_to_inbox(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, AppError> {
    state.sessions.require_session().await?;
    Ok(Json(state.tasks().send_to_inbox(&id).await?))
}

async fn snooze_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, AppError> {
    state.sessions.require_session().await?;
    Ok(Json(state.tasks().snooze(&id).await?))
}

async fn schedule_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ScheduleRequest>,
) -> Result<Json<Task>, AppError> {
    state.sessions.require_session().await?;
    Ok(Json(state.tasks().schedule(&id, req.days).await?))
}

async fn list_projects(State(state): State<AppState>) -> Result<Json<ProjectsView>, AppError> {
    let mut view = ProjectsView::new(state);
    view.load().await?;
    Ok(Json(view))
}

async fn create_project(
    State(state): State<AppState>,
    Json(req): Json<NewProjectRequest>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    state.sessions.require_session().await?;
    let project = state.projects().create(req).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn rename_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RenameProjectRequest>,
) -> Result<Json<Project>, AppError> {
    state.sessions.require_session().await?;
    Ok(Json(state.projects().rename(&id, &req.name).await?))
}

async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.sessions.require_session().await?;
    state.projects().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn session_info(State(state): State<AppState>) -> Result<Json<SessionInfo>, AppError> {
    let session = state.sessions.ensure_session().await?;
    Ok(Json(SessionInfo {
        mode: state.sessions.mode(),
        user: session.map(|s| s.user),
    }))
}

async fn send_magic_link(
    State(state): State<AppState>,
    Json(req): Json<MagicLinkRequest>,
) -> Result<StatusCode, AppError> {
    state.sessions.send_magic_link(&req.email).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn auth_callback(
    State(state): State<AppState>,
    Json(req): Json<CallbackRequest>,
) -> Result<Json<SessionUser>, AppError> {
    let session = state.sessions.complete_magic_link(&req.token_hash).await?;
    Ok(Json(session.user))
}

async fn sign_out(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.sessions.sign_out().await?;
    Ok(StatusCode::NO_CONTENT)
}

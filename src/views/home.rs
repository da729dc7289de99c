use chrono::NaiveDate;
use serde::Serialize;

use crate::dates::{self, add_days, start_of_week};
use crate::error::AppError;
use crate::events::TaskSubscription;
use crate::models::{NewTaskRequest, Project, Task, TaskStatus};
use crate::session::SessionUser;
use crate::state::AppState;
use crate::store::{Column, Filter, TaskQuery};
use crate::views::inbox::{TOAST_INBOX, TOAST_SCHEDULED};
use crate::views::{ActiveFlag, PageStatus, record};

pub const UPCOMING_LIMIT: usize = 5;

/// Landing page: who is signed in, what is due next, quick capture.
#[derive(Serialize)]
pub struct HomeView {
    #[serde(skip)]
    state: AppState,
    #[serde(skip)]
    active: ActiveFlag,
    pub status: PageStatus,
    pub user: Option<SessionUser>,
    pub upcoming: Vec<Task>,
    pub projects: Vec<Project>,
    pub toast: Option<String>,
}

impl HomeView {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            active: ActiveFlag::new(),
            status: PageStatus::default(),
            user: None,
            upcoming: Vec::new(),
            projects: Vec::new(),
            toast: None,
        }
    }

    pub fn upcoming_query() -> TaskQuery {
        TaskQuery::new()
            .status(TaskStatus::Open)
            .filter(Filter::DueDateSet)
            .asc(Column::DueDate)
            .limit(UPCOMING_LIMIT)
    }

    pub fn active_flag(&self) -> ActiveFlag {
        self.active.clone()
    }

    /// Without a session the page still renders, as a sign-in prompt.
    pub async fn load(&mut self) -> Result<(), AppError> {
        self.status.begin();
        let session = self.state.sessions.ensure_session().await;
        if !self.active.is_active() {
            return Ok(());
        }
        let Some(session) = record(&mut self.status, &self.active, session)? else {
            self.user = None;
            self.status.login_required = true;
            self.status.finish();
            return Ok(());
        };
        self.user = Some(session.user);

        let upcoming_query = Self::upcoming_query();
        let tasks = self.state.tasks();
        let projects = self.state.projects();
        let (upcoming, projects) = tokio::join!(tasks.list(&upcoming_query), projects.list());
        if !self.active.is_active() {
            return Ok(());
        }
        self.upcoming = record(&mut self.status, &self.active, upcoming)?;
        self.projects = record(&mut self.status, &self.active, projects)?;
        self.status.finish();
        Ok(())
    }

    pub async fn quick_capture(&mut self, req: NewTaskRequest) -> Result<Task, AppError> {
        self.status.dismiss_error();
        self.toast = None;
        let result = self.state.tasks().create(req).await;
        let task = record(&mut self.status, &self.active, result)?;
        if self.active.is_active() {
            self.toast = Some(match task.status {
                TaskStatus::Inbox => TOAST_INBOX.to_string(),
                _ => TOAST_SCHEDULED.to_string(),
            });
        }
        Ok(task)
    }

    pub async fn sign_out(&mut self) -> Result<(), AppError> {
        let result = self.state.sessions.sign_out().await;
        self.user = None;
        self.upcoming.clear();
        record(&mut self.status, &self.active, result)
    }

    pub fn dismiss_error(&mut self) {
        self.status.dismiss_error();
    }
}

/// Counters shown in the navigation bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NavSummary {
    pub inbox: usize,
    pub today: usize,
    /// Open tasks planned in the seven days from Monday.
    pub week: usize,
    /// Not done and past due.
    pub overdue: usize,
    pub projects: usize,
}

impl NavSummary {
    pub async fn load(state: &AppState, today: NaiveDate) -> Result<Self, AppError> {
        let week_start = start_of_week(today);
        let week: Vec<NaiveDate> = (0..7).map(|i| add_days(week_start, i)).collect();

        let inbox_query = TaskQuery::new().status(TaskStatus::Inbox);
        let today_query = TaskQuery::new().status(TaskStatus::Open).scheduled_on(today);
        let week_query = TaskQuery::new().status(TaskStatus::Open).scheduled_within(week);
        let overdue_query = TaskQuery::new()
            .filter(Filter::StatusNot(TaskStatus::Done))
            .filter(Filter::DueBefore(today));

        let tasks = state.tasks();
        let projects = state.projects();
        let (inbox, today, week, overdue, projects) = tokio::join!(
            tasks.count(&inbox_query),
            tasks.count(&today_query),
            tasks.count(&week_query),
            tasks.count(&overdue_query),
            projects.count(),
        );

        Ok(Self {
            inbox: inbox?,
            today: today?,
            week: week?,
            overdue: overdue?,
            projects: projects?,
        })
    }

    pub fn has_overdue(&self) -> bool {
        self.overdue > 0
    }
}

/// Keeps a [`NavSummary`] current by listening for change events.
pub struct NavSummaryView {
    state: AppState,
    subscription: TaskSubscription,
    today: NaiveDate,
    pub summary: Option<NavSummary>,
}

impl NavSummaryView {
    pub fn new(state: AppState) -> Self {
        Self::on(state, dates::today())
    }

    pub fn on(state: AppState, today: NaiveDate) -> Self {
        let subscription = state.events.subscribe();
        Self {
            state,
            subscription,
            today,
            summary: None,
        }
    }

    /// No counts are shown until a session exists.
    pub async fn load(&mut self) -> Result<Option<NavSummary>, AppError> {
        if self.state.sessions.ensure_session().await?.is_none() {
            self.summary = None;
            return Ok(None);
        }
        let summary = NavSummary::load(&self.state, self.today).await?;
        self.summary = Some(summary);
        Ok(self.summary)
    }

    /// Reloads only if something changed since the last look.
    pub async fn refresh_if_changed(&mut self) -> Result<bool, AppError> {
        if !self.subscription.drain() {
            return Ok(false);
        }
        self.load().await?;
        Ok(true)
    }
}

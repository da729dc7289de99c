//! Monday to Friday board with drag-and-drop planning.
//!
//! Two kinds of cards can be dragged: a task's chip in one day column, and a
//! deadline chip. Dropping moves them; releasing a card anywhere that is not
//! a drop target takes it off the board (the day is removed from the plan,
//! or the deadline is cleared).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{self, DisplayOptions, add_days, display_date, start_of_week};
use crate::error::AppError;
use crate::models::{Task, TaskPatch, TaskStatus};
use crate::scheduling;
use crate::state::AppState;
use crate::store::{Column, Filter, TaskQuery};
use crate::views::{
    ActiveFlag, PageStatus, establish_session, optimistic_update, reconcile, record,
};

pub const BOARD_DAYS: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DragItem {
    /// A task card picked up from the `origin` column.
    Task {
        id: String,
        #[serde(deserialize_with = "dates::deserialize_date")]
        origin: NaiveDate,
    },
    Deadline { id: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DragState {
    #[default]
    Idle,
    Dragging { item: DragItem, drop_handled: bool },
}

/// What a task drop does to the plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropEffect {
    /// The origin day is replaced by the target day.
    #[default]
    Move,
    /// The target day is added; the origin stays planned.
    Copy,
}

#[derive(Serialize)]
pub struct WeekView {
    #[serde(skip)]
    state: AppState,
    #[serde(skip)]
    active: ActiveFlag,
    pub today: NaiveDate,
    pub week_start: NaiveDate,
    pub status: PageStatus,
    pub planned: Vec<Task>,
    pub deadlines: Vec<Task>,
    pub drag: DragState,
}

impl WeekView {
    pub fn new(state: AppState) -> Self {
        Self::on(state, dates::today())
    }

    pub fn on(state: AppState, today: NaiveDate) -> Self {
        Self {
            state,
            active: ActiveFlag::new(),
            today,
            week_start: start_of_week(today),
            status: PageStatus::default(),
            planned: Vec::new(),
            deadlines: Vec::new(),
            drag: DragState::Idle,
        }
    }

    /// Shows the week containing `day`.
    pub fn at_week(mut self, day: NaiveDate) -> Self {
        self.week_start = start_of_week(day);
        self
    }

    pub fn active_flag(&self) -> ActiveFlag {
        self.active.clone()
    }

    pub fn days(&self) -> Vec<NaiveDate> {
        (0..BOARD_DAYS).map(|i| add_days(self.week_start, i)).collect()
    }

    pub fn week_end(&self) -> NaiveDate {
        add_days(self.week_start, BOARD_DAYS - 1)
    }

    pub fn label(&self) -> String {
        format!(
            "Dal {} al {}",
            display_date(self.week_start, DisplayOptions::with_year()),
            display_date(self.week_end(), DisplayOptions::with_year())
        )
    }

    pub fn planned_query(&self) -> TaskQuery {
        TaskQuery::new()
            .status(TaskStatus::Open)
            .scheduled_within(self.days())
            .asc(Column::WorkDays)
            .asc(Column::Priority)
    }

    pub fn deadline_query(&self) -> TaskQuery {
        TaskQuery::new()
            .filter(Filter::StatusNot(TaskStatus::Done))
            .filter(Filter::DueDateSet)
            .filter(Filter::DueFrom(self.week_start))
            .filter(Filter::DueUntil(self.week_end()))
            .asc(Column::DueDate)
            .asc(Column::Priority)
    }

    pub async fn load(&mut self) -> Result<(), AppError> {
        self.status.begin();
        let result = self.fetch().await;
        if !self.active.is_active() {
            return Ok(());
        }
        let (planned, deadlines) = record(&mut self.status, &self.active, result)?;
        self.planned = planned;
        self.deadlines = deadlines;
        self.status.finish();
        Ok(())
    }

    async fn fetch(&self) -> Result<(Vec<Task>, Vec<Task>), AppError> {
        establish_session(&self.state).await?;
        let tasks = self.state.tasks();
        let (planned_query, deadline_query) = (self.planned_query(), self.deadline_query());
        let (planned, deadlines) =
            tokio::join!(tasks.list(&planned_query), tasks.list(&deadline_query));
        Ok((planned?, deadlines?))
    }

    pub async fn previous_week(&mut self) -> Result<(), AppError> {
        self.week_start = add_days(self.week_start, -7);
        self.load().await
    }

    pub async fn next_week(&mut self) -> Result<(), AppError> {
        self.week_start = add_days(self.week_start, 7);
        self.load().await
    }

    pub async fn this_week(&mut self) -> Result<(), AppError> {
        self.week_start = start_of_week(self.today);
        self.load().await
    }

    pub fn is_today(&self, day: NaiveDate) -> bool {
        day == self.today
    }

    pub fn tasks_for(&self, day: NaiveDate) -> Vec<&Task> {
        self.planned
            .iter()
            .filter(|t| t.status == TaskStatus::Open && t.is_scheduled_on(day))
            .collect()
    }

    pub fn deadlines_for(&self, day: NaiveDate) -> Vec<&Task> {
        self.deadlines
            .iter()
            .filter(|t| t.due_date == Some(day))
            .collect()
    }

    pub fn begin_drag(&mut self, item: DragItem) {
        self.drag = DragState::Dragging {
            item,
            drop_handled: false,
        };
    }

    pub fn begin_drag_task(&mut self, id: &str, origin: NaiveDate) {
        self.begin_drag(DragItem::Task {
            id: id.to_string(),
            origin,
        });
    }

    pub fn begin_drag_deadline(&mut self, id: &str) {
        self.begin_drag(DragItem::Deadline { id: id.to_string() });
    }

    fn take_drop(&mut self) -> Option<DragItem> {
        match &mut self.drag {
            DragState::Dragging { item, drop_handled } => {
                *drop_handled = true;
                Some(item.clone())
            }
            DragState::Idle => None,
        }
    }

    /// Drop on a day column.
    pub async fn drop_on(&mut self, day: NaiveDate, effect: DropEffect) -> Result<(), AppError> {
        match self.take_drop() {
            Some(DragItem::Task { id, origin }) => {
                let patch = {
                    let task = self.find_planned(&id)?;
                    match effect {
                        DropEffect::Move => scheduling::move_work_day(task, origin, day),
                        DropEffect::Copy => Some(scheduling::add_work_day(task, day)),
                    }
                };
                match patch {
                    Some(patch) => self.apply_planned(&id, patch).await,
                    None => Ok(()),
                }
            }
            Some(DragItem::Deadline { id }) => self.move_deadline(&id, day).await,
            None => Ok(()),
        }
    }

    /// Drop on the "unplanned" area: tasks go back to the inbox.
    pub async fn drop_on_unscheduled(&mut self) -> Result<(), AppError> {
        match self.take_drop() {
            Some(DragItem::Task { id, .. }) => {
                self.find_planned(&id)?;
                self.apply_planned(&id, scheduling::move_to_inbox()).await
            }
            Some(DragItem::Deadline { id }) => self.clear_deadline(&id).await,
            None => Ok(()),
        }
    }

    /// Drag end. A card released without a drop leaves the board.
    pub async fn end_drag(&mut self) -> Result<(), AppError> {
        match std::mem::take(&mut self.drag) {
            DragState::Dragging {
                item,
                drop_handled: false,
            } => match item {
                DragItem::Task { id, origin } => self.remove_day(&id, origin).await,
                DragItem::Deadline { id } => self.clear_deadline(&id).await,
            },
            _ => Ok(()),
        }
    }

    pub async fn remove_day(&mut self, id: &str, day: NaiveDate) -> Result<(), AppError> {
        let patch = scheduling::remove_work_day(self.find_planned(id)?, day);
        match patch {
            Some(patch) => self.apply_planned(id, patch).await,
            None => Ok(()),
        }
    }

    pub async fn move_deadline(&mut self, id: &str, day: NaiveDate) -> Result<(), AppError> {
        let patch = {
            let chip = self
                .deadlines
                .iter()
                .find(|t| t.id == id)
                .ok_or(AppError::NotFound)?;
            scheduling::move_deadline(chip, day)
        };
        let Some(patch) = patch else {
            return Ok(());
        };
        self.status.dismiss_error();

        let planned_snapshot = self.planned.clone();
        for task in self.planned.iter_mut().filter(|t| t.id == id) {
            patch.apply_to(task);
        }

        let deadline_query = self.deadline_query();
        let tasks = self.state.tasks();
        let result = optimistic_update(
            &mut self.deadlines,
            id,
            &patch,
            &tasks,
            &self.active,
            |t| deadline_query.matches(t),
        )
        .await;
        match result {
            Ok(Some(stored)) => {
                let planned_query = self.planned_query();
                reconcile(&mut self.planned, &stored, |t| planned_query.matches(t));
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                self.planned = planned_snapshot;
                self.status.fail(&e);
                Err(e)
            }
        }
    }

    /// Clears a deadline; on failure the chip comes back first in the list.
    pub async fn clear_deadline(&mut self, id: &str) -> Result<(), AppError> {
        let Some(chip) = self.deadlines.iter().find(|t| t.id == id).cloned() else {
            return Ok(());
        };
        let Some(patch) = scheduling::clear_deadline(&chip) else {
            return Ok(());
        };
        self.status.dismiss_error();

        self.deadlines.retain(|t| t.id != id);
        for task in self.planned.iter_mut().filter(|t| t.id == id) {
            task.due_date = None;
        }

        let result = self.state.tasks().update(id, &patch).await;
        if !self.active.is_active() {
            return Ok(());
        }
        match result {
            Ok(stored) => {
                let planned_query = self.planned_query();
                reconcile(&mut self.planned, &stored, |t| planned_query.matches(t));
                Ok(())
            }
            Err(e) => {
                for task in self.planned.iter_mut().filter(|t| t.id == id) {
                    task.due_date = chip.due_date;
                }
                self.deadlines.insert(0, chip);
                self.status.fail(&e);
                Err(e)
            }
        }
    }

    fn find_planned(&self, id: &str) -> Result<&Task, AppError> {
        self.planned
            .iter()
            .find(|t| t.id == id)
            .ok_or(AppError::NotFound)
    }

    async fn apply_planned(&mut self, id: &str, patch: TaskPatch) -> Result<(), AppError> {
        self.status.dismiss_error();
        let planned_query = self.planned_query();
        let tasks = self.state.tasks();
        let result = optimistic_update(
            &mut self.planned,
            id,
            &patch,
            &tasks,
            &self.active,
            |t| planned_query.matches(t),
        )
        .await;
        let stored = record(&mut self.status, &self.active, result)?;
        if let Some(stored) = stored {
            let deadline_query = self.deadline_query();
            reconcile(&mut self.deadlines, &stored, |t| deadline_query.matches(t));
        }
        Ok(())
    }

    pub fn dismiss_error(&mut self) {
        self.status.dismiss_error();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_iso_date;
    use std::sync::Arc;

    use crate::store::MemoryStore;

    fn d(s: &str) -> NaiveDate {
        parse_iso_date(s).expect("valid date")
    }

    fn view() -> WeekView {
        WeekView::on(AppState::offline(Arc::new(MemoryStore::new())), d("2024-03-06"))
    }

    #[test]
    fn test_board_covers_monday_to_friday() {
        let view = view();
        assert_eq!(view.week_start, d("2024-03-04"));
        assert_eq!(view.days().len(), 5);
        assert_eq!(view.week_end(), d("2024-03-08"));
        assert_eq!(view.label(), "Dal 04 mar 2024 al 08 mar 2024");
    }

    #[test]
    fn test_drag_state_transitions() {
        let mut view = view();
        view.begin_drag_deadline("t1");
        assert_eq!(
            view.take_drop(),
            Some(DragItem::Deadline { id: "t1".to_string() })
        );
        assert!(matches!(view.drag, DragState::Dragging { drop_handled: true, .. }));
    }

    #[tokio::test]
    async fn test_end_drag_while_idle_is_noop() {
        let mut view = view();
        view.end_drag().await.expect("noop");
        assert_eq!(view.drag, DragState::Idle);
    }
}

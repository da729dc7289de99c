//! Status and work-day transitions.
//!
//! Every function here is pure: it looks at the current [`Task`] and returns
//! the [`TaskPatch`] to write, or `None` when the move changes nothing. The
//! inbox invariant lives here: a task never sits in `INBOX` with work days.

use chrono::NaiveDate;

use crate::error::AppError;
use crate::models::{Task, TaskPatch, TaskStatus, WorkDays};

/// Replaces the work-day set, promoting an inbox task once it has days.
pub fn set_work_days<I>(task: &Task, days: I) -> TaskPatch
where
    I: IntoIterator<Item = NaiveDate>,
{
    let days = WorkDays::normalize(days);
    let mut patch = TaskPatch::default();
    if task.status == TaskStatus::Inbox && days.is_some() {
        patch.status = Some(TaskStatus::Open);
    }
    patch.work_days(days)
}

/// Plans an inbox task onto the selected days.
pub fn schedule<I>(days: I) -> Result<TaskPatch, AppError>
where
    I: IntoIterator<Item = NaiveDate>,
{
    let days = WorkDays::normalize(days)
        .ok_or_else(|| AppError::validation("Select at least one day to schedule"))?;
    Ok(TaskPatch::default()
        .status(TaskStatus::Open)
        .work_days(Some(days)))
}

pub fn add_work_day(task: &Task, day: NaiveDate) -> TaskPatch {
    let days = match &task.work_days {
        Some(days) => days.with(day),
        None => WorkDays::single(day),
    };
    TaskPatch::default()
        .status(TaskStatus::Open)
        .work_days(Some(days))
}

/// Moves one scheduled day to another; `None` when source and target match.
pub fn move_work_day(task: &Task, from: NaiveDate, to: NaiveDate) -> Option<TaskPatch> {
    if from == to {
        return None;
    }
    let remaining = task.work_days.as_ref().and_then(|days| days.without(from));
    let days = match remaining {
        Some(days) => days.with(to),
        None => WorkDays::single(to),
    };
    Some(
        TaskPatch::default()
            .status(TaskStatus::Open)
            .work_days(Some(days)),
    )
}

/// Drops a single day; the last day leaving sends the task back to the inbox.
pub fn remove_work_day(task: &Task, day: NaiveDate) -> Option<TaskPatch> {
    let days = task.work_days.as_ref()?;
    if !days.contains(day) {
        return None;
    }
    match days.without(day) {
        Some(rest) => Some(TaskPatch::default().work_days(Some(rest))),
        None => Some(move_to_inbox()),
    }
}

pub fn move_to_inbox() -> TaskPatch {
    TaskPatch::default()
        .status(TaskStatus::Inbox)
        .work_days(None)
}

/// Adds `day` to the plan and reopens the task, e.g. "do it today".
pub fn send_to_day(task: &Task, day: NaiveDate) -> TaskPatch {
    add_work_day(task, day)
}

/// Pushes every planned day forward by one.
pub fn snooze(task: &Task) -> Option<TaskPatch> {
    let days = task.work_days.as_ref()?;
    Some(TaskPatch::default().work_days(Some(days.shifted(1))))
}

pub fn move_deadline(task: &Task, day: NaiveDate) -> Option<TaskPatch> {
    if task.due_date == Some(day) {
        return None;
    }
    Some(TaskPatch::default().due_date(Some(day)))
}

pub fn clear_deadline(task: &Task) -> Option<TaskPatch> {
    task.due_date?;
    Some(TaskPatch::default().due_date(None))
}

/// Completion archives the task: it stays stored with status `DONE`.
pub fn complete() -> TaskPatch {
    TaskPatch::default().status(TaskStatus::Done)
}

pub fn reopen(task: &Task) -> TaskPatch {
    let status = if task.has_work_days() {
        TaskStatus::Open
    } else {
        TaskStatus::Inbox
    };
    TaskPatch::default().status(status)
}

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::dates;
use crate::error::AppError;
use crate::models::patch::TaskPatch;
use crate::models::project::Project;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskType {
    #[default]
    Work,
    Personal,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    P0,
    P1,
    #[default]
    P2,
    P3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Inbox,
    Open,
    Done,
}

impl TaskType {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Work => "WORK",
            TaskType::Personal => "PERSONAL",
        }
    }
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::P0 => "P0",
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
        }
    }
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Inbox => "INBOX",
            TaskStatus::Open => "OPEN",
            TaskStatus::Done => "DONE",
        }
    }
}

/// The days a task is planned to be worked on.
///
/// Always sorted ascending, free of duplicates and non-empty: an empty set
/// is represented as `Option::<WorkDays>::None` by the callers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct WorkDays(Vec<NaiveDate>);

impl WorkDays {
    pub fn normalize<I>(days: I) -> Option<Self>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let mut days: Vec<NaiveDate> = days.into_iter().collect();
        if days.is_empty() {
            return None;
        }
        days.sort();
        days.dedup();
        Some(Self(days))
    }

    pub fn single(day: NaiveDate) -> Self {
        Self(vec![day])
    }

    pub fn days(&self) -> &[NaiveDate] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &NaiveDate> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.0.binary_search(&day).is_ok()
    }

    pub fn contains_all(&self, days: &[NaiveDate]) -> bool {
        days.iter().all(|day| self.contains(*day))
    }

    pub fn overlaps(&self, days: &[NaiveDate]) -> bool {
        days.iter().any(|day| self.contains(*day))
    }

    pub fn with(&self, day: NaiveDate) -> Self {
        let mut days = self.0.clone();
        if let Err(pos) = days.binary_search(&day) {
            days.insert(pos, day);
        }
        Self(days)
    }

    pub fn without(&self, day: NaiveDate) -> Option<Self> {
        Self::normalize(self.0.iter().copied().filter(|d| *d != day))
    }

    pub fn shifted(&self, days: i64) -> Self {
        Self(self.0.iter().map(|d| dates::add_days(*d, days)).collect())
    }

    pub fn summary(&self) -> String {
        dates::format_work_days_summary(&self.0)
    }

    pub fn into_vec(self) -> Vec<NaiveDate> {
        self.0
    }
}

pub(crate) fn deserialize_work_days<'de, D>(deserializer: D) -> Result<Option<WorkDays>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<NaiveDate>>::deserialize(deserializer)?;
    Ok(raw.and_then(WorkDays::normalize))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(default)]
    pub priority: Priority,
    pub status: TaskStatus,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_work_days")]
    pub work_days: Option<WorkDays>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub project: Option<Project>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Task {
    pub fn has_work_days(&self) -> bool {
        self.work_days.is_some()
    }

    pub fn is_scheduled_on(&self, day: NaiveDate) -> bool {
        self.work_days.as_ref().is_some_and(|days| days.contains(day))
    }

    pub fn work_day_list(&self) -> Vec<NaiveDate> {
        self.work_days
            .as_ref()
            .map(|days| days.days().to_vec())
            .unwrap_or_default()
    }

    pub fn work_days_summary(&self) -> String {
        self.work_days.as_ref().map(WorkDays::summary).unwrap_or_default()
    }

    pub fn project_name(&self) -> Option<&str> {
        self.project.as_ref().map(|p| p.name.as_str())
    }
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn clean_title(title: &str) -> Result<String, AppError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("Title must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Task capture input, as filled in by the quick-capture and new-task forms.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTaskRequest {
    pub title: String,
    #[serde(rename = "type", default)]
    pub task_type: TaskType,
    #[serde(default)]
    pub priority: Option<Priority>,
    /// `None` lets the work days decide between `OPEN` and `INBOX`.
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "dates::deserialize_date_list")]
    pub work_days: Vec<NaiveDate>,
    #[serde(default, deserialize_with = "dates::deserialize_optional_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewTaskRequest {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn validate(self) -> Result<NewTask, AppError> {
        let title = clean_title(&self.title)?;
        let days = WorkDays::normalize(self.work_days);

        let (status, work_days) = match self.status {
            Some(TaskStatus::Done) => {
                return Err(AppError::validation("A new task cannot start completed"));
            }
            Some(TaskStatus::Inbox) => (TaskStatus::Inbox, None),
            Some(TaskStatus::Open) => (TaskStatus::Open, days),
            None if days.is_some() => (TaskStatus::Open, days),
            None => (TaskStatus::Inbox, None),
        };

        Ok(NewTask {
            title,
            task_type: self.task_type,
            priority: self.priority.unwrap_or_default(),
            status,
            work_days,
            due_date: self.due_date,
            project_id: clean_optional(self.project_id),
            notes: clean_optional(self.notes),
        })
    }
}

/// Validated insert payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTask {
    pub title: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub priority: Priority,
    pub status: TaskStatus,
    pub work_days: Option<WorkDays>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub project_id: Option<String>,
    pub notes: Option<String>,
}

/// Editable copy of a task, as held by the detail page form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "dates::deserialize_date_list")]
    pub work_days: Vec<NaiveDate>,
    #[serde(default, deserialize_with = "dates::deserialize_optional_date")]
    pub due_date: Option<NaiveDate>,
}

impl TaskDraft {
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            task_type: task.task_type,
            status: task.status,
            priority: task.priority,
            project_id: task.project_id.clone(),
            notes: task.notes.clone(),
            work_days: task.work_day_list(),
            due_date: task.due_date,
        }
    }

    /// Full-record patch for the detail page save.
    ///
    /// `INBOX` drops the work days; `DONE` is persisted as-is and keeps them.
    pub fn into_patch(self) -> Result<TaskPatch, AppError> {
        let title = clean_title(&self.title)?;
        let work_days = match self.status {
            TaskStatus::Inbox => None,
            _ => WorkDays::normalize(self.work_days),
        };

        Ok(TaskPatch {
            title: Some(title),
            task_type: Some(self.task_type),
            status: Some(self.status),
            priority: Some(self.priority),
            project_id: Some(clean_optional(self.project_id)),
            notes: Some(clean_optional(self.notes)),
            work_days: Some(work_days),
            due_date: Some(self.due_date),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_iso_date;

    fn d(s: &str) -> NaiveDate {
        parse_iso_date(s).expect("valid date")
    }

    #[test]
    fn test_work_days_normalize_sorts_and_dedupes() {
        let days = WorkDays::normalize([d("2024-03-06"), d("2024-03-04"), d("2024-03-06")])
            .expect("non-empty");
        assert_eq!(days.days(), &[d("2024-03-04"), d("2024-03-06")]);
    }

    #[test]
    fn test_work_days_normalize_is_idempotent_and_empty_is_none() {
        let once = WorkDays::normalize([d("2024-03-08"), d("2024-03-01"), d("2024-03-01")])
            .expect("non-empty");
        let twice = WorkDays::normalize(once.clone().into_vec()).expect("non-empty");
        assert_eq!(once, twice);
        assert_eq!(WorkDays::normalize(Vec::new()), None);
    }

    #[test]
    fn test_work_days_with_and_without() {
        let days = WorkDays::single(d("2024-03-05"));
        let more = days.with(d("2024-03-04")).with(d("2024-03-05"));
        assert_eq!(more.days(), &[d("2024-03-04"), d("2024-03-05")]);
        assert_eq!(more.without(d("2024-03-04")), Some(days.clone()));
        assert_eq!(days.without(d("2024-03-05")), None);
    }

    #[test]
    fn test_new_task_without_days_goes_to_inbox() {
        let task = NewTaskRequest::titled("  Buy milk ").validate().expect("valid");
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.status, TaskStatus::Inbox);
        assert_eq!(task.work_days, None);
        assert_eq!(task.priority, Priority::P2);
    }

    #[test]
    fn test_new_task_with_days_is_open() {
        let req = NewTaskRequest {
            work_days: vec![d("2024-03-05"), d("2024-03-04"), d("2024-03-05")],
            ..NewTaskRequest::titled("Write report")
        };
        let task = req.validate().expect("valid");
        assert_eq!(task.status, TaskStatus::Open);
        assert_eq!(
            task.work_days.map(WorkDays::into_vec),
            Some(vec![d("2024-03-04"), d("2024-03-05")])
        );
    }

    #[test]
    fn test_new_task_explicit_inbox_clears_days() {
        let req = NewTaskRequest {
            status: Some(TaskStatus::Inbox),
            work_days: vec![d("2024-03-05")],
            ..NewTaskRequest::titled("Later")
        };
        let task = req.validate().expect("valid");
        assert_eq!(task.status, TaskStatus::Inbox);
        assert_eq!(task.work_days, None);
    }

    #[test]
    fn test_new_task_rejects_blank_title_and_done() {
        let blank = NewTaskRequest::titled("   ").validate();
        assert!(matches!(blank, Err(AppError::Validation(_))));

        let done = NewTaskRequest {
            status: Some(TaskStatus::Done),
            ..NewTaskRequest::titled("Already done")
        };
        assert!(matches!(done.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_request_dates_must_be_padded_iso() {
        let req: NewTaskRequest = serde_json::from_str(
            r#"{"title":"Call","work_days":["2024-03-05"],"due_date":"2024-03-09"}"#,
        )
        .expect("valid request");
        assert_eq!(req.work_days, vec![d("2024-03-05")]);
        assert_eq!(req.due_date, Some(d("2024-03-09")));

        for bad in [
            r#"{"title":"Call","work_days":["2024-3-5"]}"#,
            r#"{"title":"Call","due_date":"2024-03-5"}"#,
            r#"{"title":"Call","due_date":"+2024-03-05"}"#,
        ] {
            assert!(serde_json::from_str::<NewTaskRequest>(bad).is_err(), "{bad}");
        }

        let draft = r#"{"title":"Call","type":"WORK","status":"OPEN","work_days":["2024-3-5"]}"#;
        assert!(serde_json::from_str::<TaskDraft>(draft).is_err());
    }

    #[test]
    fn test_draft_inbox_drops_work_days() {
        let draft = TaskDraft {
            title: "Plan trip".to_string(),
            task_type: TaskType::Personal,
            status: TaskStatus::Inbox,
            priority: Priority::P1,
            project_id: Some(" ".to_string()),
            notes: Some("  ".to_string()),
            work_days: vec![d("2024-03-05")],
            due_date: None,
        };
        let patch = draft.into_patch().expect("valid");
        assert_eq!(patch.work_days, Some(None));
        assert_eq!(patch.project_id, Some(None));
        assert_eq!(patch.notes, Some(None));
        assert_eq!(patch.status, Some(TaskStatus::Inbox));
    }

    #[test]
    fn test_task_serializes_wire_names() {
        let task = Task {
            id: "t1".to_string(),
            title: "Call".to_string(),
            task_type: TaskType::Personal,
            priority: Priority::P0,
            status: TaskStatus::Open,
            due_date: Some(d("2024-03-09")),
            work_days: WorkDays::normalize([d("2024-03-04")]),
            project_id: None,
            project: None,
            notes: None,
        };
        let json = serde_json::to_value(&task).expect("serializes");
        assert_eq!(json["type"], "PERSONAL");
        assert_eq!(json["priority"], "P0");
        assert_eq!(json["status"], "OPEN");
        assert_eq!(json["work_days"], serde_json::json!(["2024-03-04"]));
        assert_eq!(json["due_date"], "2024-03-09");
    }
}

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::task::{Priority, Task, TaskStatus, TaskType, WorkDays};

/// Partial task update.
///
/// Nullable columns use `Option<Option<T>>`: the outer `None` leaves the
/// column alone, `Some(None)` writes `null`. The same value is applied to the
/// local copy for optimistic updates and serialized as the remote patch body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_days: Option<Option<WorkDays>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn work_days(mut self, days: Option<WorkDays>) -> Self {
        self.work_days = Some(days);
        self
    }

    pub fn due_date(mut self, due: Option<NaiveDate>) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(task_type) = self.task_type {
            task.task_type = task_type;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(work_days) = &self.work_days {
            task.work_days = work_days.clone();
        }
        if let Some(project_id) = &self.project_id {
            if task.project_id != *project_id {
                // The joined project is stale until the store answers.
                task.project = None;
            }
            task.project_id = project_id.clone();
        }
        if let Some(notes) = &self.notes {
            task.notes = notes.clone();
        }
    }

    pub fn applied(&self, task: &Task) -> Task {
        let mut next = task.clone();
        self.apply_to(&mut next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_iso_date;
    use crate::models::project::Project;

    fn task() -> Task {
        Task {
            id: "t1".to_string(),
            title: "Draft".to_string(),
            task_type: TaskType::Work,
            priority: Priority::P2,
            status: TaskStatus::Open,
            due_date: parse_iso_date("2024-03-08"),
            work_days: WorkDays::normalize(parse_iso_date("2024-03-05")),
            project_id: Some("p1".to_string()),
            project: Some(Project {
                id: "p1".to_string(),
                name: "Office".to_string(),
                color: None,
            }),
            notes: None,
        }
    }

    #[test]
    fn test_patch_serializes_only_touched_fields() {
        let patch = TaskPatch::default()
            .status(TaskStatus::Inbox)
            .work_days(None);
        let json = serde_json::to_value(&patch).expect("serialize");
        assert_eq!(json, serde_json::json!({ "status": "INBOX", "work_days": null }));
    }

    #[test]
    fn test_apply_clears_nullable_fields() {
        let patch = TaskPatch::default().due_date(None).work_days(None);
        let next = patch.applied(&task());
        assert_eq!(next.due_date, None);
        assert_eq!(next.work_days, None);
        assert_eq!(next.title, "Draft");
    }

    #[test]
    fn test_changing_project_drops_stale_join() {
        let patch = TaskPatch {
            project_id: Some(Some("p2".to_string())),
            ..TaskPatch::default()
        };
        let next = patch.applied(&task());
        assert_eq!(next.project_id.as_deref(), Some("p2"));
        assert_eq!(next.project, None);

        let same = TaskPatch {
            project_id: Some(Some("p1".to_string())),
            ..TaskPatch::default()
        };
        assert!(same.applied(&task()).project.is_some());
    }

    #[test]
    fn test_empty_patch() {
        assert!(TaskPatch::default().is_empty());
        assert!(!TaskPatch::default().status(TaskStatus::Done).is_empty());
    }
}

//! Display metadata for task enums (Italian UI copy).

use serde::Serialize;

use crate::models::task::{Priority, TaskStatus, TaskType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Meta {
    pub label: &'static str,
    pub emoji: &'static str,
    pub tone: &'static str,
}

impl Meta {
    pub fn display(&self) -> String {
        format!("{} {}", self.emoji, self.label)
    }
}

impl Priority {
    pub fn meta(self) -> Meta {
        match self {
            Priority::P0 => Meta { label: "Critico", emoji: "🔥", tone: "p0" },
            Priority::P1 => Meta { label: "Alto", emoji: "⚡", tone: "p1" },
            Priority::P2 => Meta { label: "Medio", emoji: "✨", tone: "p2" },
            Priority::P3 => Meta { label: "Basso", emoji: "🌿", tone: "p3" },
        }
    }
}

impl TaskType {
    pub fn meta(self) -> Meta {
        match self {
            TaskType::Work => Meta { label: "Lavoro", emoji: "💼", tone: "work" },
            TaskType::Personal => Meta { label: "Personale", emoji: "🏡", tone: "personal" },
        }
    }
}

impl TaskStatus {
    pub fn meta(self) -> Meta {
        match self {
            TaskStatus::Inbox => Meta { label: "Da pianificare", emoji: "📥", tone: "inbox" },
            TaskStatus::Open => Meta { label: "Pianificato", emoji: "🗓️", tone: "open" },
            TaskStatus::Done => Meta { label: "Completato", emoji: "✅", tone: "done" },
        }
    }
}

/// Status label; an `OPEN` task without work days reads as still to plan.
pub fn status_label(status: TaskStatus, has_work_days: bool) -> String {
    if status == TaskStatus::Open && !has_work_days {
        return "🕒 Da pianificare".to_string();
    }
    status.meta().display()
}

pub fn join_meta<'a, I>(parts: I) -> String
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    parts
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_label_for_unplanned_open_task() {
        assert_eq!(status_label(TaskStatus::Open, false), "🕒 Da pianificare");
        assert_eq!(status_label(TaskStatus::Open, true), "🗓️ Pianificato");
        assert_eq!(status_label(TaskStatus::Done, false), "✅ Completato");
    }

    #[test]
    fn test_join_meta_skips_missing_parts() {
        assert_eq!(join_meta([Some("Lavoro"), None, Some(""), Some("Casa")]), "Lavoro | Casa");
    }

    #[test]
    fn test_priority_display() {
        assert_eq!(Priority::default().meta().display(), "✨ Medio");
    }
}

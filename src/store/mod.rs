pub mod memory;

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::AppError;
use crate::models::{NewTask, Priority, Project, Task, TaskPatch, TaskStatus, TaskType};

pub use memory::MemoryStore;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Id(String),
    Status(TaskStatus),
    StatusNot(TaskStatus),
    StatusIn(Vec<TaskStatus>),
    Type(TaskType),
    Priority(Priority),
    Project(String),
    /// Work days include every listed day (array containment).
    WorkDaysContain(Vec<NaiveDate>),
    /// Work days include at least one listed day.
    WorkDaysOverlap(Vec<NaiveDate>),
    DueDateSet,
    DueFrom(NaiveDate),
    DueUntil(NaiveDate),
    DueBefore(NaiveDate),
}

impl Filter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Filter::Id(id) => task.id == *id,
            Filter::Status(status) => task.status == *status,
            Filter::StatusNot(status) => task.status != *status,
            Filter::StatusIn(statuses) => statuses.contains(&task.status),
            Filter::Type(task_type) => task.task_type == *task_type,
            Filter::Priority(priority) => task.priority == *priority,
            Filter::Project(project_id) => task.project_id.as_deref() == Some(project_id.as_str()),
            Filter::WorkDaysContain(days) => task
                .work_days
                .as_ref()
                .is_some_and(|work_days| work_days.contains_all(days)),
            Filter::WorkDaysOverlap(days) => task
                .work_days
                .as_ref()
                .is_some_and(|work_days| work_days.overlaps(days)),
            Filter::DueDateSet => task.due_date.is_some(),
            Filter::DueFrom(day) => task.due_date.is_some_and(|due| due >= *day),
            Filter::DueUntil(day) => task.due_date.is_some_and(|due| due <= *day),
            Filter::DueBefore(day) => task.due_date.is_some_and(|due| due < *day),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Status,
    Priority,
    DueDate,
    WorkDays,
    Type,
    Title,
}

impl Column {
    pub fn as_str(self) -> &'static str {
        match self {
            Column::Status => "status",
            Column::Priority => "priority",
            Column::DueDate => "due_date",
            Column::WorkDays => "work_days",
            Column::Type => "type",
            Column::Title => "title",
        }
    }

    fn compare(self, a: &Task, b: &Task, nulls_last: bool) -> Ordering {
        fn nullable<T: Ord>(a: Option<T>, b: Option<T>, nulls_last: bool) -> Ordering {
            match (a, b) {
                (Some(a), Some(b)) => a.cmp(&b),
                (None, None) => Ordering::Equal,
                (None, Some(_)) if nulls_last => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) if nulls_last => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
            }
        }

        match self {
            Column::Status => a.status.as_str().cmp(b.status.as_str()),
            Column::Priority => a.priority.cmp(&b.priority),
            Column::DueDate => nullable(a.due_date, b.due_date, nulls_last),
            Column::WorkDays => nullable(
                a.work_days.as_ref().map(|d| d.days()),
                b.work_days.as_ref().map(|d| d.days()),
                nulls_last,
            ),
            Column::Type => a.task_type.as_str().cmp(b.task_type.as_str()),
            Column::Title => a.title.cmp(&b.title),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub column: Column,
    pub ascending: bool,
    pub nulls_last: bool,
}

/// Server-side selection of tasks: filters are ANDed, orders applied in turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskQuery {
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
}

impl TaskQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn status(self, status: TaskStatus) -> Self {
        self.filter(Filter::Status(status))
    }

    pub fn scheduled_on(self, day: NaiveDate) -> Self {
        self.filter(Filter::WorkDaysContain(vec![day]))
    }

    pub fn scheduled_within(self, days: Vec<NaiveDate>) -> Self {
        self.filter(Filter::WorkDaysOverlap(days))
    }

    pub fn asc(mut self, column: Column) -> Self {
        self.order.push(Order { column, ascending: true, nulls_last: true });
        self
    }

    pub fn desc(mut self, column: Column) -> Self {
        self.order.push(Order { column, ascending: false, nulls_last: true });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.filters.iter().all(|filter| filter.matches(task))
    }

    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        for order in &self.order {
            let ord = order.column.compare(a, b, order.nulls_last);
            // nulls placement is absolute, only the value order flips
            let ord = if order.ascending { ord } else { flip_values(ord, order, a, b) };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

fn flip_values(ord: Ordering, order: &Order, a: &Task, b: &Task) -> Ordering {
    let a_null = is_null(order.column, a);
    let b_null = is_null(order.column, b);
    if a_null != b_null {
        ord
    } else {
        ord.reverse()
    }
}

fn is_null(column: Column, task: &Task) -> bool {
    match column {
        Column::DueDate => task.due_date.is_none(),
        Column::WorkDays => task.work_days.is_none(),
        _ => false,
    }
}

/// The hosted tables this app reads and writes.
///
/// Every method returns normalized models; raw rows never leave the
/// implementation.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn select_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>, AppError>;
    async fn count_tasks(&self, query: &TaskQuery) -> Result<usize, AppError>;
    async fn fetch_task(&self, id: &str) -> Result<Option<Task>, AppError>;
    async fn insert_task(&self, task: &NewTask) -> Result<Task, AppError>;
    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Option<Task>, AppError>;
    async fn delete_task(&self, id: &str) -> Result<bool, AppError>;

    async fn list_projects(&self) -> Result<Vec<Project>, AppError>;
    async fn count_projects(&self) -> Result<usize, AppError>;
    async fn insert_project(&self, name: &str, color: Option<&str>) -> Result<Project, AppError>;
    async fn rename_project(&self, id: &str, name: &str) -> Result<Option<Project>, AppError>;
    async fn delete_project(&self, id: &str) -> Result<bool, AppError>;
    /// Clears `project_id` on every task pointing at the project.
    async fn detach_project(&self, project_id: &str) -> Result<usize, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_iso_date;
    use crate::models::WorkDays;

    fn d(s: &str) -> NaiveDate {
        parse_iso_date(s).expect("valid date")
    }

    fn task(id: &str, priority: Priority, due: Option<&str>, days: &[&str]) -> Task {
        Task {
            id: id.to_string(),
            title: id.to_string(),
            task_type: TaskType::Work,
            priority,
            status: TaskStatus::Open,
            due_date: due.map(d),
            work_days: WorkDays::normalize(days.iter().map(|s| d(s))),
            project_id: None,
            project: None,
            notes: None,
        }
    }

    #[test]
    fn test_contains_and_overlaps() {
        let t = task("a", Priority::P2, None, &["2024-03-04", "2024-03-06"]);
        assert!(TaskQuery::new().scheduled_on(d("2024-03-04")).matches(&t));
        assert!(!TaskQuery::new().scheduled_on(d("2024-03-05")).matches(&t));
        assert!(
            TaskQuery::new()
                .scheduled_within(vec![d("2024-03-05"), d("2024-03-06")])
                .matches(&t)
        );
        let unscheduled = task("b", Priority::P2, None, &[]);
        assert!(!TaskQuery::new().scheduled_within(vec![d("2024-03-04")]).matches(&unscheduled));
    }

    #[test]
    fn test_due_range_filters() {
        let t = task("a", Priority::P2, Some("2024-03-06"), &[]);
        let query = TaskQuery::new()
            .filter(Filter::DueDateSet)
            .filter(Filter::DueFrom(d("2024-03-04")))
            .filter(Filter::DueUntil(d("2024-03-08")));
        assert!(query.matches(&t));
        assert!(!query.matches(&task("b", Priority::P2, None, &[])));
        assert!(Filter::DueBefore(d("2024-03-07")).matches(&t));
        assert!(!Filter::DueBefore(d("2024-03-06")).matches(&t));
    }

    #[test]
    fn test_order_puts_nulls_last_in_both_directions() {
        let mut tasks = vec![
            task("none", Priority::P2, None, &[]),
            task("late", Priority::P2, Some("2024-03-09"), &[]),
            task("early", Priority::P2, Some("2024-03-04"), &[]),
        ];

        let asc = TaskQuery::new().asc(Column::DueDate);
        tasks.sort_by(|a, b| asc.compare(a, b));
        let ids: Vec<_> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["early", "late", "none"]);

        let desc = TaskQuery::new().desc(Column::DueDate);
        tasks.sort_by(|a, b| desc.compare(a, b));
        let ids: Vec<_> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["late", "early", "none"]);
    }

    #[test]
    fn test_multi_column_order() {
        let mut tasks = vec![
            task("p2-early", Priority::P2, Some("2024-03-04"), &[]),
            task("p0-late", Priority::P0, Some("2024-03-09"), &[]),
            task("p0-early", Priority::P0, Some("2024-03-05"), &[]),
        ];
        let query = TaskQuery::new().asc(Column::Priority).asc(Column::DueDate);
        tasks.sort_by(|a, b| query.compare(a, b));
        let ids: Vec<_> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["p0-early", "p0-late", "p2-early"]);
    }
}

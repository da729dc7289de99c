//! `TaskQuery` to PostgREST query-string translation.

use chrono::NaiveDate;

use crate::dates::format_iso_date;
use crate::error::AppError;
use crate::store::{Filter, Order, TaskQuery};

/// Columns read for every task, with the project join.
pub const TASK_SELECT: &str =
    "id,title,type,due_date,work_days,status,priority,project_id,notes,project:projects(id,name)";

pub const PROJECT_SELECT: &str = "id,name";

fn date_set(days: &[NaiveDate]) -> String {
    let joined = days
        .iter()
        .map(|d| format_iso_date(*d))
        .collect::<Vec<_>>()
        .join(",");
    format!("{{{}}}", joined)
}

fn filter_param(filter: &Filter) -> (&'static str, String) {
    match filter {
        Filter::Id(id) => ("id", format!("eq.{}", id)),
        Filter::Status(status) => ("status", format!("eq.{}", status.as_str())),
        Filter::StatusNot(status) => ("status", format!("neq.{}", status.as_str())),
        Filter::StatusIn(statuses) => {
            let list = statuses
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(",");
            ("status", format!("in.({})", list))
        }
        Filter::Type(task_type) => ("type", format!("eq.{}", task_type.as_str())),
        Filter::Priority(priority) => ("priority", format!("eq.{}", priority.as_str())),
        Filter::Project(project_id) => ("project_id", format!("eq.{}", project_id)),
        Filter::WorkDaysContain(days) => ("work_days", format!("cs.{}", date_set(days))),
        Filter::WorkDaysOverlap(days) => ("work_days", format!("ov.{}", date_set(days))),
        Filter::DueDateSet => ("due_date", "not.is.null".to_string()),
        Filter::DueFrom(day) => ("due_date", format!("gte.{}", format_iso_date(*day))),
        Filter::DueUntil(day) => ("due_date", format!("lte.{}", format_iso_date(*day))),
        Filter::DueBefore(day) => ("due_date", format!("lt.{}", format_iso_date(*day))),
    }
}

fn order_term(order: &Order) -> String {
    format!(
        "{}.{}.{}",
        order.column.as_str(),
        if order.ascending { "asc" } else { "desc" },
        if order.nulls_last { "nullslast" } else { "nullsfirst" }
    )
}

/// Query-string pairs for a task selection, excluding `select`.
pub fn task_params(query: &TaskQuery) -> Vec<(&'static str, String)> {
    let mut params: Vec<(&'static str, String)> = query.filters.iter().map(filter_param).collect();
    if !query.order.is_empty() {
        let terms = query.order.iter().map(order_term).collect::<Vec<_>>();
        params.push(("order", terms.join(",")));
    }
    if let Some(limit) = query.limit {
        params.push(("limit", limit.to_string()));
    }
    params
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`.
pub fn parse_content_range(value: &str) -> Result<usize, AppError> {
    value
        .rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse::<usize>().ok())
        .ok_or_else(|| AppError::Remote(format!("Unexpected Content-Range: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_iso_date;
    use crate::models::{Priority, TaskStatus};
    use crate::store::Column;

    fn d(s: &str) -> NaiveDate {
        parse_iso_date(s).expect("valid date")
    }

    #[test]
    fn test_week_planned_query() {
        let query = TaskQuery::new()
            .status(TaskStatus::Open)
            .scheduled_within(vec![d("2024-03-04"), d("2024-03-05")])
            .asc(Column::WorkDays)
            .asc(Column::Priority);
        assert_eq!(
            task_params(&query),
            vec![
                ("status", "eq.OPEN".to_string()),
                ("work_days", "ov.{2024-03-04,2024-03-05}".to_string()),
                (
                    "order",
                    "work_days.asc.nullslast,priority.asc.nullslast".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_filter_operators() {
        let query = TaskQuery::new()
            .filter(Filter::StatusIn(vec![TaskStatus::Open, TaskStatus::Inbox]))
            .filter(Filter::StatusNot(TaskStatus::Done))
            .filter(Filter::Priority(Priority::P1))
            .filter(Filter::DueDateSet)
            .filter(Filter::DueBefore(d("2024-03-04")))
            .scheduled_on(d("2024-03-04"))
            .desc(Column::WorkDays)
            .limit(5);
        let params = task_params(&query);
        assert_eq!(params[0], ("status", "in.(OPEN,INBOX)".to_string()));
        assert_eq!(params[1], ("status", "neq.DONE".to_string()));
        assert_eq!(params[2], ("priority", "eq.P1".to_string()));
        assert_eq!(params[3], ("due_date", "not.is.null".to_string()));
        assert_eq!(params[4], ("due_date", "lt.2024-03-04".to_string()));
        assert_eq!(params[5], ("work_days", "cs.{2024-03-04}".to_string()));
        assert_eq!(params[6], ("order", "work_days.desc.nullslast".to_string()));
        assert_eq!(params[7], ("limit", "5".to_string()));
    }

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range("0-24/3573"), Ok(3573));
        assert_eq!(parse_content_range("*/0"), Ok(0));
        assert!(parse_content_range("0-24/*").is_err());
        assert!(parse_content_range("garbage").is_err());
    }
}

use crate::error::Result;
use crate::projection::{is_overdue, TaskStatistics};
use crate::task::{Priority, TaskId, TaskRecord};
use askama::Template;
use chrono::NaiveDateTime;
use std::fmt;

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Completed,
    Pending,
}

impl Status {
    pub fn css_class(&self) -> &'static str {
        match self {
            Status::Completed => "completed",
            Status::Pending => "pending",
        }
    }
}

impl From<bool> for Status {
    fn from(done: bool) -> Self {
        if done {
            Status::Completed
        } else {
            Status::Pending
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Completed => "COMPLETED",
            Status::Pending => "PENDING",
        })
    }
}

/// Display-ready view of one task at a given instant.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskCard {
    pub id: TaskId,
    pub description: String,
    pub category: String,
    pub priority: Priority,
    pub priority_class: String,
    pub status: Status,
    pub is_overdue: bool,
    pub start: String,
    pub end: String,
    pub notes: Option<String>,
}

impl TaskCard {
    pub fn new(task: &TaskRecord, now: NaiveDateTime) -> Self {
        Self {
            id: task.id,
            description: task.description.clone(),
            category: task.category.clone(),
            priority: task.priority,
            priority_class: task.priority.as_str().to_lowercase(),
            status: Status::from(task.done),
            is_overdue: is_overdue(task, now),
            start: task.start_time.format(DISPLAY_FORMAT).to_string(),
            end: task.end_time.format(DISPLAY_FORMAT).to_string(),
            notes: task.notes().map(str::to_string),
        }
    }

    /// Multi-line block used by `show` and search results.
    pub fn details(&self) -> String {
        let mut out = format!(
            "#{} {}\n  Status:   {}{}\n  Category: {}\n  Priority: {}\n  Start:    {}\n  End:      {}",
            self.id,
            self.description,
            self.status,
            if self.is_overdue { " (overdue)" } else { "" },
            self.category,
            self.priority,
            self.start,
            self.end,
        );
        if let Some(notes) = &self.notes {
            out.push_str(&format!("\n  Notes:    {notes}"));
        }
        out
    }
}

impl fmt::Display for TaskCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[#{}] {} ({}, {}) {} {} -> {}",
            self.id, self.description, self.category, self.priority, self.status, self.start, self.end
        )?;
        if self.is_overdue {
            f.write_str(" OVERDUE")?;
        }
        Ok(())
    }
}

pub fn render<'a, I>(tasks: I, now: NaiveDateTime) -> Vec<TaskCard>
where
    I: IntoIterator<Item = &'a TaskRecord>,
{
    tasks.into_iter().map(|t| TaskCard::new(t, now)).collect()
}

#[derive(Template)]
#[template(path = "task_cards.html")]
struct TaskCardsTemplate {
    cards: Vec<TaskCard>,
}

#[derive(Template)]
#[template(path = "statistics.html")]
struct StatisticsTemplate<'a> {
    stats: &'a TaskStatistics,
}

/// HTML fragment for a list of tasks. Every record field goes through
/// askama's HTML escaping.
pub fn render_html<'a, I>(tasks: I, now: NaiveDateTime) -> Result<String>
where
    I: IntoIterator<Item = &'a TaskRecord>,
{
    let template = TaskCardsTemplate {
        cards: render(tasks, now),
    };
    Ok(template.render()?)
}

pub fn render_statistics_html(stats: &TaskStatistics) -> Result<String> {
    Ok(StatisticsTemplate { stats }.render()?)
}

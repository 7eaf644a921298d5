//! Read-only views over a [`TaskStore`].
//!
//! Everything here is a pure function of the store contents and an explicit
//! `now`, so time-dependent views (today, overdue, starting soon) can move as
//! the clock advances without the store changing.

use crate::task::{Priority, TaskId, TaskRecord};
use crate::task_store::TaskStore;
use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::collections::BTreeMap;

/// Optional criteria that must all hold; the default keeps every task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter<'c> {
    pub category: Option<&'c str>,
    pub done: Option<bool>,
    pub priority: Option<Priority>,
}

impl TaskFilter<'_> {
    pub fn matches(&self, task: &TaskRecord) -> bool {
        self.category.map_or(true, |c| task.category == c)
            && self.done.map_or(true, |done| task.done == done)
            && self.priority.map_or(true, |p| task.priority == p)
    }
}

/// Tasks matching `criteria`, in store order.
pub fn filter<'a>(store: &'a TaskStore, criteria: &TaskFilter<'_>) -> Vec<&'a TaskRecord> {
    store.tasks().iter().filter(|t| criteria.matches(t)).collect()
}

pub fn filter_by_category<'a>(store: &'a TaskStore, category: Option<&str>) -> Vec<&'a TaskRecord> {
    filter(
        store,
        &TaskFilter {
            category,
            ..TaskFilter::default()
        },
    )
}

/// Zero or one record; the first one wins when ids are duplicated.
pub fn filter_by_id(store: &TaskStore, id: TaskId) -> Option<&TaskRecord> {
    store.find(id)
}

pub fn filter_by_status(store: &TaskStore, done: bool) -> Vec<&TaskRecord> {
    filter(
        store,
        &TaskFilter {
            done: Some(done),
            ..TaskFilter::default()
        },
    )
}

pub fn filter_by_priority(store: &TaskStore, priority: Priority) -> Vec<&TaskRecord> {
    filter(
        store,
        &TaskFilter {
            priority: Some(priority),
            ..TaskFilter::default()
        },
    )
}

/// Distinct categories in first-seen order.
pub fn categories(store: &TaskStore) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::new();
    for task in store.tasks() {
        if !seen.contains(&task.category.as_str()) {
            seen.push(&task.category);
        }
    }
    seen
}

pub fn is_overdue(task: &TaskRecord, now: NaiveDateTime) -> bool {
    task.end_time < now && !task.done
}

/// Starts within `[local midnight today, local midnight tomorrow)`.
pub fn is_today(task: &TaskRecord, now: NaiveDateTime) -> bool {
    let today = now.date();
    let start_of_day = today.and_time(NaiveTime::MIN);
    match today.succ_opt() {
        Some(tomorrow) => {
            task.start_time >= start_of_day && task.start_time < tomorrow.and_time(NaiveTime::MIN)
        }
        None => task.start_time >= start_of_day,
    }
}

/// Not done and starting within `[now, now + 1h]`.
pub fn is_starting_soon(task: &TaskRecord, now: NaiveDateTime) -> bool {
    !task.done
        && task.start_time >= now
        && now
            .checked_add_signed(Duration::hours(1))
            .map_or(true, |limit| task.start_time <= limit)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatistics {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
    pub high_priority_tasks: usize,
    pub by_category: BTreeMap<String, usize>,
    pub today_tasks: usize,
    pub overdue_tasks: usize,
    pub starting_soon_tasks: usize,
}

impl TaskStatistics {
    pub fn category(&self, name: &str) -> usize {
        self.by_category.get(name).copied().unwrap_or(0)
    }
}

pub fn aggregate(store: &TaskStore, now: NaiveDateTime) -> TaskStatistics {
    store
        .tasks()
        .iter()
        .fold(TaskStatistics::default(), |mut stats, task| {
            stats.total_tasks += 1;
            if task.done {
                stats.completed_tasks += 1;
            } else {
                stats.pending_tasks += 1;
            }
            if task.priority == Priority::High {
                stats.high_priority_tasks += 1;
            }
            *stats.by_category.entry(task.category.clone()).or_insert(0) += 1;
            if is_today(task, now) {
                stats.today_tasks += 1;
            }
            if is_overdue(task, now) {
                stats.overdue_tasks += 1;
            }
            if is_starting_soon(task, now) {
                stats.starting_soon_tasks += 1;
            }
            stats
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::fixtures::{at, record};
    use rstest::rstest;

    fn store() -> TaskStore {
        TaskStore::from(vec![
            record(1, "Work", Priority::High, false),
            record(2, "Personal", Priority::Low, true),
            record(3, "Work", Priority::Medium, true),
            record(4, "Errands", Priority::High, false),
        ])
    }

    #[test]
    fn category_filter_keeps_relative_order() {
        let store = store();
        let ids: Vec<_> = filter_by_category(&store, Some("Work"))
            .iter()
            .map(|t| t.id.0)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn no_category_returns_everything() {
        let store = store();
        assert_eq!(filter_by_category(&store, None).len(), 4);
    }

    #[test]
    fn category_match_is_exact() {
        let store = store();
        assert!(filter_by_category(&store, Some("work")).is_empty());
    }

    #[test]
    fn id_filter_returns_first_of_duplicates() {
        let mut second = record(1, "Personal", Priority::Low, true);
        second.description = "duplicate".into();
        let store = TaskStore::from(vec![record(1, "Work", Priority::High, false), second]);

        let found = filter_by_id(&store, TaskId(1)).unwrap();
        assert_eq!(found.category, "Work");
        assert!(filter_by_id(&store, TaskId(9)).is_none());
    }

    #[test]
    fn status_and_priority_filters() {
        let store = store();
        assert_eq!(filter_by_status(&store, true).len(), 2);
        assert_eq!(filter_by_priority(&store, Priority::High).len(), 2);
    }

    #[test]
    fn combined_filter_requires_every_criterion() {
        let store = store();
        let criteria = TaskFilter {
            category: Some("Work"),
            done: Some(false),
            priority: Some(Priority::High),
        };
        let found = filter(&store, &criteria);
        assert!(!found.is_empty());
        assert!(found.iter().all(|t| criteria.matches(t)));
        assert!(found
            .iter()
            .all(|t| t.category == "Work" && !t.done && t.priority == Priority::High));
        assert_eq!(filter(&store, &TaskFilter::default()).len(), store.len());
    }

    #[test]
    fn categories_in_first_seen_order() {
        assert_eq!(categories(&store()), vec!["Work", "Personal", "Errands"]);
    }

    #[test]
    fn empty_store_aggregates_to_zero() {
        let mut store = store();
        store.replace(Vec::new());
        assert_eq!(aggregate(&store, at(10, 12)), TaskStatistics::default());
    }

    #[test]
    fn counts_are_self_consistent() {
        let stats = aggregate(&store(), at(10, 12));
        assert_eq!(stats.total_tasks, 4);
        assert_eq!(stats.completed_tasks + stats.pending_tasks, stats.total_tasks);
        assert_eq!(stats.high_priority_tasks, 2);
        assert_eq!(stats.category("Work"), 2);
        assert_eq!(stats.category("Personal"), 1);
        assert_eq!(stats.category("Nowhere"), 0);
    }

    #[test]
    fn overdue_single_high_priority_task() {
        // starts at 09:00, ends at 10:00, evaluated at 11:00
        let store = TaskStore::from(vec![record(1, "Work", Priority::High, false)]);
        let stats = aggregate(&store, at(10, 11));
        assert_eq!(stats.overdue_tasks, 1);
        assert_eq!(stats.high_priority_tasks, 1);
        assert_eq!(stats.completed_tasks, 0);
    }

    #[test]
    fn done_tasks_are_never_overdue() {
        let task = record(1, "Work", Priority::High, true);
        assert!(!is_overdue(&task, at(28, 0)));
        let store = TaskStore::from(vec![task]);
        assert_eq!(aggregate(&store, at(28, 0)).overdue_tasks, 0);
    }

    #[test]
    fn overdue_depends_on_the_clock() {
        let task = record(1, "Work", Priority::High, false);
        assert!(!is_overdue(&task, at(10, 9)));
        assert!(!is_overdue(&task, at(10, 10)));
        assert!(is_overdue(&task, at(10, 11)));
    }

    #[rstest]
    #[case(at(10, 0), true)]
    #[case(at(10, 23), true)]
    #[case(at(9, 23), false)]
    #[case(at(11, 0), false)]
    fn today_window_is_the_local_calendar_day(#[case] now: NaiveDateTime, #[case] expected: bool) {
        let task = record(1, "Work", Priority::Low, false);
        assert_eq!(is_today(&task, now), expected);
    }

    #[test]
    fn today_window_includes_midnight_start() {
        let mut task = record(1, "Work", Priority::Low, false);
        task.start_time = at(10, 0);
        assert!(is_today(&task, at(10, 18)));
        task.start_time = at(11, 0);
        assert!(!is_today(&task, at(10, 18)));
    }

    #[test]
    fn starting_soon_is_the_next_hour() {
        let task = record(1, "Work", Priority::Low, false);
        let half_hour_before = at(10, 8) + Duration::minutes(30);
        assert!(is_starting_soon(&task, half_hour_before));
        assert!(is_starting_soon(&task, at(10, 9)));
        // exactly one hour ahead is still inside the window
        assert!(is_starting_soon(&task, at(10, 8)));
        assert!(!is_starting_soon(&task, at(10, 8) - Duration::seconds(1)));
        assert!(!is_starting_soon(&task, at(10, 10)));

        let done = record(2, "Work", Priority::Low, true);
        assert!(!is_starting_soon(&done, half_hour_before));
    }
}

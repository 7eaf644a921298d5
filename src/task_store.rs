use crate::task::{TaskId, TaskRecord};

/// Client-side copy of the user's tasks, in server order.
///
/// The store is only ever replaced wholesale from a list fetch or cleared on
/// sign-out; mutations go to the server and come back through a refresh.
#[derive(Debug, Default, Clone)]
pub struct TaskStore {
    tasks: Vec<TaskRecord>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Drops the previous contents and keeps `records` verbatim. Duplicate
    /// ids are kept as-is.
    pub fn replace(&mut self, records: Vec<TaskRecord>) {
        self.tasks = records;
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    /// First record with `id`, if any.
    pub fn find(&self, id: TaskId) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn tasks(&self) -> &[TaskRecord] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl From<Vec<TaskRecord>> for TaskStore {
    fn from(tasks: Vec<TaskRecord>) -> Self {
        Self { tasks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::fixtures::record;
    use crate::task::Priority;

    #[test]
    fn starts_empty() {
        let store = TaskStore::new();
        assert!(store.is_empty());
        assert_eq!(store.find(TaskId(1)), None);
    }

    #[test]
    fn replace_discards_previous_contents() {
        let mut store = TaskStore::new();
        store.replace(vec![
            record(1, "Work", Priority::High, false),
            record(2, "Home", Priority::Low, false),
        ]);
        store.replace(vec![record(3, "Work", Priority::Medium, true)]);

        assert_eq!(store.len(), 1);
        assert_eq!(store.tasks()[0].id, TaskId(3));
        assert!(store.find(TaskId(1)).is_none());
    }

    #[test]
    fn replace_keeps_order_and_duplicates() {
        let mut store = TaskStore::new();
        let mut dup = record(5, "Home", Priority::Low, false);
        dup.description = "second".into();
        store.replace(vec![
            record(5, "Work", Priority::High, false),
            record(2, "Work", Priority::High, false),
            dup,
        ]);

        let ids: Vec<_> = store.tasks().iter().map(|t| t.id.0).collect();
        assert_eq!(ids, vec![5, 2, 5]);
        assert_eq!(store.find(TaskId(5)).unwrap().description, "Task 5");
    }

    #[test]
    fn clear_empties_the_store() {
        let mut store = TaskStore::from(vec![record(1, "Work", Priority::High, false)]);
        store.clear();
        assert!(store.is_empty());
    }
}

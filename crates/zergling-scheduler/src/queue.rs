//! A time-based queue of recurring items.
//!
//! Each item carries its own delay. [`TaskQueue::todo_tasks`] returns the
//! items that are due; once handled, [`TaskQueue::mark_task_as_done`] pushes
//! an item's next due time one delay into the future. Items are never removed.

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem<T> {
    /// `_0`, `_1`, … in insertion order.
    pub id: String,
    pub data: T,
    pub delay: Duration,
    pub last_update: DateTime<Utc>,
    pub next_update: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TaskQueue<T> {
    items: Vec<QueueItem<T>>,
    next_id: usize,
}

impl<T: Clone> TaskQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            next_id: 0,
        }
    }

    /// Add `(data, delay)` pairs. Each first comes due one delay after `now`.
    pub fn add_tasks(&mut self, tasks: impl IntoIterator<Item = (T, Duration)>, now: DateTime<Utc>) {
        for (data, delay) in tasks {
            let id = format!("_{}", self.next_id);
            self.next_id += 1;
            self.items.push(QueueItem {
                id,
                data,
                delay,
                last_update: now,
                next_update: now + delay,
            });
        }
    }

    /// Items due at `now`. They keep being returned until marked done.
    pub fn todo_tasks(&self, now: DateTime<Utc>) -> Vec<QueueItem<T>> {
        self.items
            .iter()
            .filter(|item| item.next_update <= now)
            .cloned()
            .collect()
    }

    /// Silence an item until its next due time. Unknown IDs are ignored.
    pub fn mark_task_as_done(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.last_update = now;
                item.next_update = now + item.delay;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Clone> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_items_come_due_after_their_delay() {
        let mut queue = TaskQueue::new();
        queue.add_tasks(
            [("fast", Duration::seconds(10)), ("slow", Duration::seconds(60))],
            at(0),
        );

        assert!(queue.todo_tasks(at(5)).is_empty());
        let due = queue.todo_tasks(at(10));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "_0");
        assert_eq!(due[0].data, "fast");
        assert_eq!(queue.todo_tasks(at(60)).len(), 2);
    }

    #[test]
    fn test_done_items_wait_another_delay() {
        let mut queue = TaskQueue::new();
        queue.add_tasks([("msg", Duration::seconds(10))], at(0));

        // Not marked done: still due.
        assert_eq!(queue.todo_tasks(at(11)).len(), 1);
        assert_eq!(queue.todo_tasks(at(12)).len(), 1);

        assert!(queue.mark_task_as_done("_0", at(12)));
        assert!(queue.todo_tasks(at(21)).is_empty());
        assert_eq!(queue.todo_tasks(at(22))[0].last_update, at(12));
        assert!(!queue.mark_task_as_done("_9", at(12)));
    }

    #[test]
    fn test_ids_keep_counting_across_batches() {
        let mut queue = TaskQueue::new();
        queue.add_tasks([(1, Duration::seconds(1))], at(0));
        queue.add_tasks([(2, Duration::seconds(1)), (3, Duration::seconds(1))], at(0));
        let ids: Vec<String> = queue.todo_tasks(at(1)).into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["_0", "_1", "_2"]);
        assert_eq!(queue.len(), 3);
    }
}

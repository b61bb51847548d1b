//! Deadline task list checked once per tick.
//!
//! Replaces fire-and-forget timeout callbacks: the owner schedules a typed
//! payload for a deadline and collects whatever has come due on each update.

use crate::time::Timestamp;

/// Handle to a scheduled task, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

#[derive(Debug, Clone)]
struct Task<T> {
    id: TaskId,
    deadline: Timestamp,
    payload: T,
}

#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    tasks: Vec<Task<T>>,
    next_id: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 0,
        }
    }

    pub fn schedule(&mut self, deadline: Timestamp, payload: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push(Task { id, deadline, payload });
        id
    }

    /// Cancel a pending task. Returns its payload if it had not fired yet.
    pub fn cancel(&mut self, id: TaskId) -> Option<T> {
        let idx = self.tasks.iter().position(|t| t.id == id)?;
        Some(self.tasks.remove(idx).payload)
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }

    pub fn deadline(&self, id: TaskId) -> Option<Timestamp> {
        self.tasks.iter().find(|t| t.id == id).map(|t| t.deadline)
    }

    /// Remove and return every task with `deadline <= now`, earliest first.
    /// Tasks sharing a deadline come out in scheduling order.
    pub fn take_due(&mut self, now: Timestamp) -> Vec<T> {
        if !self.tasks.iter().any(|t| t.deadline <= now) {
            return Vec::new();
        }
        let (mut due, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.tasks).into_iter().partition(|t| t.deadline <= now);
        self.tasks = pending;
        due.sort_by_key(|t| (t.deadline, t.id));
        due.into_iter().map(|t| t.payload).collect()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_tasks_come_out_in_deadline_order() {
        let mut s = Scheduler::new();
        s.schedule(Timestamp::from_millis(300), "late");
        s.schedule(Timestamp::from_millis(100), "early");
        s.schedule(Timestamp::from_millis(100), "early-second");
        s.schedule(Timestamp::from_millis(900), "future");

        let due = s.take_due(Timestamp::from_millis(500));
        assert_eq!(due, vec!["early", "early-second", "late"]);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn cancelled_task_never_fires() {
        let mut s = Scheduler::new();
        let id = s.schedule(Timestamp::from_millis(50), 1);
        assert_eq!(s.cancel(id), Some(1));
        assert_eq!(s.cancel(id), None);
        assert!(s.take_due(Timestamp::from_millis(100)).is_empty());
    }

    #[test]
    fn task_fires_exactly_at_deadline_once() {
        let mut s = Scheduler::new();
        let id = s.schedule(Timestamp::from_millis(8000), ());
        assert!(s.take_due(Timestamp::from_millis(7999)).is_empty());
        assert!(s.is_pending(id));
        assert_eq!(s.take_due(Timestamp::from_millis(8000)).len(), 1);
        assert!(s.take_due(Timestamp::from_millis(9000)).is_empty());
    }
}

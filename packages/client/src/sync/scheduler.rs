//! Deadline scheduler shared by every timer of a session.
//!
//! A min-heap of `(deadline, sequence)` entries plus a map of live tasks.
//! Cancelling only removes the task from the map; the stale heap entry is
//! skipped when it surfaces.

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
};

use crate::domain::Timestamp;

/// Handle of one scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug)]
pub struct Scheduler<T> {
    heap: BinaryHeap<Reverse<(i64, u64)>>,
    tasks: HashMap<u64, T>,
    next_seq: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            tasks: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at: Timestamp, task: T) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse((at.value(), seq)));
        self.tasks.insert(seq, task);
        TimerId(seq)
    }

    /// Cancel a task; returns it if it was still pending.
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        self.tasks.remove(&id.0)
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.tasks.contains_key(&id.0)
    }

    /// Earliest deadline among live tasks
    pub fn next_deadline(&mut self) -> Option<Timestamp> {
        while let Some(Reverse((deadline, seq))) = self.heap.peek().copied() {
            if self.tasks.contains_key(&seq) {
                return Some(Timestamp::new(deadline));
            }
            self.heap.pop();
        }
        None
    }

    /// Remove and return every task due at `now`, earliest first.
    ///
    /// Tasks sharing a deadline come out in scheduling order.
    pub fn pop_due(&mut self, now: Timestamp) -> Vec<T> {
        let mut due = Vec::new();
        while let Some(Reverse((deadline, seq))) = self.heap.peek().copied() {
            if deadline > now.value() {
                break;
            }
            self.heap.pop();
            if let Some(task) = self.tasks.remove(&seq) {
                due.push(task);
            }
        }
        due
    }

    /// Cancel everything.
    pub fn clear(&mut self) {
        self.heap.clear();
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
    fn test_pop_due_orders_by_deadline_then_insertion() {
        // テスト項目: 期限順、同じ期限なら登録順にタスクが取り出される
        // given (前提条件):
        let mut scheduler = Scheduler::new();
        scheduler.schedule(Timestamp::new(300), "c");
        scheduler.schedule(Timestamp::new(100), "a");
        scheduler.schedule(Timestamp::new(100), "b");
        scheduler.schedule(Timestamp::new(900), "later");

        // when (操作):
        let due = scheduler.pop_due(Timestamp::new(300));

        // then (期待する結果):
        assert_eq!(due, vec!["a", "b", "c"]);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.next_deadline(), Some(Timestamp::new(900)));
    }

    #[test]
    fn test_cancelled_task_never_fires() {
        // テスト項目: キャンセルされたタスクは取り出されず、次の期限からも除外される
        // given (前提条件):
        let mut scheduler = Scheduler::new();
        let first = scheduler.schedule(Timestamp::new(100), 1);
        scheduler.schedule(Timestamp::new(200), 2);

        // when (操作):
        let cancelled = scheduler.cancel(first);

        // then (期待する結果):
        assert_eq!(cancelled, Some(1));
        assert!(!scheduler.is_pending(first));
        assert_eq!(scheduler.next_deadline(), Some(Timestamp::new(200)));
        assert_eq!(scheduler.pop_due(Timestamp::new(1_000)), vec![2]);
        assert_eq!(scheduler.cancel(first), None);
    }

    #[test]
    fn test_clear_cancels_everything() {
        // テスト項目: clear で全タスクが一括キャンセルされる
        // given (前提条件):
        let mut scheduler = Scheduler::new();
        scheduler.schedule(Timestamp::new(10), ());
        scheduler.schedule(Timestamp::new(20), ());

        // when (操作):
        scheduler.clear();

        // then (期待する結果):
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.next_deadline(), None);
        assert!(scheduler.pop_due(Timestamp::new(100)).is_empty());
    }
}

//! Deferred tasks keyed by wake time

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use tracing::warn;

/// Work scheduled to run later on the world task. Tasks carry ids, never
/// references, and must re-resolve their target when they fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredTask {
    /// Push current percentages of an actor to whoever simulates it
    ResyncPercentages { form_id: u32 },
    /// Bring a dead actor back at its spawn point
    Respawn { form_id: u32 },
    /// Restore a container's contents. `idx` pins the exact reference that
    /// was looted, so a form re-created under the same id is left alone.
    Reloot { form_id: u32, idx: u32 },
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Scheduled {
    at: Instant,
    seq: u64,
    task: TaskKey,
}

// BinaryHeap needs Ord on the payload; tasks are ordered by (at, seq) only
#[derive(Debug, PartialEq, Eq)]
struct TaskKey(DeferredTask);

impl PartialOrd for TaskKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TaskKey {
    fn cmp(&self, _other: &Self) -> std::cmp::Ordering {
        std::cmp::Ordering::Equal
    }
}

/// Min-heap of deferred tasks; ties fire in scheduling order
#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<Scheduled>>,
    next_seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` to fire after `delay`. A deadline past the clock's range
    /// is dropped and reported as `false`.
    pub fn schedule(&mut self, now: Instant, delay: Duration, task: DeferredTask) -> bool {
        let Some(at) = now.checked_add(delay) else {
            warn!(?task, ?delay, "Deferred task deadline overflows, dropping it");
            return false;
        };
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Scheduled {
            at,
            seq,
            task: TaskKey(task),
        }));
        true
    }

    /// Pop every task due at or before `now`, earliest first
    pub fn drain_due(&mut self, now: Instant) -> Vec<DeferredTask> {
        let mut due = Vec::new();
        while let Some(Reverse(next)) = self.heap.peek() {
            if next.at > now {
                break;
            }
            if let Some(Reverse(scheduled)) = self.heap.pop() {
                due.push(scheduled.task.0);
            }
        }
        due
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(s)| s.at)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

//! Cooperative task queue.
//!
//! Tasks are ordered by `sort_index` (start time plus a per-priority
//! timeout), ties broken by insertion id, so equally urgent tasks run FIFO.
//! Cancellation is lazy: a cancelled task stays in the heap until it reaches
//! the top and is discarded there.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::hash::Map;
use crate::lane::Millis;
use crate::root::RootId;

const USER_BLOCKING_PRIORITY_TIMEOUT: Millis = 250;
const NORMAL_PRIORITY_TIMEOUT: Millis = 5000;
const LOW_PRIORITY_TIMEOUT: Millis = 10_000;
// Max 31-bit integer, effectively "never".
const IDLE_PRIORITY_TIMEOUT: Millis = 1_073_741_823;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PriorityLevel {
    Immediate = 1,
    UserBlocking = 2,
    Normal = 3,
    Low = 4,
    Idle = 5,
}

impl PriorityLevel {
    fn timeout(self) -> Millis {
        match self {
            // Already expired when scheduled, so it never yields to other tasks.
            PriorityLevel::Immediate => 0,
            PriorityLevel::UserBlocking => USER_BLOCKING_PRIORITY_TIMEOUT,
            PriorityLevel::Normal => NORMAL_PRIORITY_TIMEOUT,
            PriorityLevel::Low => LOW_PRIORITY_TIMEOUT,
            PriorityLevel::Idle => IDLE_PRIORITY_TIMEOUT,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// What a task does when it runs. The set of tasks is closed, so tasks are
/// plain data dispatched by the reconciler rather than boxed closures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TaskKind {
    PerformConcurrentWork(RootId),
    FlushPassiveEffects(RootId),
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Task {
    pub(crate) id: TaskId,
    pub(crate) kind: TaskKind,
    pub(crate) priority: PriorityLevel,
    pub(crate) expiration_time: Millis,
}

/// Result of running one task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TaskOutcome {
    /// Not finished; keep the task where it is and call it again.
    Continue,
    Done,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct HeapEntry {
    sort_index: Millis,
    id: TaskId,
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the smallest index pops first.
        other
            .sort_index
            .cmp(&self.sort_index)
            .then_with(|| other.id.cmp(&self.id))
    }
}

pub(crate) struct TaskQueue {
    heap: BinaryHeap<HeapEntry>,
    live: Map<TaskId, Task>, // FUTURE(no_std): slab keyed by task id.
    next_id: u64,
    slice_start: Millis,
    frame_interval: Millis,
    current_priority: PriorityLevel,
}

impl TaskQueue {
    pub(crate) fn new(frame_interval: Millis) -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: Map::default(),
            next_id: 1,
            slice_start: 0,
            frame_interval,
            current_priority: PriorityLevel::Normal,
        }
    }

    pub(crate) fn schedule(&mut self, priority: PriorityLevel, kind: TaskKind, now: Millis) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let expiration_time = now.saturating_add(priority.timeout());
        self.live.insert(
            id,
            Task {
                id,
                kind,
                priority,
                expiration_time,
            },
        );
        self.heap.push(HeapEntry {
            sort_index: expiration_time,
            id,
        });
        log::trace!("scheduled {kind:?} as {id:?} at {priority:?}");
        id
    }

    pub(crate) fn cancel(&mut self, id: TaskId) {
        if self.live.remove(&id).is_some() {
            log::trace!("cancelled {id:?}");
        }
    }

    /// Most urgent live task, discarding cancelled entries on the way.
    pub(crate) fn peek(&mut self) -> Option<Task> {
        while let Some(entry) = self.heap.peek() {
            if let Some(task) = self.live.get(&entry.id) {
                return Some(*task);
            }
            self.heap.pop();
        }
        None
    }

    /// Marks a task as finished. Its heap entry is dropped lazily.
    pub(crate) fn complete(&mut self, id: TaskId) {
        self.live.remove(&id);
        if self.heap.peek().is_some_and(|entry| entry.id == id) {
            self.heap.pop();
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn is_live(&self, id: TaskId) -> bool {
        self.live.contains_key(&id)
    }

    pub(crate) fn begin_slice(&mut self, now: Millis) {
        self.slice_start = now;
    }

    /// True once the current slice has used up its time budget.
    pub(crate) fn should_yield(&self, now: Millis) -> bool {
        now.saturating_sub(self.slice_start) >= self.frame_interval
    }

    pub(crate) fn current_priority(&self) -> PriorityLevel {
        self.current_priority
    }

    pub(crate) fn set_current_priority(&mut self, priority: PriorityLevel) -> PriorityLevel {
        std::mem::replace(&mut self.current_priority, priority)
    }
}

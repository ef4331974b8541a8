use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::fiber::FiberId;
use crate::hooks::QueuedHookUpdate;
use crate::lane::{Lane, Lanes, Millis};
use crate::platform::{Clock, RuntimeScheduler};

/// A hook dispatch waiting to be applied by the reconciler that owns it.
pub(crate) struct PendingDispatch {
    pub(crate) fiber: FiberId,
    /// `Lanes::NONE` means "ask the host for the current event priority".
    pub(crate) lane: Lane,
    pub(crate) event_time: Millis,
    pub(crate) update: Box<dyn QueuedHookUpdate>,
}

struct RuntimeInner {
    scheduler: Arc<dyn RuntimeScheduler>,
    clock: Arc<dyn Clock>,
    current_update_priority: Cell<Lane>,
    dispatches: RefCell<VecDeque<PendingDispatch>>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn RuntimeScheduler>, clock: Arc<dyn Clock>) -> Self {
        Self {
            scheduler,
            clock,
            current_update_priority: Cell::new(Lanes::NONE),
            dispatches: RefCell::new(VecDeque::new()),
        }
    }

    fn enqueue_dispatch(&self, dispatch: PendingDispatch) {
        self.dispatches.borrow_mut().push_back(dispatch);
        self.scheduler.schedule_microtask();
    }
}

/// Scheduler context shared by a reconciler and the dispatch handles it
/// hands out: clock, host wakeups, the current update priority, and the
/// inbox of dispatches that arrived while the reconciler was not running.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn RuntimeScheduler>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler, clock)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    pub fn now(&self) -> Millis {
        self.inner.clock.now()
    }

    pub fn current_update_priority(&self) -> Lane {
        self.inner.current_update_priority.get()
    }

    pub fn set_current_update_priority(&self, lane: Lane) {
        self.inner.current_update_priority.set(lane);
    }

    /// Sets the update priority until the returned guard is dropped.
    pub fn scoped_update_priority(&self, lane: Lane) -> UpdatePriorityGuard<'_> {
        let previous = self.inner.current_update_priority.replace(lane);
        UpdatePriorityGuard {
            cell: &self.inner.current_update_priority,
            previous,
        }
    }

    /// Runs `f` with `lane` as the current update priority.
    pub fn with_update_priority<R>(&self, lane: Lane, f: impl FnOnce() -> R) -> R {
        let _guard = self.scoped_update_priority(lane);
        f()
    }

    pub fn has_pending_dispatches(&self) -> bool {
        !self.inner.dispatches.borrow().is_empty()
    }

    pub(crate) fn take_dispatch(&self) -> Option<PendingDispatch> {
        self.inner.dispatches.borrow_mut().pop_front()
    }

    pub(crate) fn request_host_callback(&self) {
        self.inner.scheduler.request_host_callback();
    }

    pub(crate) fn schedule_microtask(&self) {
        self.inner.scheduler.schedule_microtask();
    }
}

/// Restores the previous update priority on drop.
pub struct UpdatePriorityGuard<'a> {
    cell: &'a Cell<Lane>,
    previous: Lane,
}

impl Drop for UpdatePriorityGuard<'_> {
    fn drop(&mut self) {
        self.cell.set(self.previous);
    }
}

#[derive(Clone)]
pub struct RuntimeHandle(pub(crate) Weak<RuntimeInner>);

impl RuntimeHandle {
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    pub fn now(&self) -> Option<Millis> {
        self.0.upgrade().map(|inner| inner.clock.now())
    }

    /// Explicit update priority, or `Lanes::NONE` when the host decides.
    pub(crate) fn request_update_lane(&self) -> Lane {
        self.0
            .upgrade()
            .map(|inner| inner.current_update_priority.get())
            .unwrap_or(Lanes::NONE)
    }

    pub fn with_update_priority<R>(&self, lane: Lane, f: impl FnOnce() -> R) -> R {
        match self.0.upgrade() {
            Some(inner) => {
                let previous = inner.current_update_priority.replace(lane);
                let _guard = UpdatePriorityGuard {
                    cell: &inner.current_update_priority,
                    previous,
                };
                f()
            }
            None => f(),
        }
    }

    pub(crate) fn enqueue_dispatch(&self, dispatch: PendingDispatch) {
        if let Some(inner) = self.0.upgrade() {
            inner.enqueue_dispatch(dispatch);
        }
    }
}

/// Scheduler that ignores wakeups; drivers poll the reconciler themselves.
#[derive(Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn request_host_callback(&self) {}

    fn schedule_microtask(&self) {}
}

//! The reconciler: public entry points and the state it owns.

use std::fmt::Write as _;

use crate::concurrent_updates::ConcurrentQueues;
use crate::config::ReconcilerConfig;
use crate::element::Node;
use crate::error::ReconcileError;
use crate::event_priority::DISCRETE_EVENT_PRIORITY;
use crate::fiber::{Fiber, FiberArena, FiberId, FiberProps, FiberQueue, FiberState, FiberType, RootState, StateNode, WorkTag};
use crate::host::HostAdapter;
use crate::lane::{Lane, Lanes, Millis};
use crate::root::{FiberRoot, RootId};
use crate::runtime::Runtime;
use crate::scheduler::TaskQueue;
use crate::sync_queue::SyncQueue;
use crate::update_queue::{Update, UpdatePayload, UpdateQueue};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RootExitStatus {
    InProgress,
    Completed,
}

/// The render in progress, if any.
pub(crate) struct WorkInProgress {
    pub(crate) fiber: Option<FiberId>,
    pub(crate) root: Option<RootId>,
    pub(crate) render_lanes: Lanes,
    pub(crate) exit_status: RootExitStatus,
    /// Fibers allocated by this render; freed if it is thrown away.
    pub(crate) fresh_fibers: Vec<FiberId>,
    /// Subtrees removed by the commit in progress.
    pub(crate) deleted_fibers: Vec<FiberId>,
}

impl Default for WorkInProgress {
    fn default() -> Self {
        Self {
            fiber: None,
            root: None,
            render_lanes: Lanes::NONE,
            exit_status: RootExitStatus::InProgress,
            fresh_fibers: Vec::new(),
            deleted_fibers: Vec::new(),
        }
    }
}

/// Owns the fiber trees of every root created through it and drives their
/// renders and commits against a host.
///
/// Nothing runs on its own: the embedder calls [`Reconciler::flush_microtasks`]
/// when the runtime asked for a microtask and [`Reconciler::run_host_callback`]
/// when it asked for a host callback (or [`Reconciler::run_until_idle`] to do
/// both until no work is left).
pub struct Reconciler<H: HostAdapter> {
    pub(crate) host: H,
    pub(crate) config: ReconcilerConfig,
    pub(crate) runtime: Runtime,
    pub(crate) fibers: FiberArena<H>,
    pub(crate) roots: Vec<FiberRoot<H>>,
    pub(crate) tasks: TaskQueue,
    pub(crate) sync_queue: SyncQueue,
    pub(crate) concurrent_queues: ConcurrentQueues,
    pub(crate) work: WorkInProgress,
}

impl<H: HostAdapter> Reconciler<H> {
    pub fn new(host: H, runtime: Runtime) -> Self {
        Self::with_config(host, runtime, ReconcilerConfig::default())
    }

    pub fn with_config(host: H, runtime: Runtime, config: ReconcilerConfig) -> Self {
        Self {
            host,
            tasks: TaskQueue::new(config.frame_interval_ms),
            config,
            runtime,
            fibers: FiberArena::new(),
            roots: Vec::new(),
            sync_queue: SyncQueue::default(),
            concurrent_queues: ConcurrentQueues::default(),
            work: WorkInProgress::default(),
        }
    }

    /// Creates a root rendering into `container`. The root starts empty.
    pub fn create_container(&mut self, container: H::Container) -> RootId {
        let id = RootId::new(self.roots.len());
        let mut fiber = Fiber::new(WorkTag::HostRoot, None, FiberType::Root, FiberProps::Empty);
        fiber.state_node = StateNode::Root(id);
        fiber.memoized_state = FiberState::Root(RootState::default());
        fiber.update_queue = FiberQueue::Root(UpdateQueue::new(RootState::default()));
        let current = self.fibers.alloc(fiber);
        self.roots.push(FiberRoot::new(container, current));
        log::debug!("created root {}", id.index());
        id
    }

    /// Schedules `element` to become the root's content. Returns the lane the
    /// update was assigned.
    pub fn update_container(&mut self, element: impl Into<Node>, root: RootId) -> Result<Lane, ReconcileError> {
        let current = self
            .roots
            .get(root.index())
            .map(|r| r.current)
            .ok_or(ReconcileError::UnknownRoot(root))?;
        let event_time = self.request_event_time();
        let lane = self.request_update_lane();
        let update = Update {
            lane,
            payload: UpdatePayload::Replace(RootState {
                element: element.into(),
            }),
        };
        if let Some(root) = self.enqueue_concurrent_root_update(current, update) {
            self.schedule_update_on_fiber(root, lane, event_time);
        }
        Ok(lane)
    }

    /// Lane for an update issued now: the explicit update priority if one
    /// is set, otherwise the host's current event priority.
    pub fn request_update_lane(&self) -> Lane {
        let explicit = self.runtime.current_update_priority();
        if !explicit.is_empty() {
            return explicit;
        }
        self.host.current_event_priority()
    }

    pub fn request_event_time(&self) -> Millis {
        self.runtime.now()
    }

    /// Applies queued dispatches and runs sync work. Call when the runtime
    /// scheduled a microtask.
    pub fn flush_microtasks(&mut self) -> Result<(), ReconcileError> {
        self.process_dispatches();
        self.flush_sync_callbacks()
    }

    /// Runs `f` at discrete priority, then flushes the sync work it queued.
    pub fn flush_sync<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> Result<R, ReconcileError> {
        let runtime = self.runtime.clone();
        let value = {
            let _priority = runtime.scoped_update_priority(DISCRETE_EVENT_PRIORITY);
            f(self)
        };
        self.flush_microtasks()?;
        Ok(value)
    }

    /// Drives microtasks and host callbacks until no work is left.
    pub fn run_until_idle(&mut self) -> Result<(), ReconcileError> {
        loop {
            self.flush_microtasks()?;
            if self.tasks.is_empty() && !self.runtime.has_pending_dispatches() {
                return Ok(());
            }
            self.run_host_callback()?;
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn container(&self, root: RootId) -> Option<&H::Container> {
        self.roots.get(root.index()).map(|r| &r.container)
    }

    pub fn pending_lanes(&self, root: RootId) -> Lanes {
        self.roots.get(root.index()).map_or(Lanes::NONE, |r| r.lanes.pending)
    }

    pub fn expired_lanes(&self, root: RootId) -> Lanes {
        self.roots.get(root.index()).map_or(Lanes::NONE, |r| r.lanes.expired)
    }

    /// True while a render has been started and not yet committed.
    pub fn is_rendering(&self) -> bool {
        self.work.root.is_some()
    }

    /// Anything left for the embedder to drive.
    pub fn has_pending_work(&self) -> bool {
        !self.tasks.is_empty() || !self.sync_queue.is_empty() || self.runtime.has_pending_dispatches()
    }

    /// Number of live fibers across both buffers of every root.
    pub fn fiber_count(&self) -> usize {
        self.fibers.len()
    }

    /// Indented dump of the committed fiber tree of `root`.
    pub fn debug_tree(&self, root: RootId) -> String {
        let mut out = String::new();
        if let Some(root) = self.roots.get(root.index()) {
            self.write_fiber(&mut out, root.current, 0);
        }
        out
    }

    fn write_fiber(&self, out: &mut String, id: FiberId, depth: usize) {
        let fiber = &self.fibers[id];
        let _ = write!(out, "{}{:?}", "  ".repeat(depth), fiber.tag);
        match &fiber.ty {
            FiberType::Host(ty) => {
                let _ = write!(out, " <{ty}>");
            }
            FiberType::Component(component) => {
                let _ = write!(out, " {}", component.name());
            }
            FiberType::Text => {
                if let Some(text) = fiber.memoized_props.text() {
                    let _ = write!(out, " {text:?}");
                }
            }
            FiberType::Root => {}
        }
        if let Some(key) = fiber.key {
            let _ = write!(out, " key={:x}", key.raw());
        }
        out.push('\n');
        let mut child = fiber.child;
        while let Some(c) = child {
            self.write_fiber(out, c, depth + 1);
            child = self.fibers[c].sibling;
        }
    }
}
